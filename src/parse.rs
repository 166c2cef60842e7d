// SPDX-License-Identifier: MPL-2.0

mod since;
mod window;

pub use since::parse_since;
pub use window::parse_window;
