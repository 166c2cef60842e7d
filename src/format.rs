// SPDX-License-Identifier: MPL-2.0

/// Formats a count of seconds as `HH:MM:SS`.
///
/// Negative or missing input is treated as zero.  Hours are padded to two
/// digits but are otherwise unbounded, so 100 hours renders as `100:00:00`.
pub fn format_duration(seconds: impl Into<Option<i64>>) -> String {
    let seconds = seconds.into().unwrap_or(0).max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
