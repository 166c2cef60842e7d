// SPDX-License-Identifier: MPL-2.0

use std::io::{BufRead, IsTerminal as _, Write};

pub const LEAVE_MESSAGE: &str =
    "Your timer is running or paused. If you leave now, your current time may be lost. Leave anyway?";

/// Asks whether it is fine to leave while a session is unsaved.
pub trait LeaveGuard {
    fn confirm_leave(&self, message: &str) -> bool;
}

/// Always lets the user leave.  Used when nobody is around to answer.
pub struct NoGuard;

impl LeaveGuard for NoGuard {
    fn confirm_leave(&self, message: &str) -> bool {
        log::debug!("Leaving without confirmation: {message}");
        true
    }
}

/// Asks on stderr and reads a yes/no answer from stdin.
pub struct PromptGuard;

impl LeaveGuard for PromptGuard {
    fn confirm_leave(&self, message: &str) -> bool {
        let mut stderr = std::io::stderr().lock();
        if write!(stderr, "\n{message} [y/N] ").and_then(|_| stderr.flush()).is_err() {
            return true;
        }
        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => true,
            Ok(_) => is_yes(&answer),
        }
    }
}

/// Picks a guard once for the whole run: prompts only when stdin is a
/// terminal.
pub fn detect() -> Box<dyn LeaveGuard> {
    if std::io::stdin().is_terminal() {
        Box::new(PromptGuard)
    } else {
        Box::new(NoGuard)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
