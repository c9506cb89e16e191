//! Fixed-period cadence for the agent loop.

use std::time::Duration;

/// What to do once a cycle's work is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Sleep out the remainder of the period.
    Sleep(Duration),
    /// The cycle ran long by this much; start the next one immediately.
    Overrun(Duration),
}

pub fn pace(elapsed: Duration, period: Duration) -> Pace {
    match period.checked_sub(elapsed) {
        Some(remaining) => Pace::Sleep(remaining),
        None => Pace::Overrun(elapsed - period),
    }
}
