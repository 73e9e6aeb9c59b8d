//! Machine-local logical clock.
//!
//! The clock is never synchronised with any other machine. It starts at
//! [`LogicalClock::START`] and moves forward by exactly one per internal step,
//! whatever the step did. Received payloads do not feed back into it.

use std::fmt::Display;

/// Monotonic per-machine step counter.
#[derive(PartialEq, PartialOrd, Ord, Eq, Copy, Clone, Debug, Hash)]
pub struct LogicalClock(u64);

impl LogicalClock {
    /// Value of a freshly started machine's clock.
    pub const START: LogicalClock = LogicalClock(1);

    pub fn value(&self) -> u64 {
        self.0
    }

    pub(crate) fn advance(&mut self) {
        self.0 += 1;
    }
}

impl Default for LogicalClock {
    fn default() -> Self {
        Self::START
    }
}

impl Display for LogicalClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}
