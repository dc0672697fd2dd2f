use std::fmt::{Debug, Formatter};

use chrono::{DateTime, FixedOffset, TimeDelta};
use eos_quantities::Hours;
use serde::Serialize;

pub type Timestamp = DateTime<FixedOffset>;

#[must_use]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct Interval {
    /// Inclusive.
    pub start: Timestamp,

    /// Exclusive.
    pub end: Timestamp,
}

impl Debug for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}..{:?}", self.start, self.end)
    }
}

impl Interval {
    pub const fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn duration(self) -> TimeDelta {
        self.end - self.start
    }

    pub fn hours(self) -> Hours {
        Hours::from(self.duration())
    }

    #[must_use]
    pub fn contains(self, timestamp: Timestamp) -> bool {
        (self.start <= timestamp) && (timestamp < self.end)
    }
}
