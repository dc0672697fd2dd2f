use std::iter::FusedIterator;

use bon::bon;
use chrono::TimeDelta;
use eos_quantities::Hours;

use crate::{
    error::HorizonError,
    interval::{Interval, Timestamp},
};

/// Fixed-resolution discretization of the planning window.
#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Horizon {
    start: Timestamp,
    resolution: TimeDelta,
    n_steps: usize,
}

#[bon]
impl Horizon {
    /// Split `duration` into steps of `resolution`, which must divide the duration exactly.
    #[builder]
    pub fn new(
        start: Timestamp,
        #[builder(default = TimeDelta::hours(24))] duration: TimeDelta,
        #[builder(default = TimeDelta::minutes(15))] resolution: TimeDelta,
    ) -> Result<Self, HorizonError> {
        if resolution <= TimeDelta::zero() {
            return Err(HorizonError::NonPositiveResolution(resolution));
        }
        if duration < TimeDelta::zero() {
            return Err(HorizonError::NegativeDuration(duration));
        }
        let too_long = HorizonError::TooLong { duration, resolution };
        let (Some(duration_ns), Some(resolution_ns)) =
            (duration.num_nanoseconds(), resolution.num_nanoseconds())
        else {
            return Err(too_long);
        };
        if duration_ns % resolution_ns != 0 {
            return Err(HorizonError::NotIntegral { duration, resolution });
        }
        // Step offsets are multiplied as `i32`:
        let n_steps = i32::try_from(duration_ns / resolution_ns).map_err(|_| too_long)?;
        let n_steps = usize::try_from(n_steps).map_err(|_| too_long)?;
        Ok(Self { start, resolution, n_steps })
    }
}

impl Horizon {
    pub const fn empty(start: Timestamp, resolution: TimeDelta) -> Self {
        Self { start, resolution, n_steps: 0 }
    }

    #[must_use]
    pub const fn start(&self) -> Timestamp {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> Timestamp {
        self.interval(self.n_steps).start
    }

    #[must_use]
    pub const fn resolution(&self) -> TimeDelta {
        self.resolution
    }

    #[must_use]
    pub const fn n_steps(&self) -> usize {
        self.n_steps
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.n_steps == 0
    }

    pub fn step_hours(&self) -> Hours {
        Hours::from(self.resolution)
    }

    /// Interval of the step with the specified index, which is at most [`Self::n_steps`].
    pub fn interval(&self, index: usize) -> Interval {
        let index = i32::try_from(index.min(self.n_steps)).unwrap_or(i32::MAX);
        let start = self.start + self.resolution * index;
        Interval::new(start, start + self.resolution)
    }

    pub fn intervals(&self) -> Intervals<'_> {
        Intervals { horizon: self, next: 0 }
    }
}

pub struct Intervals<'a> {
    horizon: &'a Horizon,
    next: usize,
}

impl Iterator for Intervals<'_> {
    type Item = Interval;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.horizon.n_steps {
            return None;
        }
        let interval = self.horizon.interval(self.next);
        self.next += 1;
        Some(interval)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.horizon.n_steps.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Intervals<'_> {}

impl FusedIterator for Intervals<'_> {}
