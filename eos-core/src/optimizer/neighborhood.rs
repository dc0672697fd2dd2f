use rand::{Rng, seq::IndexedRandom};

use crate::{device::Decision, fleet::Fleet, horizon::Horizon, schedule::Schedule};

/// Longest run of steps a single reset move clears.
const MAX_RESET_LEN: usize = 4;

/// Device the search is allowed to touch.
#[derive(Clone, Debug)]
struct Movable {
    /// Position in the fleet.
    index: usize,

    /// Decision levels, starting with [`Decision::Idle`].
    palette: Vec<Decision>,

    /// Sorted steps where the device is available.
    steps: Vec<usize>,
}

impl Movable {
    fn is_available(&self, step: usize) -> bool {
        self.steps.binary_search(&step).is_ok()
    }
}

/// Small changes to a schedule which produce the search candidates.
#[derive(Clone, Debug)]
pub struct Neighborhood {
    n_steps: usize,
    devices: Vec<Movable>,
}

impl Neighborhood {
    pub fn new(fleet: &Fleet, horizon: &Horizon, granularity: usize) -> Self {
        let devices = fleet
            .devices()
            .iter()
            .enumerate()
            .filter_map(|(index, spec)| {
                let palette = spec.palette(granularity);
                let steps: Vec<usize> = horizon
                    .intervals()
                    .enumerate()
                    .filter(|(_, interval)| spec.is_available(*interval))
                    .map(|(step, _)| step)
                    .collect();
                (palette.len() > 1 && !steps.is_empty())
                    .then_some(Movable { index, palette, steps })
            })
            .collect();
        Self { n_steps: horizon.n_steps(), devices }
    }

    /// No decision may change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Derive one candidate from the incumbent.
    ///
    /// Picks a movable device and one of the moves: change a decision to another palette level,
    /// swap a decision with the one of the adjacent step, or reset a run of steps to idle.
    pub fn propose(&self, incumbent: &Schedule, rng: &mut impl Rng) -> Option<Schedule> {
        let device = self.devices.choose(rng)?;
        let step = *device.steps.choose(rng)?;
        let mut candidate = incumbent.clone();
        let moved = match rng.random_range(0..3) {
            1 => self.swap(&mut candidate, device, step, rng.random_bool(0.5)),
            2 => self.reset(&mut candidate, device, step, rng.random_range(1..=MAX_RESET_LEN)),
            _ => false,
        };
        // A no-op move falls back to changing the level:
        if !moved {
            Self::change(&mut candidate, device, step, rng);
        }
        Some(candidate)
    }

    fn change(schedule: &mut Schedule, device: &Movable, step: usize, rng: &mut impl Rng) {
        let current = schedule.get(step, device.index).unwrap_or_default();
        let alternatives: Vec<Decision> =
            device.palette.iter().copied().filter(|decision| *decision != current).collect();
        if let Some(decision) = alternatives.choose(rng) {
            schedule.set(step, device.index, *decision);
        }
    }

    fn swap(&self, schedule: &mut Schedule, device: &Movable, step: usize, forward: bool) -> bool {
        let other = if forward { step + 1 } else { step.wrapping_sub(1) };
        if other >= self.n_steps || !device.is_available(other) {
            return false;
        }
        let (Some(this), Some(that)) =
            (schedule.get(step, device.index), schedule.get(other, device.index))
        else {
            return false;
        };
        if this == that {
            return false;
        }
        schedule.set(step, device.index, that);
        schedule.set(other, device.index, this);
        true
    }

    fn reset(&self, schedule: &mut Schedule, device: &Movable, start: usize, len: usize) -> bool {
        let mut changed = false;
        for step in start..(start + len).min(self.n_steps) {
            if schedule.get(step, device.index).is_some_and(|decision| !decision.is_idle()) {
                schedule.set(step, device.index, Decision::Idle);
                changed = true;
            }
        }
        changed
    }
}
