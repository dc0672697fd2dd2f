use serde::Serialize;

use crate::device::Decision;

/// Flat `n_steps × n_devices` matrix of decisions.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Schedule {
    n_steps: usize,
    n_devices: usize,
    decisions: Vec<Decision>,
}

impl Schedule {
    /// Zero-decision schedule.
    pub fn idle(n_steps: usize, n_devices: usize) -> Self {
        Self { n_steps, n_devices, decisions: vec![Decision::Idle; n_steps * n_devices] }
    }

    /// Build the schedule from per-step rows, which must all be of the same length.
    ///
    /// Returns [`None`] for ragged rows.
    #[must_use]
    pub fn from_steps(steps: Vec<Vec<Decision>>) -> Option<Self> {
        let n_steps = steps.len();
        let n_devices = steps.first().map_or(0, Vec::len);
        if steps.iter().any(|step| step.len() != n_devices) {
            return None;
        }
        Some(Self { n_steps, n_devices, decisions: steps.into_iter().flatten().collect() })
    }

    #[must_use]
    pub const fn n_steps(&self) -> usize {
        self.n_steps
    }

    #[must_use]
    pub const fn n_devices(&self) -> usize {
        self.n_devices
    }

    /// Decision at the position, if it is within the matrix.
    pub fn get(&self, step: usize, device: usize) -> Option<Decision> {
        if device < self.n_devices {
            self.decisions.get(step * self.n_devices + device).copied()
        } else {
            None
        }
    }

    /// Replace the decision, ignoring positions outside of the matrix.
    pub fn set(&mut self, step: usize, device: usize, decision: Decision) {
        if device < self.n_devices
            && let Some(slot) = self.decisions.get_mut(step * self.n_devices + device)
        {
            *slot = decision;
        }
    }

    /// All device decisions of the step.
    #[must_use]
    pub fn step(&self, step: usize) -> &[Decision] {
        let start = (step * self.n_devices).min(self.decisions.len());
        let end = (start + self.n_devices).min(self.decisions.len());
        &self.decisions[start..end]
    }

    pub fn steps(&self) -> impl Iterator<Item = &[Decision]> {
        self.decisions.chunks(self.n_devices.max(1)).take(self.n_steps)
    }

    /// Number of non-idle decisions.
    #[must_use]
    pub fn n_actions(&self) -> usize {
        self.decisions.iter().filter(|decision| !decision.is_idle()).count()
    }
}
