use std::time::Duration;

use bon::Builder;

/// Search limits, checked at every iteration boundary.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Builder)]
pub struct Budget {
    #[builder(default = 1000)]
    pub max_iterations: usize,

    /// Wall-clock limit of the search.
    pub time_limit: Option<Duration>,

    /// Consecutive iterations without improvement before the search is considered converged.
    #[builder(default = 100)]
    pub patience: usize,
}

impl Default for Budget {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Budget {
    #[must_use]
    pub fn is_exhausted(&self, n_iterations: usize, elapsed: Duration) -> bool {
        n_iterations >= self.max_iterations
            || self.time_limit.is_some_and(|time_limit| elapsed >= time_limit)
    }

    /// Iterations left after `n_iterations` were used.
    #[must_use]
    pub const fn n_unused(&self, n_iterations: usize) -> usize {
        self.max_iterations.saturating_sub(n_iterations)
    }
}
