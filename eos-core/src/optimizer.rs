mod budget;
mod neighborhood;
mod seed;

use std::{
    fmt::{Display, Formatter},
    time::{Duration, Instant},
};

use bon::Builder;
use rand::{SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument, trace};

pub use self::{
    budget::Budget,
    neighborhood::Neighborhood,
    seed::{greedy, idle},
};
use crate::{
    error::{InfeasibleSchedule, NoFeasibleSchedule},
    fleet::Fleet,
    forecast::Forecast,
    objective::{Objective, Score},
    schedule::Schedule,
    simulator::Simulator,
    trajectory::Trajectory,
};

/// Why the search stopped.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// No improvement within the patience, or nothing to change at all.
    Converged,

    /// Ran out of iterations or time.
    BudgetExhausted,
}

impl Display for Termination {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Converged => write!(f, "converged"),
            Self::BudgetExhausted => write!(f, "budget exhausted"),
        }
    }
}

/// Search lifecycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Searching,
    Stopped(Termination),
    Done,
}

impl Phase {
    fn advance(&mut self, to: Self) {
        debug!(from = ?self, ?to, "phase");
        *self = to;
    }
}

/// Best-found plan and how it was found.
#[must_use]
#[derive(Clone, Debug)]
pub struct BestResult {
    pub schedule: Schedule,
    pub trajectory: Trajectory,
    pub score: Score,
    pub termination: Termination,
    pub budget: Budget,
    pub n_iterations: usize,
    pub n_evaluations: usize,

    /// Infeasible candidates.
    pub n_rejected: usize,

    pub elapsed: Duration,

    /// Best score after each iteration.
    pub history: Vec<Score>,
}

/// Feasible, scored schedule.
#[derive(Clone, Debug)]
struct Candidate {
    schedule: Schedule,
    trajectory: Trajectory,
    score: Score,
}

#[derive(Default)]
struct Counters {
    n_evaluations: usize,
    n_rejected: usize,
    last_rejection: Option<InfeasibleSchedule>,
}

#[must_use]
#[derive(Builder)]
pub struct Optimizer<'a> {
    fleet: &'a Fleet,
    forecast: &'a Forecast,

    #[builder(default)]
    objective: Objective,

    #[builder(default)]
    budget: Budget,

    /// Candidates per iteration.
    #[builder(default = 16)]
    neighbors: usize,

    /// Decision levels per direction of each device.
    #[builder(default = 4)]
    granularity: usize,

    /// Seed of the proposal generator.
    #[builder(default)]
    seed: u64,
}

impl Optimizer<'_> {
    /// Hill-climb from the best seed.
    ///
    /// Candidates of an iteration are evaluated in parallel, the incumbent is only replaced by a
    /// strictly greater score. Proposals are drawn sequentially from the seeded generator, so the
    /// outcome does not depend on the number of threads.
    #[instrument(skip_all, fields(n_devices = self.fleet.len(), n_steps = self.n_steps()))]
    pub fn run(self) -> Result<BestResult, NoFeasibleSchedule> {
        let start_instant = Instant::now();
        let simulator = Simulator::builder().fleet(self.fleet).forecast(self.forecast).build();
        let mut phase = Phase::Idle;
        let mut counters = Counters::default();
        info!(seed = self.seed, neighbors = self.neighbors, "optimizing…");

        let seeds = self.evaluate_all(&simulator, seed::seeds(self.fleet, self.forecast));
        let Some(mut incumbent) = Self::best_of(seeds, &mut counters) else {
            phase.advance(Phase::Done);
            return Err(NoFeasibleSchedule {
                n_evaluations: counters.n_evaluations,
                last_rejection: counters.last_rejection,
            });
        };
        info!(score = %incumbent.score, "seeded");

        phase.advance(Phase::Searching);
        let neighborhood = Neighborhood::new(self.fleet, self.forecast.horizon(), self.granularity);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut history = Vec::new();
        let mut n_iterations = 0;
        let mut n_stale = 0;

        let termination = loop {
            if neighborhood.is_empty() || n_stale >= self.budget.patience {
                break Termination::Converged;
            }
            if self.budget.is_exhausted(n_iterations, start_instant.elapsed()) {
                break Termination::BudgetExhausted;
            }
            let proposals: Vec<Schedule> = (0..self.neighbors)
                .filter_map(|_| neighborhood.propose(&incumbent.schedule, &mut rng))
                .collect();
            n_iterations += 1;
            n_stale += 1;
            let evaluated = self.evaluate_all(&simulator, proposals);
            if let Some(candidate) = Self::best_of(evaluated, &mut counters)
                && candidate.score > incumbent.score
            {
                debug!(n_iterations, score = %candidate.score, "improved");
                incumbent = candidate;
                n_stale = 0;
            }
            history.push(incumbent.score);
        };
        phase.advance(Phase::Stopped(termination));

        let elapsed = start_instant.elapsed();
        info!(
            ?elapsed,
            %termination,
            n_iterations,
            n_evaluations = counters.n_evaluations,
            n_rejected = counters.n_rejected,
            score = %incumbent.score,
            "optimized",
        );
        let result = BestResult {
            schedule: incumbent.schedule,
            trajectory: incumbent.trajectory,
            score: incumbent.score,
            termination,
            budget: self.budget,
            n_iterations,
            n_evaluations: counters.n_evaluations,
            n_rejected: counters.n_rejected,
            elapsed,
            history,
        };
        phase.advance(Phase::Done);
        Ok(result)
    }

    fn n_steps(&self) -> usize {
        self.forecast.horizon().n_steps()
    }

    fn evaluate_all(
        &self,
        simulator: &Simulator<'_>,
        schedules: Vec<Schedule>,
    ) -> Vec<Result<Candidate, InfeasibleSchedule>> {
        schedules.into_par_iter().map(|schedule| self.evaluate(simulator, schedule)).collect()
    }

    fn evaluate(
        &self,
        simulator: &Simulator<'_>,
        schedule: Schedule,
    ) -> Result<Candidate, InfeasibleSchedule> {
        let trajectory = simulator.simulate(&schedule)?;
        let score = self.objective.score(self.fleet, &trajectory, &schedule);
        Ok(Candidate { schedule, trajectory, score })
    }

    /// Best feasible candidate, the earliest one on equal scores.
    fn best_of(
        results: Vec<Result<Candidate, InfeasibleSchedule>>,
        counters: &mut Counters,
    ) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for result in results {
            counters.n_evaluations += 1;
            match result {
                Ok(candidate) => {
                    if best.as_ref().is_none_or(|best| candidate.score > best.score) {
                        best = Some(candidate);
                    }
                }
                Err(error) => {
                    trace!(%error, "rejected");
                    counters.n_rejected += 1;
                    counters.last_rejection = Some(error);
                }
            }
        }
        best
    }
}

/// Search with the default neighborhood settings.
pub fn optimize(
    fleet: &Fleet,
    forecast: &Forecast,
    objective: Objective,
    budget: Budget,
) -> Result<BestResult, NoFeasibleSchedule> {
    Optimizer::builder()
        .fleet(fleet)
        .forecast(forecast)
        .objective(objective)
        .budget(budget)
        .build()
        .run()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta};
    use eos_quantities::{KilowattHourPrice, KilowattHours, Kilowatts};

    use super::*;
    use crate::{
        device::{Battery, Decision, DeviceKind, DeviceSpec, Load},
        error::Violation,
        fleet::GridConnection,
        forecast::Conditions,
        horizon::Horizon,
    };

    fn forecast(prices: &[f64]) -> Forecast {
        let horizon = Horizon::builder()
            .start(DateTime::parse_from_rfc3339("2026-01-03T00:00:00+01:00").unwrap())
            .duration(TimeDelta::hours(i64::try_from(prices.len()).unwrap()))
            .resolution(TimeDelta::hours(1))
            .build()
            .unwrap();
        let samples = prices
            .iter()
            .map(|price| Conditions {
                demand: Kilowatts(1.0),
                import_price: KilowattHourPrice(*price),
                export_price: KilowattHourPrice(0.05),
                ..Conditions::default()
            })
            .collect();
        Forecast::try_new(horizon, samples).unwrap()
    }

    fn fleet() -> Fleet {
        let battery = Battery::builder()
            .max_level(KilowattHours(6.0))
            .initial_level(KilowattHours(1.0))
            .charging_rate(Kilowatts(2.0))
            .discharging_rate(Kilowatts(1.0))
            .build();
        Fleet::try_new(
            vec![DeviceSpec::new("battery", DeviceKind::Battery(battery))],
            GridConnection::UNLIMITED,
        )
        .unwrap()
    }

    const PRICES: [f64; 8] = [0.30, 0.10, 0.10, 0.35, 0.40, 0.20, 0.45, 0.30];

    fn run(fleet: &Fleet, forecast: &Forecast, seed: u64) -> BestResult {
        Optimizer::builder()
            .fleet(fleet)
            .forecast(forecast)
            .budget(Budget::builder().max_iterations(50).patience(20).build())
            .neighbors(8)
            .seed(seed)
            .build()
            .run()
            .unwrap()
    }

    /// Verify that the recorded best score never decreases.
    #[test]
    fn monotonic_history() {
        let (fleet, forecast) = (fleet(), forecast(&PRICES));
        let result = run(&fleet, &forecast, 1);
        assert!(!result.history.is_empty());
        assert!(result.history.windows(2).all(|window| window[0] <= window[1]));
        assert_eq!(result.history.last(), Some(&result.score));
        assert_eq!(result.n_iterations, result.history.len());
    }

    /// Verify that the result is never worse than any of the seeds.
    #[test]
    fn not_worse_than_seeds() {
        let (fleet, forecast) = (fleet(), forecast(&PRICES));
        let result = run(&fleet, &forecast, 2);
        let simulator = Simulator::builder().fleet(&fleet).forecast(&forecast).build();
        let scores: Vec<Score> = [idle(&fleet, &forecast), greedy(&fleet, &forecast)]
            .iter()
            .map(|seed| {
                let trajectory = simulator.simulate(seed).unwrap();
                Objective::default().score(&fleet, &trajectory, seed)
            })
            .collect();
        assert!(scores.iter().all(|score| result.score >= *score));

        // Charging at 0.10 €/kWh and discharging above 0.30 €/kWh pays off:
        assert!(result.score.loss < scores[0].loss);
    }

    #[test]
    fn deterministic() {
        let (fleet, forecast) = (fleet(), forecast(&PRICES));
        let lhs = run(&fleet, &forecast, 3);
        let rhs = run(&fleet, &forecast, 3);
        assert_eq!(lhs.schedule, rhs.schedule);
        assert_eq!(lhs.score, rhs.score);
        assert_eq!(lhs.history, rhs.history);
        assert_eq!(lhs.n_evaluations, rhs.n_evaluations);
    }

    #[test]
    fn budget_exhausted() {
        let (fleet, forecast) = (fleet(), forecast(&PRICES));
        let result = Optimizer::builder()
            .fleet(&fleet)
            .forecast(&forecast)
            .budget(Budget::builder().max_iterations(3).patience(100).build())
            .build()
            .run()
            .unwrap();
        assert_eq!(result.termination, Termination::BudgetExhausted);
        assert_eq!(result.n_iterations, 3);
        assert_eq!(result.n_evaluations, 2 + 3 * 16);
    }

    /// Verify that the result is converged when nothing may change.
    #[test]
    fn nothing_to_optimize() {
        let fleet = Fleet::try_new(
            vec![DeviceSpec::new("load", DeviceKind::Load(Load { power: Kilowatts(0.5) }))],
            GridConnection::UNLIMITED,
        )
        .unwrap();
        let forecast = forecast(&PRICES);
        let result = optimize(&fleet, &forecast, Objective::default(), Budget::default()).unwrap();
        assert_eq!(result.termination, Termination::Converged);
        assert_eq!(result.n_iterations, 0);
        assert_eq!(result.score.n_actions, 0);
    }

    #[test]
    fn empty_horizon() {
        let (fleet, forecast) = (fleet(), forecast(&[]));
        let result = optimize(&fleet, &forecast, Objective::default(), Budget::default()).unwrap();
        assert_eq!(result.score, Score::ZERO);
        assert!(result.trajectory.is_empty());
        assert_eq!(result.termination, Termination::Converged);
    }

    /// Verify that generated candidates either stay within the capacity or are rejected.
    #[test]
    fn candidates_respect_capacity() {
        let (fleet, forecast) = (fleet(), forecast(&PRICES));
        let battery = fleet.devices()[0].storage().unwrap().clone();
        let capacity = (battery.min_level - KilowattHours::EPSILON)
            ..=(battery.max_level + KilowattHours::EPSILON);
        let within_capacity = |trajectory: &Trajectory| {
            trajectory.levels(0).iter().flatten().all(|level| capacity.contains(level))
        };

        let simulator = Simulator::builder().fleet(&fleet).forecast(&forecast).build();
        let neighborhood = Neighborhood::new(&fleet, forecast.horizon(), 4);
        let mut rng = StdRng::seed_from_u64(5);
        let mut incumbent = greedy(&fleet, &forecast);
        let mut n_feasible = 0;
        for _ in 0..500 {
            let candidate = neighborhood.propose(&incumbent, &mut rng).unwrap();
            match simulator.simulate(&candidate) {
                Ok(trajectory) => {
                    assert!(within_capacity(&trajectory));
                    n_feasible += 1;
                    incumbent = candidate;
                }
                Err(error) => {
                    assert!(matches!(error.violation, Violation::Capacity { .. }));
                }
            }
        }
        assert!(n_feasible > 0);

        for seed in 0..5 {
            let result = run(&fleet, &forecast, seed);
            assert!(within_capacity(&result.trajectory));
            assert_eq!(simulator.simulate(&result.schedule).unwrap(), result.trajectory);
        }
    }

    /// Verify that, on equal loss, the schedule with fewer actions is kept.
    #[test]
    fn fewer_actions_on_equal_loss() {
        // Lossless storage at a flat price: every schedule costs the same.
        let battery = Battery::builder()
            .max_level(KilowattHours(4.0))
            .initial_level(KilowattHours(2.0))
            .charging_rate(Kilowatts(1.0))
            .discharging_rate(Kilowatts(1.0))
            .build();
        let fleet = Fleet::try_new(
            vec![DeviceSpec::new("battery", DeviceKind::Battery(battery))],
            GridConnection::UNLIMITED,
        )
        .unwrap();
        let flat = Conditions {
            demand: Kilowatts(1.0),
            import_price: KilowattHourPrice(0.5),
            export_price: KilowattHourPrice(0.5),
            ..Conditions::default()
        };
        let forecast = Forecast::try_new(*forecast(&[0.5; 4]).horizon(), vec![flat; 4]).unwrap();

        let simulator = Simulator::builder().fleet(&fleet).forecast(&forecast).build();
        let mut busy = Schedule::idle(4, 1);
        busy.set(0, 0, Decision::Charge(Kilowatts(1.0)));
        busy.set(2, 0, Decision::Discharge(Kilowatts(1.0)));
        let busy_score =
            Objective::default().score(&fleet, &simulator.simulate(&busy).unwrap(), &busy);

        let result = Optimizer::builder()
            .fleet(&fleet)
            .forecast(&forecast)
            .budget(Budget::builder().max_iterations(50).patience(10).build())
            .granularity(1)
            .build()
            .run()
            .unwrap();
        assert_eq!(result.score.loss, busy_score.loss);
        assert_eq!(busy_score.n_actions, 2);
        assert_eq!(result.score.n_actions, 0);
        assert_eq!(result.schedule, Schedule::idle(4, 1));
        assert!(result.n_evaluations > 2);
        assert_eq!(result.termination, Termination::Converged);
    }

    /// Verify that an infeasible fleet is reported distinctly from running out of budget.
    #[test]
    fn no_feasible_schedule() {
        let grid = GridConnection { max_import: Some(Kilowatts(0.5)), max_export: None };
        let fleet = Fleet::try_new(
            vec![DeviceSpec::new("load", DeviceKind::Load(Load { power: Kilowatts(0.1) }))],
            grid,
        )
        .unwrap();
        let forecast = forecast(&PRICES);
        let error = optimize(&fleet, &forecast, Objective::default(), Budget::default())
            .unwrap_err();
        assert_eq!(error.n_evaluations, 2);
        assert!(error.last_rejection.is_some());
    }
}
