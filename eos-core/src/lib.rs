//! Simulation and schedule optimization of a fleet of energy devices.
//!
//! A [`Forecast`] of exogenous conditions and a [`Fleet`] of devices feed the [`Simulator`], which
//! turns a [`Schedule`] of decisions into a [`Trajectory`] or rejects it as infeasible. The
//! [`Optimizer`] searches the schedule space for the best [`Score`] under the [`Objective`], and
//! [`record::assemble`] packages the outcome for the [`Sink`]s.

pub mod catalog;
pub mod device;
pub mod error;
pub mod fleet;
pub mod flow;
pub mod forecast;
pub mod horizon;
pub mod interval;
pub mod metrics;
pub mod objective;
pub mod optimizer;
pub mod persistence;
pub mod record;
pub mod schedule;
pub mod simulator;
pub mod trajectory;

pub use self::{
    catalog::{CatalogError, DeviceCatalog, MemoryCatalog},
    device::{Decision, DeviceId, DeviceKind, DeviceSpec, DeviceState},
    error::{
        Culprit,
        FleetError,
        HorizonError,
        IncompleteForecast,
        InfeasibleSchedule,
        NoFeasibleSchedule,
        Violation,
    },
    fleet::{Fleet, GridConnection},
    flow::Flow,
    forecast::{Conditions, FlatForecast, Forecast, ForecastSource, RecordedForecast},
    horizon::Horizon,
    interval::{Interval, Timestamp},
    metrics::{MetricsExporter, RunMetrics, TracingExporter},
    objective::{ChargeGoal, Objective, Score},
    optimizer::{BestResult, Budget, Optimizer, Termination, optimize},
    persistence::{Ack, MemorySink, Sink, SinkError},
    record::{RunId, RunInfo, RunRecord},
    schedule::Schedule,
    simulator::Simulator,
    trajectory::Trajectory,
};
