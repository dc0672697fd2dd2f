use std::path::PathBuf;

use chrono::Local;
use clap::Parser;
use eos_core::{
    Budget,
    MetricsExporter,
    Optimizer,
    RunInfo,
    Sink,
    TracingExporter,
    persistence::publish,
    record::assemble,
};

use crate::{
    cli::{influx::InfluxArgs, scenario::ScenarioArgs},
    influx::{InfluxMetrics, InfluxSink},
    json::JsonSink,
    prelude::*,
    tables::{build_loss_table, build_run_table, build_steps_table},
};

#[derive(Parser)]
pub struct OptimizeArgs {
    #[clap(flatten)]
    scenario: ScenarioArgs,

    /// Maximum number of search iterations.
    #[clap(long, env = "EOS_MAX_ITERATIONS", default_value = "1000")]
    max_iterations: usize,

    /// Wall-clock limit of the search.
    #[clap(long, env = "EOS_TIME_LIMIT")]
    time_limit: Option<humantime::Duration>,

    /// Stop after this many iterations without an improvement.
    #[clap(long, env = "EOS_PATIENCE", default_value = "100")]
    patience: usize,

    /// Candidates evaluated per iteration.
    #[clap(long, env = "EOS_NEIGHBORS", default_value = "16")]
    neighbors: usize,

    /// Decision levels per direction of each device.
    #[clap(long, env = "EOS_GRANULARITY", default_value = "4")]
    granularity: usize,

    /// Random seed of the search.
    #[clap(long, env = "EOS_SEED", default_value = "0")]
    seed: u64,

    /// Run identifier, defaults to the fleet id and the horizon start.
    ///
    /// Storing a run with the same identifier replaces the earlier one.
    #[clap(long, env = "EOS_RUN_ID")]
    run_id: Option<String>,

    /// Directory for the JSON run records.
    #[clap(long, env = "EOS_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    #[clap(flatten)]
    influx: InfluxArgs,
}

impl OptimizeArgs {
    fn budget(&self) -> Budget {
        Budget::builder()
            .max_iterations(self.max_iterations)
            .maybe_time_limit(self.time_limit.map(Into::into))
            .patience(self.patience)
            .build()
    }
}

#[instrument(skip_all)]
pub fn optimize(args: &OptimizeArgs) -> Result {
    let scenario = args.scenario.load()?;
    let (fleet, forecast) = (&scenario.fleet, &scenario.forecast);
    let started_at = Local::now().fixed_offset();

    let result = Optimizer::builder()
        .fleet(fleet)
        .forecast(forecast)
        .objective(scenario.objective)
        .budget(args.budget())
        .neighbors(args.neighbors)
        .granularity(args.granularity)
        .seed(args.seed)
        .build()
        .run()
        .context("no feasible schedule found, check the device limits and the grid connection")?;

    println!("{}", build_steps_table(fleet, &result.trajectory));
    println!(
        "{}",
        build_loss_table(
            scenario.objective.loss(fleet, &result.trajectory),
            &result.trajectory.total_energy_system(fleet),
        ),
    );
    println!("{}", build_run_table(&result));

    let run_id = args.run_id.clone().unwrap_or_else(|| {
        format!("{}-{}", scenario.fleet_id, forecast.horizon().start().format("%Y%m%dT%H%M"))
    });
    let run = RunInfo { run_id: run_id.into(), fleet_id: scenario.fleet_id.clone(), started_at };
    let record = assemble(&run, fleet, &result);

    let mut json_sink = args.output_dir.as_ref().map(JsonSink::new);
    let influx = args.influx.client()?;
    let mut influx_sink = influx.as_ref().map(InfluxSink);
    let mut sinks: Vec<&mut dyn Sink> = Vec::new();
    if let Some(sink) = json_sink.as_mut() {
        sinks.push(sink);
    }
    if let Some(sink) = influx_sink.as_mut() {
        sinks.push(sink);
    }
    let exporter: Box<dyn MetricsExporter + '_> = match &influx {
        Some(client) => Box::new(InfluxMetrics(client)),
        None => Box::new(TracingExporter),
    };

    let acks =
        publish(&record, &mut sinks, exporter.as_ref()).context("failed to store the run")?;
    for ack in acks {
        info!(run_id = %ack.run_id, n_points = ack.n_points, replaced = ack.replaced, "stored");
    }
    Ok(())
}
