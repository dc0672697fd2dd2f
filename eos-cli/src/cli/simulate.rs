use clap::{Parser, ValueEnum};
use eos_core::{
    Simulator,
    optimizer::{greedy, idle},
};

use crate::{
    cli::scenario::ScenarioArgs,
    prelude::*,
    tables::{build_loss_table, build_steps_table},
};

#[derive(Parser)]
pub struct SimulateArgs {
    #[clap(flatten)]
    scenario: ScenarioArgs,

    /// How to build the simulated schedule.
    #[clap(long, env = "EOS_STRATEGY", default_value = "greedy")]
    strategy: Strategy,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum Strategy {
    /// Do nothing at all.
    Idle,

    /// Charge below and discharge above the median price.
    Greedy,
}

#[instrument(skip_all)]
pub fn simulate(args: &SimulateArgs) -> Result {
    let scenario = args.scenario.load()?;
    let (fleet, forecast) = (&scenario.fleet, &scenario.forecast);
    let schedule = match args.strategy {
        Strategy::Idle => idle(fleet, forecast),
        Strategy::Greedy => greedy(fleet, forecast),
    };
    let trajectory = Simulator::builder()
        .fleet(fleet)
        .forecast(forecast)
        .build()
        .simulate(&schedule)
        .context("the schedule is infeasible")?;
    let loss = scenario.objective.loss(fleet, &trajectory);
    info!(loss = %loss.total(), n_actions = schedule.n_actions(), "simulated");

    println!("{}", build_steps_table(fleet, &trajectory));
    println!("{}", build_loss_table(loss, &trajectory.total_energy_system(fleet)));
    Ok(())
}
