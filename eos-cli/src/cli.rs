mod influx;
mod optimize;
mod scenario;
mod simulate;

use clap::{Parser, Subcommand};

pub use self::{
    optimize::{OptimizeArgs, optimize},
    simulate::{SimulateArgs, simulate},
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Simulate a seed schedule and print the trajectory.
    #[clap(name = "simulate")]
    Simulate(Box<SimulateArgs>),

    /// Search for the best schedule, print it, and store the run.
    #[clap(name = "optimize")]
    Optimize(Box<OptimizeArgs>),
}
