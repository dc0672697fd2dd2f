#![allow(clippy::doc_markdown)]
#![doc = include_str!("../../README.md")]

mod cli;
mod influx;
mod installation;
mod json;
mod prelude;
mod prices;
mod tables;

use clap::{Parser, crate_version};

use crate::{
    cli::{Args, Command, optimize, simulate},
    prelude::*,
};

fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    let args = Args::parse();

    match args.command {
        Command::Simulate(args) => simulate(&args)?,
        Command::Optimize(args) => optimize(&args)?,
    }

    info!("done!");
    Ok(())
}
