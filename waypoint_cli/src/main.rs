use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;

use crate::{
    batch::BatchArgs,
    deviation::DeviationArgs,
    generate::GenerateSubcommands,
    optimize::OptimizeArgs,
    scenario::ScenarioArgs,
    simulate::{CompareArgs, SimulateArgs},
};

mod batch;
mod deviation;
mod file_utils;
mod generate;
mod matrix_client;
mod optimize;
mod parsers;
mod report;
mod scenario;
mod simulate;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimizes the stop order of one route
    #[command(visible_alias = "o")]
    Optimize {
        #[command(flatten)]
        args: OptimizeArgs,
    },
    /// Optimizes many routes in parallel
    Batch {
        #[command(flatten)]
        args: BatchArgs,
    },
    /// Prices a hypothetical route
    Simulate {
        #[command(flatten)]
        args: SimulateArgs,
    },
    /// Simulates several routes and ranks them
    Compare {
        #[command(flatten)]
        args: CompareArgs,
    },
    /// Applies what-if modifications to a committed route
    Scenario {
        #[command(flatten)]
        args: ScenarioArgs,
    },
    /// Replays GPS positions against a planned route
    Deviation {
        #[command(flatten)]
        args: DeviationArgs,
    },
    #[command(visible_alias = "g")]
    Generate {
        #[command(subcommand)]
        commands: GenerateSubcommands,
    },
}

fn main() -> Result<(), anyhow::Error> {
    dotenvy::from_filename("./.env.local").ok();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.command {
        Commands::Optimize { args } => optimize::run(args)?,
        Commands::Batch { args } => batch::run(args)?,
        Commands::Simulate { args } => simulate::run_simulate(args)?,
        Commands::Compare { args } => simulate::run_compare(args)?,
        Commands::Scenario { args } => scenario::run(args)?,
        Commands::Deviation { args } => deviation::run(args)?,
        Commands::Generate { commands } => generate::run(commands)?,
    }

    Ok(())
}
