use std::path::PathBuf;

use clap::Args;
use jiff::Timestamp;
use serde::Serialize;
use tracing::info;
use waypoint_optimizer::{
    json::types::{JsonCompareRequest, JsonSimulation},
    simulation::{
        compare_routes::{RankedRoute, RouteCandidate, compare_routes},
        simulate_route::{SimulationResult, simulate_route},
    },
};

use crate::{
    file_utils::{read_json, write_json},
    matrix_client::{Client, matrix_client},
    report,
};

#[derive(Args)]
pub struct SimulateArgs {
    /// Simulation request
    #[arg(short, long)]
    input: PathBuf,

    /// Overrides the start time of the request
    #[arg(long)]
    start_time: Option<Timestamp>,

    #[arg(long, short = 'o')]
    out: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompareArgs {
    /// Compare request
    #[arg(short, long)]
    input: PathBuf,

    #[arg(long, short = 'o')]
    out: Option<PathBuf>,
}

fn simulate(client: &Client, simulation: &JsonSimulation) -> anyhow::Result<SimulationResult> {
    let problem = simulation.route.build_problem(client)?;
    let options = simulation.options.clone().unwrap_or_default();

    Ok(simulate_route(
        simulation.name.as_str(),
        &problem,
        simulation.start_time,
        &options,
    )?)
}

fn print_simulation(result: &SimulationResult) {
    let metrics = &result.metrics;
    let mut table = report::table(&["Metric", "Value"]);
    table
        .add_row(vec!["Distance".to_owned(), format!("{:.2} km", metrics.distance_km)])
        .add_row(vec!["Driving".to_owned(), report::minutes(metrics.driving_duration)])
        .add_row(vec!["Total".to_owned(), report::minutes(metrics.total_duration)])
        .add_row(vec!["Traffic delay".to_owned(), report::minutes(metrics.traffic_delay)])
        .add_row(vec!["Fuel".to_owned(), format!("{:.2} l", metrics.fuel_liters)])
        .add_row(vec!["Cost".to_owned(), format!("{:.2}", metrics.total_cost)])
        .add_row(vec!["CO2".to_owned(), format!("{:.2} kg", metrics.co2_kg)])
        .add_row(vec![
            "Utilization".to_owned(),
            format!("{:.1}%", metrics.capacity_utilization),
        ])
        .add_row(vec![
            "On time".to_owned(),
            format!("{:.1}%", metrics.on_time_percentage),
        ]);

    println!("Simulation {}", result.name);
    println!("{table}");
    println!("{}", report::eta_table(&result.eta));
}

pub fn run_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    let mut simulation: JsonSimulation = read_json(&args.input)?;
    if let Some(start_time) = args.start_time {
        simulation.start_time = start_time;
    }

    let result = simulate(&matrix_client(), &simulation)?;
    print_simulation(&result);

    if let Some(out) = args.out {
        write_json(&out, &result)?;
        info!("Simulation written to {}", out.display());
    }

    Ok(())
}

#[derive(Serialize)]
struct ComparisonOutput {
    simulations: Vec<SimulationResult>,
    ranking: Vec<RankedRoute>,
}

pub fn run_compare(args: CompareArgs) -> anyhow::Result<()> {
    let request: JsonCompareRequest = read_json(&args.input)?;
    let client = matrix_client();

    let simulations = request
        .simulations
        .iter()
        .map(|simulation| simulate(&client, simulation))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let candidates = simulations
        .iter()
        .map(RouteCandidate::from)
        .collect::<Vec<_>>();
    let ranking = compare_routes(&candidates, &request.weights.unwrap_or_default());

    let mut table = report::table(&[
        "Rank",
        "Simulation",
        "Score",
        "Distance",
        "Duration",
        "Utilization",
        "vs best",
    ]);
    for ranked in &ranking {
        table.add_row(vec![
            ranked.rank.to_string(),
            ranked.candidate.name.clone(),
            format!("{:.3}", ranked.score),
            format!("{:.2} km", ranked.candidate.distance_km),
            report::minutes(ranked.candidate.duration),
            format!("{:.1}%", ranked.candidate.utilization),
            format!(
                "{:+.2} km, {}",
                ranked.deltas.distance_km,
                report::minutes(ranked.deltas.duration)
            ),
        ]);
    }
    println!("{table}");

    if let Some(out) = args.out {
        write_json(
            &out,
            &ComparisonOutput {
                simulations,
                ranking,
            },
        )?;
        info!("Comparison written to {}", out.display());
    }

    Ok(())
}
