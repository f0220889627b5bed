use std::path::PathBuf;

use clap::Args;
use jiff::SignedDuration;
use serde::Serialize;
use tracing::info;
use waypoint_optimizer::{
    eta::eta_calculator::{EtaReport, estimate_eta},
    json::types::JsonRouteRequest,
    solver::optimize::{Algorithm, OptimizationOptions, OptimizationRun, optimize},
};

use crate::{
    file_utils::{read_json, write_json},
    matrix_client::matrix_client,
    parsers, report,
};

#[derive(Args)]
pub struct OptimizeArgs {
    /// Route request to optimize
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Overrides the algorithm of the request
    #[arg(short, long, value_parser = parsers::parse_algorithm)]
    algorithm: Option<Algorithm>,

    #[arg(short, long, value_parser = parsers::parse_duration)]
    timeout: Option<SignedDuration>,

    #[arg(long)]
    seed: Option<u64>,

    /// Marks the run for auto-apply when it improves enough
    #[arg(long)]
    auto_apply: bool,

    /// Writes the run as JSON
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,
}

#[derive(Serialize)]
struct OptimizeOutput<'a> {
    route_id: &'a str,
    run: &'a OptimizationRun,
    eta: Option<EtaReport>,
}

pub fn options_with_overrides(
    options: Option<&OptimizationOptions>,
    timeout: Option<SignedDuration>,
    seed: Option<u64>,
) -> OptimizationOptions {
    let mut options = options.cloned().unwrap_or_default();
    if timeout.is_some() {
        options.time_budget = timeout;
    }
    if let Some(seed) = seed {
        options.seed = seed;
    }
    options
}

pub fn run(args: OptimizeArgs) -> anyhow::Result<()> {
    let request: JsonRouteRequest = read_json(&args.input)?;
    let client = matrix_client();
    let problem = request.build_problem(&client)?;

    let mut options = options_with_overrides(request.options.as_ref(), args.timeout, args.seed);
    options.auto_apply |= args.auto_apply;
    let algorithm = args.algorithm.or(request.algorithm).unwrap_or_default();

    info!(
        "Optimizing {} ({} stops) with {algorithm}",
        request.route_id(),
        problem.num_stops()
    );
    let run = optimize(
        &problem,
        request.current_order.as_deref(),
        algorithm,
        &options,
    )?;

    let eta = problem
        .departure_time()
        .map(|departure_time| estimate_eta(&problem, run.result().stops(), departure_time))
        .transpose()?;

    let mut summary = report::table(&[
        "Route",
        "Algorithm",
        "Status",
        "Decision",
        "Baseline",
        "Result",
        "Improvement",
        "Elapsed",
    ]);
    summary.add_row(vec![
        request.route_id().to_owned(),
        algorithm.to_string(),
        format!("{:?}", run.status()),
        format!("{:?}", run.decision()),
        report::km(run.baseline().distance()),
        report::km(run.result().distance()),
        format!("{:.2}%", run.improvement_percentage()),
        format!("{:?}", run.elapsed()),
    ]);
    println!("{summary}");
    println!("Order: {}", run.result().stop_ids().join(" -> "));

    for warning in run.warnings() {
        println!("Warning: {warning}");
    }

    if let Some(eta) = &eta {
        println!("{}", report::eta_table(eta));
    }

    if let Some(out) = args.out {
        write_json(
            &out,
            &OptimizeOutput {
                route_id: request.route_id(),
                run: &run,
                eta,
            },
        )?;
        info!("Run written to {}", out.display());
    }

    Ok(())
}
