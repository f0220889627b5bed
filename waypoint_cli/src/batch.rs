use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use jiff::SignedDuration;
use tracing::{error, info};
use waypoint_optimizer::{
    error::OptimizationError,
    json::types::{JsonBatchRequest, JsonRouteRequest},
    solver::{
        batch_optimizer::{BatchOptimizer, BatchParams, BatchResult, RouteOutcome, RouteRequest},
        solver_params::Threads,
        termination::CancellationToken,
    },
};

use crate::{
    file_utils::{read_json, read_json_folder, write_json},
    matrix_client::{Client, matrix_client},
    parsers, report,
};

#[derive(Args)]
pub struct BatchArgs {
    /// Batch request, or a folder of route requests
    #[arg(short, long)]
    input: PathBuf,

    /// Worker threads, all cores when empty
    #[arg(short, long)]
    threads: Option<usize>,

    /// Budget of every route without one of its own
    #[arg(long, value_parser = parsers::parse_duration)]
    route_timeout: Option<SignedDuration>,

    #[arg(long, short = 'o')]
    out: Option<PathBuf>,
}

fn load_batch(input: &PathBuf) -> anyhow::Result<JsonBatchRequest> {
    if input.is_file() {
        return read_json(input);
    }

    let routes = read_json_folder(input)?
        .iter()
        .map(|path| read_json::<JsonRouteRequest>(path))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(JsonBatchRequest {
        routes,
        threads: None,
        route_time_budget: None,
    })
}

#[derive(Default)]
struct PreparedRoutes {
    requests: Vec<RouteRequest>,
    /// Input index and outcome of every request whose problem cannot be built.
    failures: Vec<(usize, RouteOutcome)>,
}

fn prepare_routes(client: &Client, routes: &[JsonRouteRequest]) -> PreparedRoutes {
    let mut prepared = PreparedRoutes::default();

    for (index, route) in routes.iter().enumerate() {
        match route.build_problem(client) {
            Ok(problem) => {
                let mut request = RouteRequest::new(route.route_id(), Arc::new(problem));
                request.current_order = route.current_order.clone();
                request.algorithm = route.algorithm.unwrap_or_default();
                request.options = route.options.clone().unwrap_or_default();
                prepared.requests.push(request);
            }
            Err(error) => {
                error!(route = route.route_id(), "Invalid route request: {error:#}");
                prepared.failures.push((
                    index,
                    RouteOutcome::failed(
                        route.route_id(),
                        OptimizationError::InvalidProblem(format!("{error:#}")),
                    ),
                ));
            }
        }
    }

    prepared
}

/// Optimizes every valid route, the result has one outcome per input route.
fn optimize_batch(
    optimizer: &BatchOptimizer,
    prepared: PreparedRoutes,
    cancellation: &CancellationToken,
) -> BatchResult {
    let mut result = optimizer.optimize_all(prepared.requests, cancellation);
    result.insert_failures(prepared.failures);
    result
}

fn print_result(result: &BatchResult) {
    let mut table = report::table(&[
        "Route",
        "Status",
        "Decision",
        "Baseline",
        "Result",
        "Improvement",
        "Note",
    ]);

    for outcome in &result.outcomes {
        match &outcome.outcome {
            Ok(run) => table.add_row(vec![
                outcome.route_id.clone(),
                format!("{:?}", run.status()),
                format!("{:?}", run.decision()),
                report::km(run.baseline().distance()),
                report::km(run.result().distance()),
                format!("{:.2}%", run.improvement_percentage()),
                run.warnings()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            ]),
            Err(error) => table.add_row(vec![
                outcome.route_id.clone(),
                format!("{:?}", outcome.status()),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                error.to_string(),
            ]),
        };
    }

    println!("{table}");
}

pub fn run(args: BatchArgs) -> anyhow::Result<()> {
    let batch = load_batch(&args.input)?;
    let client = matrix_client();
    let prepared = prepare_routes(&client, &batch.routes);

    let threads = match args.threads.or(batch.threads) {
        Some(threads) => Threads::Multi(threads),
        None => Threads::Auto,
    };
    info!(
        "Optimizing {} routes on {} threads, {} invalid",
        prepared.requests.len(),
        threads.number_of_threads(),
        prepared.failures.len()
    );

    let mut optimizer = BatchOptimizer::new(BatchParams {
        threads,
        route_time_budget: args.route_timeout.or(batch.route_time_budget),
    })?;

    let bar = ProgressBar::new(prepared.requests.len() as u64);
    bar.set_style(ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len} routes")?);
    bar.enable_steady_tick(Duration::from_secs(1));

    let progress = bar.clone();
    optimizer.on_route_finished(move |_| progress.inc(1));

    let result = optimize_batch(&optimizer, prepared, &CancellationToken::new());
    bar.finish_and_clear();

    print_result(&result);

    if let Some(out) = args.out {
        write_json(&out, &result)?;
        info!("Batch written to {}", out.display());
    }

    Ok(())
}
