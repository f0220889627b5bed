use std::path::PathBuf;

use anyhow::anyhow;
use clap::Args;
use tracing::{info, warn};
use waypoint_optimizer::{
    json::types::JsonScenarioRequest,
    simulation::scenario::{BasePlan, ScenarioOutcome, ScenarioViolation, create_scenario},
};

use crate::{
    file_utils::{read_json, write_json},
    matrix_client::matrix_client,
    report,
};

#[derive(Args)]
pub struct ScenarioArgs {
    /// Scenario request
    #[arg(short, long)]
    input: PathBuf,

    #[arg(long, short = 'o')]
    out: Option<PathBuf>,
}

fn describe(violation: &ScenarioViolation) -> String {
    match violation {
        ScenarioViolation::CapacityExceeded { demand, capacity } => format!(
            "{:.1} kg for {:.1} kg",
            demand.weight_kg, capacity.max_weight_kg
        ),
        ScenarioViolation::LateArrival { stop_id, lateness } => {
            format!("{stop_id} late by {}", report::minutes(*lateness))
        }
    }
}

pub fn run(args: ScenarioArgs) -> anyhow::Result<()> {
    let request: JsonScenarioRequest = read_json(&args.input)?;
    let problem = request.route.build_problem(&matrix_client())?;

    let departure_time = request
        .route
        .departure_time
        .ok_or_else(|| anyhow!("Scenarios need the departure_time of the route"))?;
    let order = request.route.current_order.clone().unwrap_or_else(|| {
        problem
            .stops()
            .iter()
            .map(|stop| stop.external_id().to_owned())
            .collect()
    });
    let base = BasePlan {
        problem: &problem,
        order: &order,
        departure_time,
    };
    let two_opt = request.two_opt.clone().unwrap_or_default();

    let mut table = report::table(&[
        "Scenario",
        "Distance",
        "vs base",
        "Duration",
        "vs base",
        "Re-optimized",
        "Violations",
    ]);
    let mut outcomes = Vec::<ScenarioOutcome>::with_capacity(request.scenarios.len());

    for scenario in &request.scenarios {
        let outcome = match create_scenario(base, scenario, &two_opt) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!("Scenario {} is invalid: {error}", scenario.name);
                continue;
            }
        };

        table.add_row(vec![
            outcome.name.clone(),
            report::km(outcome.tour.distance()),
            format!("{:+.0} m", outcome.distance_delta),
            report::minutes(outcome.eta.total_duration()),
            report::minutes(outcome.duration_delta),
            outcome
                .reoptimized_window
                .as_ref()
                .map_or_else(|| "-".to_owned(), |window| format!("{window:?}")),
            outcome
                .violations
                .iter()
                .map(describe)
                .collect::<Vec<_>>()
                .join("; "),
        ]);
        outcomes.push(outcome);
    }

    println!("{table}");

    if let Some(out) = args.out {
        write_json(&out, &outcomes)?;
        info!("Scenarios written to {}", out.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use super::*;

    #[test]
    fn test_describe_late_arrival() {
        let violation = ScenarioViolation::LateArrival {
            stop_id: "s2".to_owned(),
            lateness: SignedDuration::from_secs(150),
        };

        assert_eq!(describe(&violation), "s2 late by 2.5 min");
    }
}
