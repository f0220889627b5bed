use std::{path::PathBuf, sync::Arc};

use clap::Args;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;
use waypoint_optimizer::{
    json::types::JsonDeviationRequest,
    simulation::deviation::{DeviationEvent, DeviationRecord, DeviationTracker, PlannedRoute},
};

use crate::{
    file_utils::{read_json, write_json},
    matrix_client::matrix_client,
    report,
};

#[derive(Args)]
pub struct DeviationArgs {
    /// Deviation request: a route and the GPS positions of its vehicle
    #[arg(short, long)]
    input: PathBuf,

    #[arg(long, short = 'o')]
    out: Option<PathBuf>,
}

#[derive(Serialize)]
struct DeviationOutput {
    planned: PlannedRoute,
    records: Vec<DeviationRecord>,
}

fn event_label(event: &DeviationEvent) -> &'static str {
    match event {
        DeviationEvent::Opened(_) => "opened",
        DeviationEvent::Updated(_) => "updated",
        DeviationEvent::Resolved(_) => "resolved",
    }
}

pub fn run(args: DeviationArgs) -> anyhow::Result<()> {
    let request: JsonDeviationRequest = read_json(&args.input)?;
    let problem = request.route.build_problem(&matrix_client())?;

    let order = match &request.route.current_order {
        Some(order) => problem.resolve_order(order.as_slice())?,
        None => problem.stop_ids().collect(),
    };
    let planned = PlannedRoute::from_tour(request.route.route_id(), &problem, &order);

    let events = Arc::new(Mutex::new(Vec::new()));
    let mut tracker = DeviationTracker::new(request.params.clone().unwrap_or_default());
    let sink = Arc::clone(&events);
    tracker.on_event(move |event| {
        let record = match event {
            DeviationEvent::Opened(record)
            | DeviationEvent::Updated(record)
            | DeviationEvent::Resolved(record) => record,
        };
        sink.lock().push((
            event_label(event),
            record.last_observed_at,
            record.distance_meters,
        ));
    });

    for fix in &request.positions {
        tracker.observe(&planned, fix.to_location(problem.distance_method()), fix.at);
    }

    let mut table = report::table(&["At", "Event", "Distance"]);
    for (label, at, distance) in events.lock().iter() {
        table.add_row(vec![at.to_string(), label.to_string(), format!("{distance:.0} m")]);
    }
    println!("{table}");

    let records = tracker.history(planned.route_id());
    info!(
        "{} positions, {} deviations, {} still active",
        request.positions.len(),
        records.len(),
        records.iter().filter(|record| record.is_active()).count()
    );

    if let Some(out) = args.out {
        write_json(&out, &DeviationOutput { planned, records })?;
        info!("Deviations written to {}", out.display());
    }

    Ok(())
}

