use comfy_table::{Table, presets::UTF8_FULL};
use jiff::SignedDuration;
use waypoint_optimizer::eta::eta_calculator::EtaReport;

pub fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header.to_vec());
    table
}

pub fn km(meters: f64) -> String {
    format!("{:.2} km", meters / 1000.0)
}

pub fn minutes(duration: SignedDuration) -> String {
    format!("{:.1} min", duration.as_secs_f64() / 60.0)
}

pub fn eta_table(eta: &EtaReport) -> Table {
    let mut table = table(&["#", "Stop", "Arrival", "Departure", "Status", "Traffic", "Distance"]);

    for (position, stop) in eta.stops.iter().enumerate() {
        table.add_row(vec![
            (position + 1).to_string(),
            stop.external_id.clone(),
            stop.arrival.to_string(),
            stop.departure.to_string(),
            format!("{:?}", stop.status),
            format!("{:?} x{:.2}", stop.leg.congestion, stop.leg.traffic_multiplier),
            km(stop.cumulative_distance),
        ]);
    }

    table
}
