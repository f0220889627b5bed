use jiff::SignedDuration;
use serde::Serialize;

use crate::problem::load::Load;

/// Derived metrics of a tour. Durations are free-flow, traffic is the ETA calculator's job.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TourMetrics {
    /// Meters, including the closing leg when the vehicle returns to its depot.
    pub total_distance: f64,
    pub driving_duration: SignedDuration,
    pub service_duration: SignedDuration,
    pub total_duration: SignedDuration,
    pub total_load: Load,
    /// Percentage of the most constrained capacity dimension.
    pub capacity_utilization: f64,
    pub total_lateness: SignedDuration,
    pub late_stops: usize,
    pub is_feasible: bool,
}
