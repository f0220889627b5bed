pub mod tour;
pub mod tour_metrics;
