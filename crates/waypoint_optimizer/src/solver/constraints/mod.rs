pub mod capacity_constraint;
pub mod constraint;
pub mod time_window_constraint;
pub mod tour_evaluator;
pub mod transport_cost_constraint;
