pub mod eta_calculator;
pub mod traffic_conditions;
