pub mod error;
pub mod eta;
pub mod json;
pub mod problem;
pub mod simulation;
pub mod solver;
mod utils;

#[cfg(test)]
pub(crate) mod test_utils;
