pub mod annealing;
pub mod batch_optimizer;
pub mod constraints;
pub mod construction;
pub mod genetic;
pub mod ls;
pub mod optimize;
pub mod score;
pub mod score_level;
pub mod solution;
pub mod solver_params;
pub mod termination;
