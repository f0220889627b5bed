pub mod genetic_algorithm;
pub mod order_crossover;
pub mod tournament;
