use std::ops::Range;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TwoOptParams {
    /// Full best-improvement passes before giving up.
    pub max_passes: usize,

    /// Restricts moves to tour positions inside this range.
    #[serde(skip)]
    pub window: Option<Range<usize>>,
}

impl Default for TwoOptParams {
    fn default() -> Self {
        TwoOptParams {
            max_passes: 1_000,
            window: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GeneticParams {
    pub population_size: usize,
    pub generations: usize,
    pub tournament_size: usize,
    /// Chance for each gene to be swapped with another one.
    pub mutation_probability: f64,
    /// Best individuals copied unchanged into the next generation.
    pub elitism: usize,
}

impl Default for GeneticParams {
    fn default() -> Self {
        GeneticParams {
            population_size: 50,
            generations: 200,
            tournament_size: 3,
            mutation_probability: 0.02,
            elitism: 1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnnealingParams {
    pub initial_temperature: f64,
    /// Geometric cooling factor applied after every step.
    pub cooling_rate: f64,
    pub min_temperature: f64,
    pub max_iterations: usize,
    /// Weight of the hard score when collapsing a score into an energy.
    pub infeasibility_penalty: f64,
}

impl Default for AnnealingParams {
    fn default() -> Self {
        AnnealingParams {
            initial_temperature: 10_000.0,
            cooling_rate: 0.995,
            min_temperature: 1e-8,
            max_iterations: 5_000,
            infeasibility_penalty: 1_000.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, Default)]
pub enum Threads {
    Single,
    #[default]
    Auto,
    Multi(usize),
}

impl Threads {
    pub fn number_of_threads(&self) -> usize {
        match self {
            Threads::Single => 1,
            Threads::Multi(num) => (*num).max(1),
            Threads::Auto => std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }
}
