use rand::{Rng, SeedableRng, rngs::SmallRng};
use tracing::{Level, debug, instrument};

use crate::{
    problem::stop::StopIdx,
    solver::{
        constraints::tour_evaluator::TourEvaluator, ls::two_opt::TwoOptMove, score::Score,
        solver_params::AnnealingParams, termination::Termination,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct AnnealingOutcome {
    pub order: Vec<StopIdx>,
    pub iterations: usize,
    pub accepted_moves: usize,
    pub final_temperature: f64,
    pub interrupted: bool,
    pub found_feasible: bool,
}

/// Simulated annealing over random segment reversals, starting from `initial`.
///
/// A worse neighbour is accepted with probability `exp(-delta / temperature)`, the
/// temperature is multiplied by the cooling rate after every step. The best tour ever
/// seen is returned, preferring feasible ones, not the tour at the final temperature.
#[instrument(skip_all, level = Level::DEBUG)]
pub fn simulated_annealing(
    evaluator: &TourEvaluator,
    initial: Vec<StopIdx>,
    params: &AnnealingParams,
    seed: u64,
    termination: &Termination,
) -> AnnealingOutcome {
    let initial_score = evaluator.score(&initial);

    let mut best = (initial.clone(), initial_score);
    let mut best_feasible = initial_score.is_feasible().then(|| best.clone());

    let mut current = initial;
    let mut current_energy = initial_score.penalized(params.infeasibility_penalty);

    let mut rng = SmallRng::seed_from_u64(seed);
    let mut temperature = params.initial_temperature;
    let mut iterations = 0;
    let mut accepted_moves = 0;
    let mut interrupted = false;

    let len = current.len();

    while len >= 2 && iterations < params.max_iterations && temperature > params.min_temperature
    {
        if termination.should_stop() {
            interrupted = true;
            break;
        }
        iterations += 1;

        let first = rng.random_range(0..len);
        let mut second = rng.random_range(0..len - 1);
        if second >= first {
            second += 1;
        }
        let op = TwoOptMove::new(first.min(second), first.max(second));

        let mut candidate = current.clone();
        op.apply(&mut candidate);
        let candidate_score = evaluator.score(&candidate);
        let candidate_energy = candidate_score.penalized(params.infeasibility_penalty);

        let delta = candidate_energy - current_energy;
        let accept = delta < 0.0 || rng.random::<f64>() < (-delta / temperature).exp();

        if accept {
            accepted_moves += 1;
            current = candidate;
            current_energy = candidate_energy;
            offer(&mut best, &mut best_feasible, &current, candidate_score);
        }

        temperature *= params.cooling_rate;
    }

    debug!(
        "Simulated annealing: {} iterations, {} accepted, final temperature {:.3}",
        iterations, accepted_moves, temperature
    );

    let found_feasible = best_feasible.is_some();
    let (order, _) = best_feasible.unwrap_or(best);

    AnnealingOutcome {
        order,
        iterations,
        accepted_moves,
        final_temperature: temperature,
        interrupted,
        found_feasible,
    }
}

fn offer(
    best: &mut (Vec<StopIdx>, Score),
    best_feasible: &mut Option<(Vec<StopIdx>, Score)>,
    order: &[StopIdx],
    score: Score,
) {
    if score < best.1 {
        *best = (order.to_vec(), score);
    }

    if score.is_feasible() && best_feasible.as_ref().is_none_or(|(_, best)| score < *best) {
        *best_feasible = Some((order.to_vec(), score));
    }
}
