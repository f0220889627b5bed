use rand::{SeedableRng, rngs::SmallRng, seq::SliceRandom};
use tracing::{Level, debug, instrument};

use crate::{
    problem::stop::StopIdx,
    solver::{
        constraints::tour_evaluator::TourEvaluator, score::Score, solver_params::GeneticParams,
        termination::Termination,
    },
};

use super::{
    order_crossover::{random_order_crossover, swap_mutation},
    tournament::select_tournament,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    pub order: Vec<StopIdx>,
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneticOutcome {
    pub order: Vec<StopIdx>,
    pub generations: usize,
    pub interrupted: bool,
    /// Whether any individual without hard violations was seen.
    pub found_feasible: bool,
}

/// Keeps the best individual overall and the best one without hard violations.
struct BestIndividuals {
    overall: Individual,
    feasible: Option<Individual>,
}

impl BestIndividuals {
    fn new(individual: &Individual) -> Self {
        BestIndividuals {
            overall: individual.clone(),
            feasible: individual.score.is_feasible().then(|| individual.clone()),
        }
    }

    fn offer(&mut self, individual: &Individual) {
        if individual.score < self.overall.score {
            self.overall = individual.clone();
        }

        if individual.score.is_feasible()
            && self
                .feasible
                .as_ref()
                .is_none_or(|best| individual.score < best.score)
        {
            self.feasible = Some(individual.clone());
        }
    }
}

/// Permutation GA seeded with `initial`: tournament selection, order crossover, swap
/// mutation and elitism. Infeasible individuals stay in the population with a penalized
/// score, the returned order is the best feasible one seen when there is one.
#[instrument(skip_all, level = Level::DEBUG)]
pub fn genetic_algorithm(
    evaluator: &TourEvaluator,
    initial: &[StopIdx],
    params: &GeneticParams,
    seed: u64,
    termination: &Termination,
) -> GeneticOutcome {
    let num_stops = evaluator.problem().num_stops();
    let evaluate = |order: Vec<StopIdx>| Individual {
        score: evaluator.score(&order),
        order,
    };

    if initial.len() < 2 {
        let individual = evaluate(initial.to_vec());
        return GeneticOutcome {
            found_feasible: individual.score.is_feasible(),
            order: individual.order,
            generations: 0,
            interrupted: false,
        };
    }

    let mut rng = SmallRng::seed_from_u64(seed);
    let population_size = params.population_size.max(2);
    let elitism = params.elitism.min(population_size - 1);

    let mut population = Vec::with_capacity(population_size);
    population.push(evaluate(initial.to_vec()));
    while population.len() < population_size {
        let mut order = initial.to_vec();
        order.shuffle(&mut rng);
        population.push(evaluate(order));
    }

    let mut best = BestIndividuals::new(&population[0]);
    for individual in &population[1..] {
        best.offer(individual);
    }

    let mut generations = 0;
    let mut interrupted = false;

    while generations < params.generations {
        if termination.should_stop() {
            interrupted = true;
            break;
        }
        generations += 1;

        population.sort_by(|a, b| a.score.cmp(&b.score));

        let mut next = Vec::with_capacity(population_size);
        next.extend(population.iter().take(elitism).cloned());

        while next.len() < population_size {
            let (Some(first), Some(second)) = (
                select_tournament(&population, params.tournament_size, &mut rng),
                select_tournament(&population, params.tournament_size, &mut rng),
            ) else {
                break;
            };

            let mut child =
                random_order_crossover(&first.order, &second.order, num_stops, &mut rng);
            swap_mutation(&mut child, params.mutation_probability, &mut rng);

            let child = evaluate(child);
            best.offer(&child);
            next.push(child);
        }

        population = next;
    }

    debug!(
        "Genetic algorithm: {} generations, best score {:?}",
        generations, best.overall.score
    );

    let found_feasible = best.feasible.is_some();
    let winner = best.feasible.unwrap_or(best.overall);

    GeneticOutcome {
        order: winner.order,
        generations,
        interrupted,
        found_feasible,
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        problem::route_costs::RouteCosts,
        test_utils::{self, TestProblem},
    };

    use super::*;

    fn scattered_problem() -> crate::problem::route_problem::RouteProblem {
        test_utils::create_test_problem(TestProblem {
            points: &[
                (120.0, 40.0),
                (-30.0, 90.0),
                (60.0, -110.0),
                (-80.0, -20.0),
                (10.0, 150.0),
                (140.0, -60.0),
                (-120.0, 70.0),
                (90.0, 100.0),
            ],
            return_to_depot: true,
            ..TestProblem::default()
        })
    }

    #[test]
    fn test_same_seed_same_tour() {
        let problem = scattered_problem();
        let costs = RouteCosts::for_all_stops(&problem).unwrap();
        let evaluator = TourEvaluator::new(&problem, &costs);
        let initial = problem.stop_ids().collect::<Vec<_>>();
        let params = GeneticParams {
            generations: 30,
            ..GeneticParams::default()
        };

        let first = genetic_algorithm(&evaluator, &initial, &params, 42, &Termination::never());
        let second = genetic_algorithm(&evaluator, &initial, &params, 42, &Termination::never());

        assert_eq!(first, second);
    }

    #[test]
    fn test_never_worse_than_initial() {
        let problem = scattered_problem();
        let costs = RouteCosts::for_all_stops(&problem).unwrap();
        let evaluator = TourEvaluator::new(&problem, &costs);
        let initial = problem.stop_ids().collect::<Vec<_>>();

        let outcome = genetic_algorithm(
            &evaluator,
            &initial,
            &GeneticParams {
                generations: 50,
                ..GeneticParams::default()
            },
            7,
            &Termination::never(),
        );

        assert!(costs.tour_distance(&outcome.order) <= costs.tour_distance(&initial));
        assert!(outcome.found_feasible);

        let mut sorted = outcome.order.clone();
        sorted.sort();
        assert_eq!(sorted, initial);
    }

    #[test]
    fn test_single_stop() {
        let problem = test_utils::line_problem(&[100.0]);
        let costs = RouteCosts::for_all_stops(&problem).unwrap();
        let evaluator = TourEvaluator::new(&problem, &costs);

        let outcome = genetic_algorithm(
            &evaluator,
            &[StopIdx::new(0)],
            &GeneticParams::default(),
            1,
            &Termination::never(),
        );

        assert_eq!(outcome.order, vec![StopIdx::new(0)]);
        assert_eq!(outcome.generations, 0);
    }
}
