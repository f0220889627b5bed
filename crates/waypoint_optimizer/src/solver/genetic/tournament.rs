use rand::seq::IteratorRandom;

use super::genetic_algorithm::Individual;

/// Picks `size` distinct individuals at random and returns the best of them.
pub fn select_tournament<'a>(
    population: &'a [Individual],
    size: usize,
    rng: &mut impl rand::Rng,
) -> Option<&'a Individual> {
    if population.len() <= 1 {
        return population.first();
    }

    population
        .iter()
        .choose_multiple(rng, size.max(1))
        .into_iter()
        .min_by(|a, b| a.score.cmp(&b.score))
}
