use fixedbitset::FixedBitSet;
use rand::Rng;

use crate::problem::stop::StopIdx;

/// **Order Crossover (OX)**
///
/// Copies `first[start..=end]` into the child at the same positions, then fills the
/// remaining positions, starting right after `end` and wrapping around, with the genes
/// of `second` in the order they appear after `end`, skipping those already copied.
///
/// ```text
/// first:  [1 2 | 3 4 5 | 6 7]
/// second: [5 7 | 1 2 6 | 3 4]
/// child:  [2 6 | 3 4 5 | 7 1]
/// ```
pub fn order_crossover(
    first: &[StopIdx],
    second: &[StopIdx],
    (start, end): (usize, usize),
    num_stops: usize,
) -> Vec<StopIdx> {
    let len = first.len();
    debug_assert_eq!(len, second.len());
    debug_assert!(start <= end && end < len);

    let mut child = vec![StopIdx::default(); len];
    let mut copied = FixedBitSet::with_capacity(num_stops);

    for position in start..=end {
        child[position] = first[position];
        copied.insert(first[position].get());
    }

    let mut write = (end + 1) % len;
    for offset in 1..=len {
        let gene = second[(end + offset) % len];
        if copied.contains(gene.get()) {
            continue;
        }
        child[write] = gene;
        copied.insert(gene.get());
        write = (write + 1) % len;
    }

    child
}

pub fn random_order_crossover(
    first: &[StopIdx],
    second: &[StopIdx],
    num_stops: usize,
    rng: &mut impl Rng,
) -> Vec<StopIdx> {
    let len = first.len();
    let a = rng.random_range(0..len);
    let b = rng.random_range(0..len);

    order_crossover(first, second, (a.min(b), a.max(b)), num_stops)
}

/// Swaps every gene with a random other gene with probability `probability`.
pub fn swap_mutation(order: &mut [StopIdx], probability: f64, rng: &mut impl Rng) {
    let len = order.len();
    if len < 2 {
        return;
    }

    let probability = probability.clamp(0.0, 1.0);
    for position in 0..len {
        if rng.random_bool(probability) {
            let other = rng.random_range(0..len);
            order.swap(position, other);
        }
    }
}
