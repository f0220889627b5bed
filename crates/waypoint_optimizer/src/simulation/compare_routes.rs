use jiff::SignedDuration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::simulate_route::SimulationResult;

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ComparisonWeights {
    pub distance: f64,
    pub duration: f64,
    pub utilization: f64,
}

impl Default for ComparisonWeights {
    fn default() -> Self {
        ComparisonWeights {
            distance: 0.4,
            duration: 0.4,
            utilization: 0.2,
        }
    }
}

/// What a candidate is ranked on.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct RouteCandidate {
    pub name: String,
    pub distance_km: f64,
    pub duration: SignedDuration,
    /// Percent of the vehicle capacity in use, higher is better.
    pub utilization: f64,
}

impl From<&SimulationResult> for RouteCandidate {
    fn from(simulation: &SimulationResult) -> Self {
        RouteCandidate {
            name: simulation.name.clone(),
            distance_km: simulation.metrics.distance_km,
            duration: simulation.metrics.total_duration,
            utilization: simulation.metrics.capacity_utilization,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RankDeltas {
    pub distance_km: f64,
    pub duration: SignedDuration,
    pub utilization: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RankedRoute {
    /// 1 for the best candidate.
    pub rank: usize,
    /// Weighted normalized cost, lower is better.
    pub score: f64,
    pub candidate: RouteCandidate,
    /// Difference with the best candidate, zero for the best itself.
    pub deltas: RankDeltas,
}

struct Range {
    min: f64,
    max: f64,
}

impl Range {
    fn of(values: impl Iterator<Item = f64>) -> Self {
        values.fold(
            Range {
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            },
            |range, value| Range {
                min: range.min.min(value),
                max: range.max.max(value),
            },
        )
    }

    /// `0.0` at the minimum, `1.0` at the maximum, `0.0` when every value is the same.
    fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span > 0.0 {
            (value - self.min) / span
        } else {
            0.0
        }
    }

    /// Same as [`Range::normalize`] for values where higher is better.
    fn normalize_descending(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span > 0.0 {
            (self.max - value) / span
        } else {
            0.0
        }
    }
}

/// Ranks candidates best to worst on a min-max normalized weighted cost.
///
/// Candidates with the same score keep their input order.
pub fn compare_routes(
    candidates: &[RouteCandidate],
    weights: &ComparisonWeights,
) -> Vec<RankedRoute> {
    let distances = Range::of(candidates.iter().map(|candidate| candidate.distance_km));
    let durations = Range::of(
        candidates
            .iter()
            .map(|candidate| candidate.duration.as_secs_f64()),
    );
    let utilizations = Range::of(candidates.iter().map(|candidate| candidate.utilization));

    let mut scored = candidates
        .iter()
        .map(|candidate| {
            let distance = distances.normalize(candidate.distance_km);
            let duration = durations.normalize(candidate.duration.as_secs_f64());
            let utilization = utilizations.normalize_descending(candidate.utilization);

            let score = weights.distance * distance
                + weights.duration * duration
                + weights.utilization * utilization;
            (score, candidate)
        })
        .collect::<Vec<_>>();

    scored.sort_by(|(a, _), (b, _)| a.total_cmp(b));

    let Some(&(_, best)) = scored.first() else {
        return Vec::new();
    };
    let best = best.clone();

    scored
        .into_iter()
        .enumerate()
        .map(|(index, (score, candidate))| RankedRoute {
            rank: index + 1,
            score,
            deltas: RankDeltas {
                distance_km: candidate.distance_km - best.distance_km,
                duration: candidate.duration - best.duration,
                utilization: candidate.utilization - best.utilization,
            },
            candidate: candidate.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, distance_km: f64, minutes: i64, utilization: f64) -> RouteCandidate {
        RouteCandidate {
            name: name.to_owned(),
            distance_km,
            duration: SignedDuration::from_mins(minutes),
            utilization,
        }
    }

    #[test]
    fn test_ranking_and_deltas() {
        let candidates = [
            candidate("long", 30.0, 90, 50.0),
            candidate("short", 10.0, 30, 50.0),
            candidate("middle", 20.0, 60, 50.0),
        ];

        let ranked = compare_routes(&candidates, &ComparisonWeights::default());

        let names = ranked
            .iter()
            .map(|ranked| ranked.candidate.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["short", "middle", "long"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[0].score, 0.0);
        assert_eq!(ranked[2].score, 0.8);
        assert_eq!(ranked[2].deltas.distance_km, 20.0);
        assert_eq!(ranked[2].deltas.duration, SignedDuration::from_mins(60));
        assert_eq!(ranked[0].deltas.distance_km, 0.0);
    }

    #[test]
    fn test_higher_utilization_wins_a_tie() {
        let candidates = [
            candidate("half empty", 10.0, 30, 40.0),
            candidate("full", 10.0, 30, 90.0),
        ];

        let ranked = compare_routes(&candidates, &ComparisonWeights::default());

        assert_eq!(ranked[0].candidate.name, "full");
        assert_eq!(ranked[1].score, 0.2);
        assert_eq!(ranked[1].deltas.utilization, -50.0);
    }

    #[test]
    fn test_identical_candidates_keep_input_order() {
        let candidates = [
            candidate("a", 10.0, 30, 40.0),
            candidate("b", 10.0, 30, 40.0),
        ];

        let ranked = compare_routes(&candidates, &ComparisonWeights::default());

        assert_eq!(ranked[0].candidate.name, "a");
        assert!(ranked.iter().all(|ranked| ranked.score == 0.0));
    }

    #[test]
    fn test_empty() {
        assert!(compare_routes(&[], &ComparisonWeights::default()).is_empty());
    }
}
