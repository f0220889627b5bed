use std::fmt;

use fxhash::FxHashSet;
use jiff::{SignedDuration, Timestamp};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{Level, debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::OptimizationError,
    problem::{
        load::Load, route_costs::RouteCosts, route_problem::RouteProblem, stop::StopIdx,
    },
    solver::{
        annealing::simulated_annealing::simulated_annealing,
        constraints::tour_evaluator::TourEvaluator,
        construction::nearest_neighbor::{CapacityPolicy, nearest_neighbor},
        genetic::genetic_algorithm::genetic_algorithm,
        ls::two_opt::two_opt,
        solution::tour::Tour,
        solver_params::{AnnealingParams, GeneticParams, TwoOptParams},
        termination::{CancellationToken, StopReason, Termination},
    },
    timer_debug,
};

pub const DEFAULT_AUTO_APPLY_THRESHOLD: f64 = 5.0;
pub const DEFAULT_SEED: u64 = 42;

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    /// Nearest neighbor construction improved by 2-opt.
    #[default]
    #[serde(rename = "NEAREST_NEIGHBOR_2OPT")]
    NearestNeighborTwoOpt,
    Genetic,
    SimulatedAnnealing,
}

impl Algorithm {
    /// Budget of one route when the caller does not give one.
    pub fn default_time_budget(&self) -> SignedDuration {
        match self {
            Algorithm::NearestNeighborTwoOpt => SignedDuration::from_secs(2),
            Algorithm::Genetic | Algorithm::SimulatedAnnealing => SignedDuration::from_secs(10),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::NearestNeighborTwoOpt => "NEAREST_NEIGHBOR_2OPT",
            Algorithm::Genetic => "GENETIC",
            Algorithm::SimulatedAnnealing => "SIMULATED_ANNEALING",
        };
        f.write_str(name)
    }
}

/// What to do when the matrices have no data for a leg of the route.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnreachablePolicy {
    #[default]
    Fail,
    /// Leave the stop out of the tour and report it as a warning.
    ExcludeStop,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(default)]
pub struct OptimizationOptions {
    pub auto_apply: bool,
    /// Minimum improvement, in percent, for a run to be auto-applied.
    pub auto_apply_threshold: f64,
    pub seed: u64,
    /// Wall-clock budget of the improvement phase, unbounded when empty.
    pub time_budget: Option<SignedDuration>,
    pub unreachable_policy: UnreachablePolicy,
    pub capacity_policy: CapacityPolicy,
    pub two_opt: TwoOptParams,
    pub genetic: GeneticParams,
    pub annealing: AnnealingParams,

    #[serde(skip)]
    pub cancellation: Option<CancellationToken>,
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        OptimizationOptions {
            auto_apply: false,
            auto_apply_threshold: DEFAULT_AUTO_APPLY_THRESHOLD,
            seed: DEFAULT_SEED,
            time_budget: None,
            unreachable_policy: UnreachablePolicy::default(),
            capacity_policy: CapacityPolicy::default(),
            two_opt: TwoOptParams::default(),
            genetic: GeneticParams::default(),
            annealing: AnnealingParams::default(),
            cancellation: None,
        }
    }
}

impl OptimizationOptions {
    /// Starts the clock of the time budget.
    pub fn termination(&self) -> Termination {
        let mut termination = Termination::never();
        if let Some(budget) = self.time_budget {
            termination = termination.with_time_budget(budget);
        }
        if let Some(cancellation) = &self.cancellation {
            termination = termination.with_cancellation(cancellation.clone());
        }
        termination
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Created,
    Running,
    Completed,
    /// The search was interrupted and returned its best tour so far.
    Partial,
    Failed,
    /// The budget was spent before the improvement phase started.
    TimedOut,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Partial | RunStatus::Failed | RunStatus::TimedOut
        )
    }

    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        match self {
            RunStatus::Created => matches!(next, RunStatus::Running | RunStatus::Failed),
            RunStatus::Running => next.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplyDecision {
    /// The caller should persist the new order.
    AutoApply,
    ManualReview,
}

impl ApplyDecision {
    pub fn decide(auto_apply: bool, threshold: f64, improvement_percentage: f64) -> Self {
        if auto_apply && improvement_percentage >= threshold {
            ApplyDecision::AutoApply
        } else {
            ApplyDecision::ManualReview
        }
    }
}

/// Relative distance saved by `result` over `baseline`, in percent.
pub fn improvement_percentage(baseline_distance: f64, result_distance: f64) -> f64 {
    if baseline_distance <= 0.0 {
        return 0.0;
    }
    (baseline_distance - result_distance) * 100.0 / baseline_distance
}

/// Outcome of one optimization call. The orchestrator never persists anything, the
/// decision tells the caller what to do with `result`.
#[derive(Serialize, Debug, Clone)]
pub struct OptimizationRun {
    id: Uuid,
    vehicle_id: String,
    algorithm: Algorithm,
    seed: u64,
    time_budget: Option<SignedDuration>,
    status: RunStatus,
    decision: ApplyDecision,
    baseline: Tour,
    construction: Tour,
    result: Tour,
    improvement_percentage: f64,
    iterations: usize,
    warnings: Vec<OptimizationError>,
    excluded_stops: Vec<String>,
    started_at: Timestamp,
    elapsed: SignedDuration,
}

impl OptimizationRun {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn time_budget(&self) -> Option<SignedDuration> {
        self.time_budget
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn decision(&self) -> ApplyDecision {
        self.decision
    }

    /// The committed order, or the construction tour when nothing was committed.
    pub fn baseline(&self) -> &Tour {
        &self.baseline
    }

    pub fn construction(&self) -> &Tour {
        &self.construction
    }

    pub fn result(&self) -> &Tour {
        &self.result
    }

    pub fn improvement_percentage(&self) -> f64 {
        self.improvement_percentage
    }

    /// 2-opt passes, generations or annealing steps, depending on the algorithm.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn warnings(&self) -> &[OptimizationError] {
        &self.warnings
    }

    pub fn excluded_stops(&self) -> &[String] {
        &self.excluded_stops
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn elapsed(&self) -> SignedDuration {
        self.elapsed
    }
}

struct RunLifecycle {
    status: RunStatus,
}

impl RunLifecycle {
    fn new() -> Self {
        RunLifecycle {
            status: RunStatus::Created,
        }
    }

    fn transition(&mut self, next: RunStatus) -> Result<(), OptimizationError> {
        if !self.status.can_transition_to(next) {
            return Err(OptimizationError::Internal(format!(
                "run cannot go from {:?} to {:?}",
                self.status, next
            )));
        }
        debug!("Run status: {:?} -> {:?}", self.status, next);
        self.status = next;
        Ok(())
    }
}

struct SearchOutcome {
    order: Vec<StopIdx>,
    iterations: usize,
    interrupted: bool,
}

/// Optimizes the visiting order of `problem`'s stops.
///
/// `current_order` is the committed sequence, improvement is measured against it. When
/// it is `None`, the nearest neighbor tour is the baseline. The returned result is never
/// worse (by score) than the baseline or the construction tour.
#[instrument(skip_all, level = Level::DEBUG)]
pub fn optimize(
    problem: &RouteProblem,
    current_order: Option<&[String]>,
    algorithm: Algorithm,
    options: &OptimizationOptions,
) -> Result<OptimizationRun, OptimizationError> {
    let started_at = Timestamp::now();
    let termination = options.termination();

    let mut lifecycle = RunLifecycle::new();
    lifecycle.transition(RunStatus::Running)?;

    let mut warnings = Vec::new();
    let (mut costs, mut excluded) =
        reachable_costs(problem, options.unreachable_policy, &mut warnings)?;

    let capacity = problem.vehicle().capacity();
    let demand = total_demand(problem, costs.members());
    if options.capacity_policy == CapacityPolicy::Strict && !capacity.fits(&demand) {
        return Err(OptimizationError::CapacityExceeded {
            demand,
            capacity: *capacity,
        });
    }

    let construction = timer_debug!(
        "Nearest neighbor",
        nearest_neighbor(problem, &costs, options.capacity_policy)?
    );

    if !construction.overflow.is_empty() {
        for &stop_id in &construction.overflow {
            warn!(
                stop = problem.stop(stop_id).external_id(),
                "Stop does not fit in vehicle {}, excluded",
                problem.vehicle().external_id()
            );
        }
        warnings.push(OptimizationError::CapacityExceeded {
            demand,
            capacity: *capacity,
        });
        excluded.extend_from_slice(&construction.overflow);
        costs = RouteCosts::build(problem, &construction.order)
            .map_err(|missing| missing.into_error(problem))?;
    }

    let baseline_order = match current_order {
        Some(external_ids) => committed_order(problem, &costs, external_ids)?,
        None => construction.order.clone(),
    };

    let evaluator = TourEvaluator::new(problem, &costs);
    let construction_tour = evaluator.tour(construction.order.clone());
    let baseline_tour = evaluator.tour(baseline_order);

    let (result, status, iterations) = if costs.members().len() < 2 {
        warnings.push(OptimizationError::InsufficientStops);
        (baseline_tour.clone(), RunStatus::Completed, 0)
    } else if let Some(reason) = termination.stop_reason() {
        warn!("No time left to improve the route of {}", problem.vehicle().external_id());
        warnings.push(OptimizationError::AlgorithmTimeout);
        let status = match reason {
            StopReason::Deadline => RunStatus::TimedOut,
            StopReason::Cancelled => RunStatus::Partial,
        };
        let best = best_of(construction_tour.clone(), [baseline_tour.clone()]);
        (best, status, 0)
    } else {
        let search = timer_debug!(
            "Improvement",
            run_algorithm(&evaluator, construction.order, algorithm, options, &termination)
        );

        let status = if search.interrupted {
            warn!(
                "{algorithm} was interrupted on the route of {}, keeping its best tour",
                problem.vehicle().external_id()
            );
            warnings.push(OptimizationError::AlgorithmTimeout);
            RunStatus::Partial
        } else {
            RunStatus::Completed
        };

        let best = best_of(
            evaluator.tour(search.order),
            [construction_tour.clone(), baseline_tour.clone()],
        );
        (best, status, search.iterations)
    };

    let improvement = improvement_percentage(baseline_tour.distance(), result.distance());
    // Only a finished search may replace the committed order on its own.
    let decision = if status == RunStatus::Completed && result.is_feasible() {
        ApplyDecision::decide(options.auto_apply, options.auto_apply_threshold, improvement)
    } else {
        ApplyDecision::ManualReview
    };

    lifecycle.transition(status)?;

    info!(
        "{algorithm} on {}: {:.1} -> {:.1} ({:.2}%), {:?}, {:?}",
        problem.vehicle().external_id(),
        baseline_tour.distance(),
        result.distance(),
        improvement,
        status,
        decision
    );

    Ok(OptimizationRun {
        id: Uuid::new_v4(),
        vehicle_id: problem.vehicle().external_id().to_owned(),
        algorithm,
        seed: options.seed,
        time_budget: options.time_budget,
        status: lifecycle.status,
        decision,
        baseline: baseline_tour,
        construction: construction_tour,
        result,
        improvement_percentage: improvement,
        iterations,
        warnings,
        excluded_stops: excluded
            .iter()
            .map(|&stop_id| problem.stop(stop_id).external_id().to_owned())
            .collect(),
        started_at,
        elapsed: Timestamp::now().duration_since(started_at),
    })
}

fn run_algorithm(
    evaluator: &TourEvaluator,
    initial: Vec<StopIdx>,
    algorithm: Algorithm,
    options: &OptimizationOptions,
    termination: &Termination,
) -> SearchOutcome {
    match algorithm {
        Algorithm::NearestNeighborTwoOpt => {
            let outcome = two_opt(evaluator, initial, &options.two_opt, termination);
            SearchOutcome {
                order: outcome.order,
                iterations: outcome.passes,
                interrupted: outcome.interrupted,
            }
        }
        Algorithm::Genetic => {
            let outcome = genetic_algorithm(
                evaluator,
                &initial,
                &options.genetic,
                options.seed,
                termination,
            );
            SearchOutcome {
                order: outcome.order,
                iterations: outcome.generations,
                interrupted: outcome.interrupted,
            }
        }
        Algorithm::SimulatedAnnealing => {
            let outcome = simulated_annealing(
                evaluator,
                initial,
                &options.annealing,
                options.seed,
                termination,
            );
            SearchOutcome {
                order: outcome.order,
                iterations: outcome.iterations,
                interrupted: outcome.interrupted,
            }
        }
    }
}

/// Lowest score wins, earlier candidates win ties.
fn best_of(first: Tour, others: impl IntoIterator<Item = Tour>) -> Tour {
    let mut best = first;
    for candidate in others {
        if candidate.score() < best.score() {
            best = candidate;
        }
    }
    best
}

fn total_demand(problem: &RouteProblem, members: &[StopIdx]) -> Load {
    members
        .iter()
        .map(|&stop_id| problem.stop(stop_id).demand())
        .sum()
}

/// Builds the cost table, dropping stops the matrices cannot reach when the policy
/// allows it.
fn reachable_costs(
    problem: &RouteProblem,
    policy: UnreachablePolicy,
    warnings: &mut Vec<OptimizationError>,
) -> Result<(RouteCosts, Vec<StopIdx>), OptimizationError> {
    let mut members = problem.stop_ids().collect::<Vec<_>>();
    let mut excluded = Vec::new();

    loop {
        let missing = match RouteCosts::build(problem, &members) {
            Ok(costs) => return Ok((costs, excluded)),
            Err(missing) => missing,
        };

        let error = missing.into_error(problem);
        let offending = match policy {
            UnreachablePolicy::Fail => None,
            UnreachablePolicy::ExcludeStop => missing.offending_stop(),
        };
        let Some(stop_id) = offending else {
            return Err(error);
        };

        warn!(
            stop = problem.stop(stop_id).external_id(),
            "Excluding unreachable stop: {error}"
        );
        members.retain(|&member| member != stop_id);
        excluded.push(stop_id);
        warnings.push(error);
    }
}

/// The committed order restricted to the stops of this run. Every stop of the run has
/// to appear in it.
fn committed_order(
    problem: &RouteProblem,
    costs: &RouteCosts,
    external_ids: &[String],
) -> Result<Vec<StopIdx>, OptimizationError> {
    let order = problem
        .resolve_order(external_ids)?
        .into_iter()
        .filter(|&stop_id| costs.contains(stop_id))
        .collect::<Vec<_>>();

    let present = order.iter().copied().collect::<FxHashSet<_>>();
    if let Some(&missing) = costs
        .members()
        .iter()
        .find(|stop_id| !present.contains(stop_id))
    {
        return Err(OptimizationError::InvalidOrder(format!(
            "committed order does not contain stop {}",
            problem.stop(missing).external_id()
        )));
    }

    Ok(order)
}
