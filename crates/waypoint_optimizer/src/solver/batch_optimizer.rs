use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use jiff::{SignedDuration, Timestamp};
use rayon::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{Level, error, info, instrument, warn};

use crate::{
    error::OptimizationError,
    problem::route_problem::RouteProblem,
    solver::{
        optimize::{Algorithm, OptimizationOptions, OptimizationRun, RunStatus, optimize},
        solver_params::Threads,
        termination::CancellationToken,
    },
};

#[derive(Clone, Debug, Default)]
pub struct BatchParams {
    pub threads: Threads,
    /// Budget of every route that does not carry its own, the algorithm default otherwise.
    pub route_time_budget: Option<SignedDuration>,
}

/// One route of a batch.
#[derive(Clone, Debug)]
pub struct RouteRequest {
    pub route_id: String,
    pub problem: Arc<RouteProblem>,
    pub current_order: Option<Vec<String>>,
    pub algorithm: Algorithm,
    pub options: OptimizationOptions,
}

impl RouteRequest {
    pub fn new(route_id: impl Into<String>, problem: Arc<RouteProblem>) -> Self {
        RouteRequest {
            route_id: route_id.into(),
            problem,
            current_order: None,
            algorithm: Algorithm::default(),
            options: OptimizationOptions::default(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct RouteOutcome {
    pub route_id: String,
    pub outcome: Result<OptimizationRun, OptimizationError>,
}

impl RouteOutcome {
    /// A route that failed before it could be handed to the batch.
    pub fn failed(route_id: impl Into<String>, error: OptimizationError) -> Self {
        RouteOutcome {
            route_id: route_id.into(),
            outcome: Err(error),
        }
    }

    pub fn status(&self) -> RunStatus {
        match &self.outcome {
            Ok(run) => run.status(),
            Err(_) => RunStatus::Failed,
        }
    }

    /// The route never started because the batch was cancelled first.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome, Err(OptimizationError::BatchCancelled))
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Completed,
    Cancelled,
}

#[derive(Serialize, Debug, Clone)]
pub struct BatchResult {
    pub status: BatchStatus,
    /// Same order as the requests.
    pub outcomes: Vec<RouteOutcome>,
    pub elapsed: SignedDuration,
}

impl BatchResult {
    /// Puts back routes that never reached [`BatchOptimizer::optimize_all`], each at its
    /// index in the input. `failures` must be sorted by index.
    pub fn insert_failures(&mut self, failures: Vec<(usize, RouteOutcome)>) {
        for (index, outcome) in failures {
            let index = index.min(self.outcomes.len());
            self.outcomes.insert(index, outcome);
        }
    }

    pub fn count(&self, status: RunStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status() == status)
            .count()
    }
}

type RouteFinishedCallback = Box<dyn Fn(&RouteOutcome) + Send + Sync>;

/// Runs [`optimize`] over many routes on a bounded thread pool.
///
/// Routes are independent: a failing, panicking or slow route only affects its own
/// outcome. Each route is single threaded, so runs stay reproducible per seed.
pub struct BatchOptimizer {
    params: BatchParams,
    thread_pool: rayon::ThreadPool,
    on_route_finished: Option<RouteFinishedCallback>,
}

impl BatchOptimizer {
    pub fn new(params: BatchParams) -> Result<Self, OptimizationError> {
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.threads.number_of_threads())
            .thread_name(|index| format!("waypoint-batch-{index}"))
            .build()
            .map_err(|error| OptimizationError::Internal(error.to_string()))?;

        Ok(BatchOptimizer {
            params,
            thread_pool,
            on_route_finished: None,
        })
    }

    /// Called from the worker threads each time a route is done.
    pub fn on_route_finished<F>(&mut self, callback: F)
    where
        F: Fn(&RouteOutcome) + Send + Sync + 'static,
    {
        self.on_route_finished = Some(Box::new(callback));
    }

    #[instrument(skip_all, level = Level::DEBUG)]
    pub fn optimize_all(
        &self,
        routes: Vec<RouteRequest>,
        cancellation: &CancellationToken,
    ) -> BatchResult {
        let started_at = Timestamp::now();
        let num_routes = routes.len();

        let outcomes = self.thread_pool.install(|| {
            routes
                .into_par_iter()
                .map(|route| {
                    let outcome = self.optimize_route(route, cancellation);
                    if let Some(callback) = &self.on_route_finished {
                        callback(&outcome);
                    }
                    outcome
                })
                .collect::<Vec<_>>()
        });

        let status = if cancellation.is_cancelled() {
            BatchStatus::Cancelled
        } else {
            BatchStatus::Completed
        };

        let result = BatchResult {
            status,
            outcomes,
            elapsed: Timestamp::now().duration_since(started_at),
        };

        info!(
            "Batch of {} routes {:?} in {:?}: {} completed, {} partial, {} timed out, {} failed",
            num_routes,
            result.status,
            result.elapsed,
            result.count(RunStatus::Completed),
            result.count(RunStatus::Partial),
            result.count(RunStatus::TimedOut),
            result.count(RunStatus::Failed),
        );

        result
    }

    fn optimize_route(
        &self,
        route: RouteRequest,
        cancellation: &CancellationToken,
    ) -> RouteOutcome {
        let RouteRequest {
            route_id,
            problem,
            current_order,
            algorithm,
            mut options,
        } = route;

        if cancellation.is_cancelled() {
            return RouteOutcome {
                route_id,
                outcome: Err(OptimizationError::BatchCancelled),
            };
        }

        options.time_budget = options
            .time_budget
            .or(self.params.route_time_budget)
            .or(Some(algorithm.default_time_budget()));
        options.cancellation = Some(cancellation.clone());

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            optimize(&problem, current_order.as_deref(), algorithm, &options)
        }))
        .unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            error!(route = %route_id, "Optimization panicked: {message}");
            Err(OptimizationError::Internal(message))
        });

        if let Err(error) = &outcome {
            warn!(route = %route_id, "Route failed: {error}");
        }

        RouteOutcome { route_id, outcome }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}
