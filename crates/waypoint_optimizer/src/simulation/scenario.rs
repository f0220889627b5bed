use std::ops::Range;

use jiff::{SignedDuration, Timestamp};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{Level, debug, info, instrument};

use crate::{
    error::OptimizationError,
    eta::eta_calculator::{ArrivalStatus, EtaReport, estimate_eta},
    problem::{
        load::{Capacity, Load},
        route_costs::RouteCosts,
        route_problem::{RouteProblem, Waypoint},
        stop::{Priority, StopBuilder, StopIdx},
        time_window::TimeWindow,
        vehicle::VehicleBuilder,
    },
    solver::{
        constraints::tour_evaluator::TourEvaluator, ls::two_opt::two_opt, solution::tour::Tour,
        solver_params::TwoOptParams, termination::Termination,
    },
};

/// Positions re-optimized on each side of the modified ones.
pub const SCENARIO_WINDOW_MARGIN: usize = 2;

/// Stop added by a scenario. Its location must be one of the problem's locations, the
/// matrices only cover those.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NewStop {
    pub id: String,
    pub location_id: usize,
    #[serde(default)]
    pub demand: Load,
    #[serde(default)]
    pub service_duration: SignedDuration,
    #[serde(default)]
    pub time_window: Option<TimeWindow>,
    #[serde(default)]
    pub priority: Priority,
}

/// Fields left empty keep the current vehicle's value.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Default, PartialEq)]
pub struct VehicleChange {
    pub vehicle_id: Option<String>,
    pub capacity: Option<Capacity>,
    pub start_location_id: Option<usize>,
    pub depot_location_id: Option<usize>,
    pub should_return_to_depot: Option<bool>,
    pub fuel_consumption: Option<f64>,
    pub cost_per_km: Option<f64>,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modification {
    /// Inserted at `position`, or where it lengthens the tour the least.
    AddStop {
        stop: NewStop,
        #[serde(default)]
        position: Option<usize>,
    },
    RemoveStop {
        stop_id: String,
    },
    /// A new order for the same stops, kept as given.
    ReorderStops {
        order: Vec<String>,
    },
    ChangeVehicle(VehicleChange),
    ChangeStartTime {
        departure_time: Timestamp,
    },
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub modifications: Vec<Modification>,
}

/// Committed plan a scenario is derived from.
#[derive(Debug, Clone, Copy)]
pub struct BasePlan<'a> {
    pub problem: &'a RouteProblem,
    pub order: &'a [String],
    pub departure_time: Timestamp,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioViolation {
    CapacityExceeded { demand: Load, capacity: Capacity },
    LateArrival { stop_id: String, lateness: SignedDuration },
}

#[derive(Serialize, Debug, Clone)]
pub struct ScenarioOutcome {
    pub name: String,
    pub base: Tour,
    pub base_eta: EtaReport,
    pub tour: Tour,
    pub eta: EtaReport,
    pub distance_delta: f64,
    pub duration_delta: SignedDuration,
    /// Tour positions 2-opt was allowed to touch.
    pub reoptimized_window: Option<Range<usize>>,
    pub violations: Vec<ScenarioViolation>,
}

impl ScenarioOutcome {
    pub fn is_feasible(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Tour positions touched by the modifications so far.
#[derive(Debug, Default)]
struct AffectedWindow(Option<Range<usize>>);

impl AffectedWindow {
    fn include(&mut self, positions: Range<usize>) {
        self.0 = Some(match self.0.take() {
            Some(current) => current.start.min(positions.start)..current.end.max(positions.end),
            None => positions,
        });
    }

    fn inserted_at(&mut self, position: usize) {
        if let Some(current) = &mut self.0 {
            if current.start >= position {
                current.start += 1;
            }
            if current.end > position {
                current.end += 1;
            }
        }
        self.include(position..position + 1);
    }

    fn removed_at(&mut self, position: usize, len: usize) {
        if let Some(current) = &mut self.0 {
            if current.start > position {
                current.start -= 1;
            }
            if current.end > position {
                current.end -= 1;
            }
        }
        self.include(position.saturating_sub(1)..(position + 1).min(len));
    }

    fn with_margin(&self, len: usize) -> Option<Range<usize>> {
        self.0.as_ref().map(|window| {
            window.start.saturating_sub(SCENARIO_WINDOW_MARGIN)
                ..(window.end + SCENARIO_WINDOW_MARGIN).min(len)
        })
    }
}

/// Working copy of the plan the modifications are applied to.
struct DraftPlan {
    problem: RouteProblem,
    order: Vec<StopIdx>,
    departure_time: Timestamp,
    affected: AffectedWindow,
}

impl DraftPlan {
    fn apply(&mut self, modification: &Modification) -> Result<(), OptimizationError> {
        match modification {
            Modification::AddStop { stop, position } => self.add_stop(stop, *position),
            Modification::RemoveStop { stop_id } => self.remove_stop(stop_id),
            Modification::ReorderStops { order } => self.reorder(order),
            Modification::ChangeVehicle(change) => self.change_vehicle(change),
            Modification::ChangeStartTime { departure_time } => {
                self.departure_time = *departure_time;
                Ok(())
            }
        }
    }

    fn add_stop(
        &mut self,
        new_stop: &NewStop,
        position: Option<usize>,
    ) -> Result<(), OptimizationError> {
        let mut builder = StopBuilder::default();
        builder
            .set_external_id(new_stop.id.clone())
            .set_location_id(new_stop.location_id)
            .set_demand(new_stop.demand)
            .set_service_duration(new_stop.service_duration)
            .set_priority(new_stop.priority);
        if let Some(time_window) = new_stop.time_window {
            builder.set_time_window(time_window);
        }

        let (problem, stop_id) = self.problem.with_added_stop(builder.build())?;
        self.problem = problem;

        let position = match position {
            Some(position) if position > self.order.len() => {
                return Err(OptimizationError::InvalidOrder(format!(
                    "cannot insert {} at position {position} of a {} stops tour",
                    new_stop.id,
                    self.order.len()
                )));
            }
            Some(position) => position,
            None => self.cheapest_insertion(stop_id)?,
        };

        debug!(stop = new_stop.id.as_str(), "Inserting stop at position {position}");
        self.order.insert(position, stop_id);
        self.affected.inserted_at(position);
        Ok(())
    }

    fn cheapest_insertion(&self, stop_id: StopIdx) -> Result<usize, OptimizationError> {
        let inserted = Waypoint::Stop(stop_id);
        let mut best: Option<(usize, f64)> = None;

        for position in 0..=self.order.len() {
            let previous = RouteCosts::previous(&self.order, position);
            let next = if position < self.order.len() {
                Some(Waypoint::Stop(self.order[position]))
            } else {
                self.problem.has_end().then_some(Waypoint::End)
            };

            let mut delta = self.problem.travel_distance(previous, inserted)?;
            if let Some(next) = next {
                delta += self.problem.travel_distance(inserted, next)?
                    - self.problem.travel_distance(previous, next)?;
            }

            if best.is_none_or(|(_, best_delta)| delta < best_delta) {
                best = Some((position, delta));
            }
        }

        Ok(best.map_or(0, |(position, _)| position))
    }

    fn remove_stop(&mut self, external_id: &str) -> Result<(), OptimizationError> {
        let removed = self
            .problem
            .find_stop(external_id)
            .ok_or_else(|| OptimizationError::UnknownStop(external_id.to_owned()))?;
        let position = self
            .order
            .iter()
            .position(|&stop_id| stop_id == removed)
            .ok_or_else(|| {
                OptimizationError::InvalidOrder(format!("stop {external_id} is not in the plan"))
            })?;

        self.order.remove(position);
        for stop_id in &mut self.order {
            if stop_id.get() > removed.get() {
                *stop_id = StopIdx::new(stop_id.get() - 1);
            }
        }
        self.problem = self.problem.without_stop(removed);
        self.affected.removed_at(position, self.order.len());
        Ok(())
    }

    fn reorder(&mut self, external_ids: &[String]) -> Result<(), OptimizationError> {
        let order = self.problem.resolve_order(external_ids)?;

        let mut current = self.order.clone();
        let mut requested = order.clone();
        current.sort_unstable();
        requested.sort_unstable();
        if current != requested {
            return Err(OptimizationError::InvalidOrder(
                "a reorder must list exactly the stops of the plan".to_owned(),
            ));
        }

        self.order = order;
        // an explicit order is not re-optimized
        self.affected = AffectedWindow::default();
        Ok(())
    }

    fn change_vehicle(&mut self, change: &VehicleChange) -> Result<(), OptimizationError> {
        let current = self.problem.vehicle();

        let mut builder = VehicleBuilder::default();
        builder
            .set_vehicle_id(
                change
                    .vehicle_id
                    .clone()
                    .unwrap_or_else(|| current.external_id().to_owned()),
            )
            .set_capacity(change.capacity.unwrap_or(*current.capacity()))
            .set_start_location_id(
                change
                    .start_location_id
                    .unwrap_or(current.start_location_id().get()),
            )
            .set_return(
                change
                    .should_return_to_depot
                    .unwrap_or(current.should_return_to_depot()),
            );

        if let Some(depot_location_id) = change
            .depot_location_id
            .or(current.depot_location_id().map(|location_id| location_id.get()))
        {
            builder.set_depot_location_id(depot_location_id);
        }
        if let Some(consumption) = change
            .fuel_consumption
            .or(current.fuel_consumption_l_per_100km())
        {
            builder.set_fuel_consumption(consumption);
        }
        if let Some(cost_per_km) = change.cost_per_km.or(current.cost_per_km()) {
            builder.set_cost_per_km(cost_per_km);
        }

        let vehicle = builder.build()?;
        let start_changed = vehicle.start_location_id() != current.start_location_id();
        let end_changed = vehicle.end_location_id() != current.end_location_id();

        self.problem = self.problem.with_vehicle(vehicle)?;

        let len = self.order.len();
        if start_changed && len > 0 {
            self.affected.include(0..1);
        }
        if end_changed && len > 0 {
            self.affected.include(len - 1..len);
        }
        Ok(())
    }
}

fn violations(problem: &RouteProblem, tour: &Tour, eta: &EtaReport) -> Vec<ScenarioViolation> {
    let capacity = problem.vehicle().capacity();
    let demand = tour.metrics().total_load;

    let overflow = (!capacity.fits(&demand)).then_some(ScenarioViolation::CapacityExceeded {
        demand,
        capacity: *capacity,
    });

    let late = eta
        .stops
        .iter()
        .filter(|stop| stop.status == ArrivalStatus::Late)
        .map(|stop| ScenarioViolation::LateArrival {
            stop_id: stop.external_id.clone(),
            lateness: stop.lateness,
        });

    overflow.into_iter().chain(late).collect()
}

fn evaluate(
    problem: &RouteProblem,
    order: Vec<StopIdx>,
    departure_time: Timestamp,
) -> Result<(Tour, EtaReport), OptimizationError> {
    let costs =
        RouteCosts::build(problem, &order).map_err(|missing| missing.into_error(problem))?;
    let tour = TourEvaluator::new(problem, &costs).tour(order);
    let eta = estimate_eta(problem, tour.stops(), departure_time)?;
    Ok((tour, eta))
}

/// Applies `scenario` to a copy of `base` and evaluates the derived tour.
///
/// Only the tour positions around the added, removed or re-anchored stops go through
/// 2-opt again, the rest of the committed order is kept. The derived tour is then fully
/// re-checked for capacity and lateness. `base` is never modified.
#[instrument(skip_all, level = Level::DEBUG)]
pub fn create_scenario(
    base: BasePlan<'_>,
    scenario: &Scenario,
    two_opt_params: &TwoOptParams,
) -> Result<ScenarioOutcome, OptimizationError> {
    let base_problem = base.problem.with_departure_time(base.departure_time);
    let base_order = base_problem.resolve_order(base.order)?;
    let (base_tour, base_eta) = evaluate(&base_problem, base_order.clone(), base.departure_time)?;

    let mut draft = DraftPlan {
        problem: base_problem.clone(),
        order: base_order,
        departure_time: base.departure_time,
        affected: AffectedWindow::default(),
    };
    for modification in &scenario.modifications {
        draft.apply(modification)?;
    }

    let problem = draft.problem.with_departure_time(draft.departure_time);
    let reoptimized_window = draft
        .affected
        .with_margin(draft.order.len())
        .filter(|window| window.len() >= 2);

    let order = match &reoptimized_window {
        Some(window) => {
            let costs = RouteCosts::build(&problem, &draft.order)
                .map_err(|missing| missing.into_error(&problem))?;
            let evaluator = TourEvaluator::new(&problem, &costs);
            let params = TwoOptParams {
                window: Some(window.clone()),
                ..two_opt_params.clone()
            };
            two_opt(&evaluator, draft.order, &params, &Termination::never()).order
        }
        None => draft.order,
    };

    let (tour, eta) = evaluate(&problem, order, draft.departure_time)?;
    let violations = violations(&problem, &tour, &eta);

    let outcome = ScenarioOutcome {
        name: scenario.name.clone(),
        distance_delta: tour.distance() - base_tour.distance(),
        duration_delta: eta.total_duration() - base_eta.total_duration(),
        base: base_tour,
        base_eta,
        tour,
        eta,
        reoptimized_window,
        violations,
    };

    info!(
        "Scenario {}: {} modifications, {:+.1} m, {:?}, {} violations",
        outcome.name,
        scenario.modifications.len(),
        outcome.distance_delta,
        outcome.duration_delta,
        outcome.violations.len()
    );

    Ok(outcome)
}
