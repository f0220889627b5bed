use jiff::{SignedDuration, Timestamp};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{Level, info, instrument};

use crate::{
    error::OptimizationError,
    eta::eta_calculator::{EtaReport, estimate_eta},
    problem::{route_costs::RouteCosts, route_problem::RouteProblem},
    solver::{
        constraints::tour_evaluator::TourEvaluator,
        optimize::{Algorithm, OptimizationOptions, optimize},
        solution::tour::Tour,
    },
};

pub const DEFAULT_FUEL_PRICE_PER_LITER: f64 = 7.5;
pub const DEFAULT_FUEL_CONSUMPTION_L_PER_100KM: f64 = 12.0;
/// Diesel combustion emissions.
pub const CO2_KG_PER_LITER: f64 = 2.68;

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(default)]
pub struct SimulationOptions {
    pub algorithm: Algorithm,
    /// Keeps the stops in their given order when `false`.
    pub optimize: bool,
    pub optimization: OptimizationOptions,
    pub fuel_price_per_liter: f64,
    /// Used when the vehicle has no consumption of its own.
    pub default_fuel_consumption: f64,
    pub co2_kg_per_liter: f64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        SimulationOptions {
            algorithm: Algorithm::default(),
            optimize: true,
            optimization: OptimizationOptions::default(),
            fuel_price_per_liter: DEFAULT_FUEL_PRICE_PER_LITER,
            default_fuel_consumption: DEFAULT_FUEL_CONSUMPTION_L_PER_100KM,
            co2_kg_per_liter: CO2_KG_PER_LITER,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SimulationMetrics {
    pub distance_km: f64,
    /// Traffic-adjusted driving time.
    pub driving_duration: SignedDuration,
    pub total_duration: SignedDuration,
    pub traffic_delay: SignedDuration,
    pub fuel_liters: f64,
    pub fuel_cost: f64,
    pub distance_cost: f64,
    pub total_cost: f64,
    pub co2_kg: f64,
    pub capacity_utilization: f64,
    pub on_time_percentage: f64,
    pub late_stops: usize,
}

impl SimulationMetrics {
    fn compute(
        problem: &RouteProblem,
        tour: &Tour,
        eta: &EtaReport,
        options: &SimulationOptions,
    ) -> Self {
        let vehicle = problem.vehicle();
        let distance_km = eta.total_distance / 1000.0;
        let consumption = vehicle
            .fuel_consumption_l_per_100km()
            .unwrap_or(options.default_fuel_consumption);

        let fuel_liters = distance_km * consumption / 100.0;
        let fuel_cost = fuel_liters * options.fuel_price_per_liter;
        let distance_cost = distance_km * vehicle.cost_per_km().unwrap_or(0.0);

        SimulationMetrics {
            distance_km,
            driving_duration: eta.traffic_driving_duration,
            total_duration: eta.total_duration(),
            traffic_delay: eta.total_traffic_delay,
            fuel_liters,
            fuel_cost,
            distance_cost,
            total_cost: fuel_cost + distance_cost,
            co2_kg: fuel_liters * options.co2_kg_per_liter,
            capacity_utilization: tour.metrics().capacity_utilization,
            on_time_percentage: eta.on_time_percentage(),
            late_stops: eta.late_stops,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct SimulationResult {
    pub name: String,
    pub tour: Tour,
    pub eta: EtaReport,
    pub metrics: SimulationMetrics,
    pub warnings: Vec<OptimizationError>,
    pub excluded_stops: Vec<String>,
}

/// Builds a hypothetical tour of `problem` leaving at `start_time` and prices it.
///
/// Nothing about the route has to exist beforehand: the order comes from the optimizer
/// unless `options.optimize` is off, in which case the stops are driven as listed.
#[instrument(skip_all, level = Level::DEBUG)]
pub fn simulate_route(
    name: impl Into<String>,
    problem: &RouteProblem,
    start_time: Timestamp,
    options: &SimulationOptions,
) -> Result<SimulationResult, OptimizationError> {
    let name = name.into();
    let problem = problem.with_departure_time(start_time);

    let (tour, warnings, excluded_stops) = if options.optimize {
        let run = optimize(&problem, None, options.algorithm, &options.optimization)?;
        (
            run.result().clone(),
            run.warnings().to_vec(),
            run.excluded_stops().to_vec(),
        )
    } else {
        let costs = RouteCosts::for_all_stops(&problem)?;
        let evaluator = TourEvaluator::new(&problem, &costs);
        (
            evaluator.tour(problem.stop_ids().collect()),
            Vec::new(),
            Vec::new(),
        )
    };

    let eta = estimate_eta(&problem, tour.stops(), start_time)?;
    let metrics = SimulationMetrics::compute(&problem, &tour, &eta, options);

    info!(
        "Simulation {name}: {} stops, {:.2} km, {:?}, cost {:.2}",
        tour.len(),
        metrics.distance_km,
        metrics.total_duration,
        metrics.total_cost
    );

    Ok(SimulationResult {
        name,
        tour,
        eta,
        metrics,
        warnings,
        excluded_stops,
    })
}

#[cfg(test)]
mod tests {
    use waypoint_matrix_providers::traffic_profile::TrafficProfile;

    use crate::test_utils::{self, TestProblem, ts};

    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn test_costs_of_optimized_route() {
        let problem = test_utils::create_test_problem(TestProblem {
            points: &[(2000.0, 0.0), (1000.0, 0.0)],
            traffic: TrafficProfile::free_flow(),
            ..TestProblem::default()
        });

        let result = simulate_route(
            "morning",
            &problem,
            ts("2025-06-10T10:00:00Z"),
            &SimulationOptions::default(),
        )
        .unwrap();

        assert_eq!(result.name, "morning");
        assert_eq!(result.tour.stop_ids(), ["s1", "s0"]);
        assert_close(result.metrics.distance_km, 2.0);
        // test vehicles burn 10 l/100km
        assert_close(result.metrics.fuel_liters, 0.2);
        assert_close(result.metrics.fuel_cost, 1.5);
        assert_close(result.metrics.co2_kg, 0.536);
        assert_close(result.metrics.total_cost, 1.5);
        assert_eq!(result.metrics.total_duration, SignedDuration::from_secs(200));
        assert_eq!(result.metrics.on_time_percentage, 100.0);
        assert_eq!(result.eta.completion_time, ts("2025-06-10T10:03:20Z"));
    }

    #[test]
    fn test_given_order_is_kept_without_optimization() {
        let problem = test_utils::line_problem(&[2000.0, 1000.0]);

        let result = simulate_route(
            "as planned",
            &problem,
            ts("2025-06-10T10:00:00Z"),
            &SimulationOptions {
                optimize: false,
                ..SimulationOptions::default()
            },
        )
        .unwrap();

        assert_eq!(result.tour.stop_ids(), ["s0", "s1"]);
        assert_close(result.metrics.distance_km, 3.0);
    }

    #[test]
    fn test_peak_start_costs_time_not_distance() {
        let problem = test_utils::line_problem(&[1000.0, 2000.0]);
        let options = SimulationOptions::default();

        let night =
            simulate_route("night", &problem, ts("2025-06-10T03:00:00Z"), &options).unwrap();
        let peak =
            simulate_route("peak", &problem, ts("2025-06-10T08:00:00Z"), &options).unwrap();

        assert_close(night.metrics.distance_km, peak.metrics.distance_km);
        assert!(peak.metrics.total_duration > night.metrics.total_duration);
        assert!(night.metrics.traffic_delay.is_zero());
    }
}
