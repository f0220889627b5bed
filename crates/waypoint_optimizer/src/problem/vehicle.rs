use serde::Serialize;

use crate::error::OptimizationError;

use super::{load::Capacity, location::LocationIdx};

#[derive(Serialize, Debug, Clone)]
pub struct Vehicle {
    external_id: String,
    capacity: Capacity,
    start_location_id: LocationIdx,
    depot_location_id: Option<LocationIdx>,
    should_return_to_depot: bool,
    fuel_consumption_l_per_100km: Option<f64>,
    cost_per_km: Option<f64>,
}

impl Vehicle {
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn capacity(&self) -> &Capacity {
        &self.capacity
    }

    /// Where the tour begins, the depot or the last GPS fix of the vehicle.
    pub fn start_location_id(&self) -> LocationIdx {
        self.start_location_id
    }

    pub fn depot_location_id(&self) -> Option<LocationIdx> {
        self.depot_location_id
    }

    pub fn should_return_to_depot(&self) -> bool {
        self.should_return_to_depot
    }

    /// Closing location of the tour, the depot (or the start when there is no depot).
    pub fn end_location_id(&self) -> Option<LocationIdx> {
        if self.should_return_to_depot {
            Some(self.depot_location_id.unwrap_or(self.start_location_id))
        } else {
            None
        }
    }

    pub fn fuel_consumption_l_per_100km(&self) -> Option<f64> {
        self.fuel_consumption_l_per_100km
    }

    pub fn cost_per_km(&self) -> Option<f64> {
        self.cost_per_km
    }
}

#[derive(Default)]
pub struct VehicleBuilder {
    external_id: Option<String>,
    capacity: Option<Capacity>,
    start_location_id: Option<usize>,
    depot_location_id: Option<usize>,
    should_return_to_depot: Option<bool>,
    fuel_consumption_l_per_100km: Option<f64>,
    cost_per_km: Option<f64>,
}

impl VehicleBuilder {
    pub fn set_vehicle_id(&mut self, external_id: impl Into<String>) -> &mut VehicleBuilder {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn set_capacity(&mut self, capacity: Capacity) -> &mut VehicleBuilder {
        self.capacity = Some(capacity);
        self
    }

    pub fn set_start_location_id(&mut self, start_location_id: usize) -> &mut VehicleBuilder {
        self.start_location_id = Some(start_location_id);
        self
    }

    pub fn set_depot_location_id(&mut self, depot_location_id: usize) -> &mut VehicleBuilder {
        self.depot_location_id = Some(depot_location_id);
        self
    }

    pub fn set_return(&mut self, should_return_to_depot: bool) -> &mut VehicleBuilder {
        self.should_return_to_depot = Some(should_return_to_depot);
        self
    }

    pub fn set_fuel_consumption(&mut self, liters_per_100km: f64) -> &mut VehicleBuilder {
        self.fuel_consumption_l_per_100km = Some(liters_per_100km);
        self
    }

    pub fn set_cost_per_km(&mut self, cost_per_km: f64) -> &mut VehicleBuilder {
        self.cost_per_km = Some(cost_per_km);
        self
    }

    pub fn build(self) -> Result<Vehicle, OptimizationError> {
        let external_id = self
            .external_id
            .ok_or_else(|| OptimizationError::InvalidProblem("vehicle id is required".into()))?;

        let capacity = self.capacity.ok_or_else(|| {
            OptimizationError::InvalidProblem(format!("vehicle {external_id} has no capacity"))
        })?;

        if !capacity.is_valid() {
            return Err(OptimizationError::InvalidProblem(format!(
                "vehicle {external_id} capacity must be positive"
            )));
        }

        let start_location_id = self
            .start_location_id
            .or(self.depot_location_id)
            .ok_or_else(|| {
                OptimizationError::InvalidProblem(format!(
                    "vehicle {external_id} has neither a start nor a depot location"
                ))
            })?;

        Ok(Vehicle {
            external_id,
            capacity,
            start_location_id: start_location_id.into(),
            depot_location_id: self.depot_location_id.map(LocationIdx::from),
            should_return_to_depot: self.should_return_to_depot.unwrap_or(false),
            fuel_consumption_l_per_100km: self.fuel_consumption_l_per_100km,
            cost_per_km: self.cost_per_km,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_defaults_to_depot() {
        let mut builder = VehicleBuilder::default();
        builder
            .set_vehicle_id("van-1")
            .set_capacity(Capacity::new(100.0, 2.0))
            .set_depot_location_id(3)
            .set_return(true);
        let vehicle = builder.build().unwrap();

        assert_eq!(vehicle.start_location_id(), LocationIdx::new(3));
        assert_eq!(vehicle.end_location_id(), Some(LocationIdx::new(3)));
    }

    #[test]
    fn test_open_tour_has_no_end() {
        let mut builder = VehicleBuilder::default();
        builder
            .set_vehicle_id("van-1")
            .set_capacity(Capacity::new(100.0, 2.0))
            .set_start_location_id(0);
        let vehicle = builder.build().unwrap();

        assert_eq!(vehicle.end_location_id(), None);
    }

    #[test]
    fn test_capacity_required() {
        let mut builder = VehicleBuilder::default();
        builder.set_vehicle_id("van-1").set_start_location_id(0);

        assert!(matches!(
            builder.build(),
            Err(OptimizationError::InvalidProblem(_))
        ));
    }
}
