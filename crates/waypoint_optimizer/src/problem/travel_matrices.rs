use std::sync::Arc;

use waypoint_matrix_providers::{
    as_the_crow_flies::{as_the_crow_flies_matrices, euclidean_matrices},
    travel_matrices::MatrixShapeError,
};

use super::location::{Location, LocationIdx};

pub type Distance = f64;
pub type Time = f64;

/// Flat row-major matrices, entry `from * num_locations + to`.
///
/// `None` entries are pairs the provider has no data for. They are never read as zero.
#[derive(Debug, Clone)]
pub struct TravelMatrices {
    distances: Arc<Vec<Option<Distance>>>,
    times: Arc<Vec<Option<Time>>>,
    num_locations: usize,
    is_symmetric: bool,
}

fn is_flat_matrix_symmetric(matrix: &[Option<f64>], num_locations: usize) -> bool {
    for i in 0..num_locations {
        for j in (i + 1)..num_locations {
            if matrix[i * num_locations + j] != matrix[j * num_locations + i] {
                return false;
            }
        }
    }
    true
}

impl TravelMatrices {
    pub fn from_provider(
        matrices: waypoint_matrix_providers::travel_matrices::TravelMatrices,
    ) -> Result<Self, MatrixShapeError> {
        let num_locations = matrices.validate()?;
        let is_symmetric = is_flat_matrix_symmetric(&matrices.distances, num_locations)
            && is_flat_matrix_symmetric(&matrices.times, num_locations);

        Ok(TravelMatrices {
            distances: Arc::new(matrices.distances),
            times: Arc::new(matrices.times),
            num_locations,
            is_symmetric,
        })
    }

    pub fn from_rows(
        distances: Vec<Vec<Option<Distance>>>,
        times: Vec<Vec<Option<Time>>>,
    ) -> Result<Self, MatrixShapeError> {
        Self::from_provider(
            waypoint_matrix_providers::travel_matrices::TravelMatrices::from_rows(
                distances, times,
            ),
        )
    }

    /// Cartesian coordinates read as meters.
    pub fn from_euclidean(locations: &[Location], speed_meters_per_second: f64) -> Self {
        let matrices = euclidean_matrices(locations, speed_meters_per_second);
        TravelMatrices {
            num_locations: locations.len(),
            is_symmetric: true,
            distances: Arc::new(matrices.distances),
            times: Arc::new(matrices.times),
        }
    }

    pub fn from_haversine(locations: &[Location], speed_kmh: f64) -> Self {
        let matrices = as_the_crow_flies_matrices(locations, speed_kmh);
        TravelMatrices {
            num_locations: locations.len(),
            is_symmetric: true,
            distances: Arc::new(matrices.distances),
            times: Arc::new(matrices.times),
        }
    }

    pub fn num_locations(&self) -> usize {
        self.num_locations
    }

    pub fn is_symmetric(&self) -> bool {
        self.is_symmetric
    }

    #[inline(always)]
    fn index(&self, from: LocationIdx, to: LocationIdx) -> usize {
        from.get() * self.num_locations + to.get()
    }

    /// Meters between two locations, staying in place is always free.
    #[inline(always)]
    pub fn distance(&self, from: LocationIdx, to: LocationIdx) -> Option<Distance> {
        if from == to {
            return Some(0.0);
        }
        self.distances[self.index(from, to)]
    }

    /// Seconds between two locations in free-flow traffic.
    #[inline(always)]
    pub fn time(&self, from: LocationIdx, to: LocationIdx) -> Option<Time> {
        if from == to {
            return Some(0.0);
        }
        self.times[self.index(from, to)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetry_detection() {
        let symmetric = TravelMatrices::from_rows(
            vec![vec![Some(0.0), Some(5.0)], vec![Some(5.0), Some(0.0)]],
            vec![vec![Some(0.0), Some(1.0)], vec![Some(1.0), Some(0.0)]],
        )
        .unwrap();
        assert!(symmetric.is_symmetric());

        let asymmetric = TravelMatrices::from_rows(
            vec![vec![Some(0.0), Some(5.0)], vec![Some(7.0), Some(0.0)]],
            vec![vec![Some(0.0), Some(1.0)], vec![Some(1.0), Some(0.0)]],
        )
        .unwrap();
        assert!(!asymmetric.is_symmetric());
        assert_eq!(asymmetric.distance(1.into(), 0.into()), Some(7.0));
    }

    #[test]
    fn test_missing_pairs() {
        let matrices = TravelMatrices::from_rows(
            vec![vec![None, None], vec![Some(5.0), None]],
            vec![vec![None, None], vec![Some(1.0), None]],
        )
        .unwrap();

        assert_eq!(matrices.distance(0.into(), 1.into()), None);
        assert_eq!(matrices.distance(1.into(), 0.into()), Some(5.0));
        assert_eq!(matrices.distance(1.into(), 1.into()), Some(0.0));
    }

    #[test]
    fn test_from_euclidean() {
        let locations = vec![
            Location::from_cartesian(0.0, 0.0),
            Location::from_cartesian(300.0, 400.0),
        ];
        let matrices = TravelMatrices::from_euclidean(&locations, 10.0);

        assert_eq!(matrices.distance(0.into(), 1.into()), Some(500.0));
        assert_eq!(matrices.time(0.into(), 1.into()), Some(50.0));
    }
}
