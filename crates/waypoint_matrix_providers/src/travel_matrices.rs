use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// TravelMatrices holds the travel distance (meters) and time (seconds) matrices.
/// Stored as flat row-major vectors, `index = from * num_locations + to`.
///
/// A `None` entry means the provider has no data for the pair. It is never read as zero.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct TravelMatrices {
    pub distances: Vec<Option<f64>>,
    pub times: Vec<Option<f64>>,
}

#[derive(Debug, Error, PartialEq)]
pub enum MatrixShapeError {
    #[error("distance matrix has {0} entries, which is not a square")]
    NotSquare(usize),

    #[error("distance matrix has {distances} entries but time matrix has {times}")]
    LengthMismatch { distances: usize, times: usize },

    #[error("matrix covers {actual} locations but {expected} were requested")]
    WrongSize { expected: usize, actual: usize },
}

impl TravelMatrices {
    pub fn from_rows(distances: Vec<Vec<Option<f64>>>, times: Vec<Vec<Option<f64>>>) -> Self {
        TravelMatrices {
            distances: distances.into_iter().flatten().collect(),
            times: times.into_iter().flatten().collect(),
        }
    }

    pub fn num_locations(&self) -> usize {
        self.distances.len().isqrt()
    }

    /// Checks that both matrices are square, of equal size, and returns the number of locations.
    pub fn validate(&self) -> Result<usize, MatrixShapeError> {
        let len = self.distances.len();
        let num_locations = len.isqrt();

        if num_locations * num_locations != len {
            return Err(MatrixShapeError::NotSquare(len));
        }

        if self.times.len() != len {
            return Err(MatrixShapeError::LengthMismatch {
                distances: len,
                times: self.times.len(),
            });
        }

        Ok(num_locations)
    }

    pub fn validate_for(&self, expected: usize) -> Result<(), MatrixShapeError> {
        let actual = self.validate()?;
        if actual != expected {
            return Err(MatrixShapeError::WrongSize { expected, actual });
        }
        Ok(())
    }

    pub fn missing_entries(&self) -> usize {
        let num_locations = self.num_locations();
        self.distances
            .iter()
            .zip(self.times.iter())
            .enumerate()
            .filter(|(index, (distance, time))| {
                index / num_locations != index % num_locations
                    && (distance.is_none() || time.is_none())
            })
            .count()
    }
}

fn hash_entries<H: std::hash::Hasher>(entries: &[Option<f64>], state: &mut H) {
    for entry in entries {
        match entry {
            Some(value) => {
                state.write_u8(1);
                state.write_u64(value.to_bits());
            }
            None => state.write_u8(0),
        }
    }
}

impl std::hash::Hash for TravelMatrices {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        hash_entries(&self.distances, state);
        hash_entries(&self.times, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let matrices = TravelMatrices::from_rows(
            vec![vec![Some(0.0), Some(5.0)], vec![Some(6.0), Some(0.0)]],
            vec![vec![Some(0.0), Some(1.0)], vec![Some(1.0), Some(0.0)]],
        );

        assert_eq!(matrices.validate(), Ok(2));
        assert_eq!(matrices.validate_for(2), Ok(()));
        assert_eq!(
            matrices.validate_for(3),
            Err(MatrixShapeError::WrongSize {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_not_square() {
        let matrices = TravelMatrices {
            distances: vec![Some(0.0); 3],
            times: vec![Some(0.0); 3],
        };

        assert_eq!(matrices.validate(), Err(MatrixShapeError::NotSquare(3)));
    }

    #[test]
    fn test_missing_entries_ignore_diagonal() {
        let matrices = TravelMatrices::from_rows(
            vec![vec![None, Some(5.0)], vec![None, None]],
            vec![vec![None, Some(1.0)], vec![Some(1.0), None]],
        );

        assert_eq!(matrices.missing_entries(), 1);
    }

    #[test]
    fn test_deserialize_nulls() {
        let matrices: TravelMatrices =
            serde_json::from_str(r#"{"distances":[0.0,null,3.0,0.0],"times":[0,1,2,0]}"#)
                .unwrap();

        assert_eq!(matrices.distances[1], None);
        assert_eq!(matrices.times[1], Some(1.0));
    }
}
