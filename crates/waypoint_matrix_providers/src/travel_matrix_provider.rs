use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::travel_matrices::TravelMatrices;

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub enum TravelMatrixProvider {
    /// Great-circle distances at a constant average speed.
    AsTheCrowFlies { speed_kmh: f64 },

    /// Planar distances, coordinates are read as meters.
    Euclidean { speed_meters_per_second: f64 },

    /// Matrices computed by an external distance provider.
    Custom { matrices: TravelMatrices },
}

impl Default for TravelMatrixProvider {
    fn default() -> Self {
        // Average urban speed
        TravelMatrixProvider::AsTheCrowFlies { speed_kmh: 35.0 }
    }
}

impl TravelMatrixProvider {
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, TravelMatrixProvider::Custom { .. })
    }
}

impl std::hash::Hash for TravelMatrixProvider {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            TravelMatrixProvider::AsTheCrowFlies { speed_kmh } => {
                state.write_u8(0);
                state.write_u64(speed_kmh.to_bits());
            }
            TravelMatrixProvider::Euclidean {
                speed_meters_per_second,
            } => {
                state.write_u8(1);
                state.write_u64(speed_meters_per_second.to_bits());
            }
            TravelMatrixProvider::Custom { matrices } => {
                state.write_u8(2);
                matrices.hash(state);
            }
        }
    }
}
