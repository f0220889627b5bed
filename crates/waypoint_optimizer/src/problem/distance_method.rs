use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How coordinates of a problem are read by geometric code.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMethod {
    /// Points are lon/lat in degrees.
    #[default]
    Haversine,
    /// Points are cartesian, units are meters.
    Euclidean,
}
