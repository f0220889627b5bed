use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign},
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What a stop takes out of the vehicle.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Default)]
pub struct Load {
    #[serde(default)]
    pub parcels: u32,
    #[serde(default)]
    pub weight_kg: f64,
    #[serde(default)]
    pub volume_m3: f64,
}

impl Load {
    pub const ZERO: Load = Load {
        parcels: 0,
        weight_kg: 0.0,
        volume_m3: 0.0,
    };

    pub fn new(parcels: u32, weight_kg: f64, volume_m3: f64) -> Self {
        Load {
            parcels,
            weight_kg,
            volume_m3,
        }
    }

    pub fn weight(weight_kg: f64) -> Self {
        Load {
            weight_kg,
            ..Load::ZERO
        }
    }
}

impl Add for Load {
    type Output = Load;

    fn add(self, other: Load) -> Load {
        Load {
            parcels: self.parcels + other.parcels,
            weight_kg: self.weight_kg + other.weight_kg,
            volume_m3: self.volume_m3 + other.volume_m3,
        }
    }
}

impl AddAssign for Load {
    fn add_assign(&mut self, other: Load) {
        self.parcels += other.parcels;
        self.weight_kg += other.weight_kg;
        self.volume_m3 += other.volume_m3;
    }
}

impl<'a> Sum<&'a Load> for Load {
    fn sum<I: Iterator<Item = &'a Load>>(iter: I) -> Self {
        iter.fold(Load::ZERO, |acc, load| acc + *load)
    }
}

impl fmt::Display for Load {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} parcels, {:.1} kg, {:.2} m3",
            self.parcels, self.weight_kg, self.volume_m3
        )
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq)]
pub struct Capacity {
    pub max_weight_kg: f64,
    pub max_volume_m3: f64,
    #[serde(default)]
    pub max_parcels: Option<u32>,
}

impl Capacity {
    pub fn new(max_weight_kg: f64, max_volume_m3: f64) -> Self {
        Capacity {
            max_weight_kg,
            max_volume_m3,
            max_parcels: None,
        }
    }

    pub fn with_max_parcels(mut self, max_parcels: u32) -> Self {
        self.max_parcels = Some(max_parcels);
        self
    }

    pub fn is_valid(&self) -> bool {
        self.max_weight_kg > 0.0
            && self.max_volume_m3 > 0.0
            && self.max_parcels.is_none_or(|parcels| parcels > 0)
    }

    pub fn fits(&self, load: &Load) -> bool {
        excess(load.weight_kg, self.max_weight_kg) == 0.0
            && excess(load.volume_m3, self.max_volume_m3) == 0.0
            && self
                .max_parcels
                .is_none_or(|max_parcels| load.parcels <= max_parcels)
    }

    /// Sum of the relative excess over every dimension, `0.0` when the load fits.
    pub fn overflow(&self, load: &Load) -> f64 {
        let weight = excess(load.weight_kg, self.max_weight_kg) / self.max_weight_kg;
        let volume = excess(load.volume_m3, self.max_volume_m3) / self.max_volume_m3;
        let parcels = self.max_parcels.map_or(0.0, |max_parcels| {
            load.parcels.saturating_sub(max_parcels) as f64 / max_parcels as f64
        });

        weight + volume + parcels
    }

    /// Fraction of the most constrained dimension in use.
    pub fn utilization(&self, load: &Load) -> f64 {
        let weight = load.weight_kg / self.max_weight_kg;
        let volume = load.volume_m3 / self.max_volume_m3;
        let parcels = self
            .max_parcels
            .map_or(0.0, |max_parcels| load.parcels as f64 / max_parcels as f64);

        weight.max(volume).max(parcels)
    }
}

/// Relative slack absorbing the rounding of summed demands.
const CAPACITY_EPSILON: f64 = 1e-9;

/// Amount of `value` above `max`, `0.0` within rounding of the limit.
fn excess(value: f64, max: f64) -> f64 {
    if value <= max + CAPACITY_EPSILON * max.abs().max(1.0) {
        0.0
    } else {
        value - max
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} kg, {:.2} m3", self.max_weight_kg, self.max_volume_m3)?;
        if let Some(max_parcels) = self.max_parcels {
            write!(f, ", {max_parcels} parcels")?;
        }
        Ok(())
    }
}
