use jiff::SignedDuration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::define_index_newtype;

use super::{load::Load, location::LocationIdx, time_window::TimeWindow};

define_index_newtype!(StopIdx, Stop);

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Critical,
    Urgent,
    High,
    #[default]
    Normal,
    Low,
}

/// Delivery state reported by the field, only carried through for re-planning.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopStatus {
    Pending,
    Attempted,
    Delivered,
}

#[derive(Serialize, Debug, Clone)]
pub struct Stop {
    external_id: String,
    location_id: LocationIdx,
    demand: Load,
    service_duration: SignedDuration,
    time_window: TimeWindow,
    priority: Priority,
    status: Option<StopStatus>,
}

impl Stop {
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn location_id(&self) -> LocationIdx {
        self.location_id
    }

    pub fn demand(&self) -> &Load {
        &self.demand
    }

    pub fn service_duration(&self) -> SignedDuration {
        self.service_duration
    }

    pub fn time_window(&self) -> &TimeWindow {
        &self.time_window
    }

    pub fn has_time_window(&self) -> bool {
        !self.time_window.is_empty()
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn status(&self) -> Option<StopStatus> {
        self.status
    }
}

#[derive(Default)]
pub struct StopBuilder {
    external_id: Option<String>,
    location_id: Option<usize>,
    demand: Option<Load>,
    service_duration: Option<SignedDuration>,
    time_window: Option<TimeWindow>,
    priority: Option<Priority>,
    status: Option<StopStatus>,
}

impl StopBuilder {
    pub fn set_external_id(&mut self, external_id: impl Into<String>) -> &mut StopBuilder {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn set_location_id(&mut self, location_id: usize) -> &mut StopBuilder {
        self.location_id = Some(location_id);
        self
    }

    pub fn set_demand(&mut self, demand: Load) -> &mut StopBuilder {
        self.demand = Some(demand);
        self
    }

    pub fn set_service_duration(&mut self, service_duration: SignedDuration) -> &mut StopBuilder {
        self.service_duration = Some(service_duration);
        self
    }

    pub fn set_time_window(&mut self, time_window: TimeWindow) -> &mut StopBuilder {
        self.time_window = Some(time_window);
        self
    }

    pub fn set_priority(&mut self, priority: Priority) -> &mut StopBuilder {
        self.priority = Some(priority);
        self
    }

    pub fn set_status(&mut self, status: StopStatus) -> &mut StopBuilder {
        self.status = Some(status);
        self
    }

    /// Missing external ids default to the location id.
    pub fn build(self) -> Stop {
        let location_id = self.location_id.unwrap_or_default();
        Stop {
            external_id: self
                .external_id
                .unwrap_or_else(|| format!("stop-{location_id}")),
            location_id: location_id.into(),
            demand: self.demand.unwrap_or_default(),
            service_duration: self.service_duration.unwrap_or(SignedDuration::ZERO),
            time_window: self.time_window.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            status: self.status,
        }
    }
}
