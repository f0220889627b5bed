use jiff::{SignedDuration, Timestamp};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Acceptable arrival interval at a stop, either bound may be open.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeWindow {
    earliest: Option<Timestamp>,
    latest: Option<Timestamp>,
}

impl TimeWindow {
    pub fn new(earliest: Option<Timestamp>, latest: Option<Timestamp>) -> Self {
        TimeWindow { earliest, latest }
    }

    pub fn from_iso(earliest: Option<&str>, latest: Option<&str>) -> Result<Self, jiff::Error> {
        Ok(TimeWindow {
            earliest: earliest.map(str::parse::<Timestamp>).transpose()?,
            latest: latest.map(str::parse::<Timestamp>).transpose()?,
        })
    }

    pub fn earliest(&self) -> Option<Timestamp> {
        self.earliest
    }

    pub fn latest(&self) -> Option<Timestamp> {
        self.latest
    }

    pub fn is_empty(&self) -> bool {
        self.earliest.is_none() && self.latest.is_none()
    }

    pub fn is_valid(&self) -> bool {
        match (self.earliest, self.latest) {
            (Some(earliest), Some(latest)) => earliest <= latest,
            _ => true,
        }
    }
}

impl TimeWindow {
    pub fn is_satisfied(&self, arrival: Timestamp) -> bool {
        self.latest.is_none_or(|latest| arrival <= latest)
    }

    /// How long after `latest` the arrival is, zero when on time.
    pub fn lateness(&self, arrival: Timestamp) -> SignedDuration {
        match self.latest {
            Some(latest) if arrival > latest => arrival.duration_since(latest),
            _ => SignedDuration::ZERO,
        }
    }

    /// How long before `earliest` the arrival is, zero when not early.
    pub fn slack(&self, arrival: Timestamp) -> SignedDuration {
        match self.earliest {
            Some(earliest) if arrival < earliest => earliest.duration_since(arrival),
            _ => SignedDuration::ZERO,
        }
    }
}

#[derive(Default)]
pub struct TimeWindowBuilder {
    earliest: Option<Timestamp>,
    latest: Option<Timestamp>,
}

impl TimeWindowBuilder {
    pub fn with_earliest(mut self, earliest: Timestamp) -> Self {
        self.earliest = Some(earliest);
        self
    }

    pub fn with_latest(mut self, latest: Timestamp) -> Self {
        self.latest = Some(latest);
        self
    }

    pub fn build(self) -> TimeWindow {
        TimeWindow {
            earliest: self.earliest,
            latest: self.latest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let earliest: Timestamp = "2025-06-10T08:00:00+02:00".parse().unwrap();
        let latest: Timestamp = "2025-06-10T10:00:00+02:00".parse().unwrap();
        let time_window = TimeWindowBuilder::default()
            .with_earliest(earliest)
            .with_latest(latest)
            .build();

        assert_eq!(time_window.earliest(), Some(earliest));
        assert_eq!(time_window.latest(), Some(latest));
        assert!(time_window.is_valid());
    }

    #[test]
    fn test_from_iso() {
        let time_window =
            TimeWindow::from_iso(Some("2025-06-10T08:00:00Z"), None).unwrap();

        assert!(time_window.latest().is_none());
        assert!(TimeWindow::from_iso(Some("not a date"), None).is_err());
    }

    #[test]
    fn test_lateness_and_slack() {
        let time_window = TimeWindow::from_iso(
            Some("2025-06-10T08:00:00Z"),
            Some("2025-06-10T10:00:00Z"),
        )
        .unwrap();

        let early: Timestamp = "2025-06-10T07:45:00Z".parse().unwrap();
        let late: Timestamp = "2025-06-10T10:30:00Z".parse().unwrap();

        assert_eq!(time_window.slack(early), SignedDuration::from_mins(15));
        assert_eq!(time_window.lateness(early), SignedDuration::ZERO);
        assert!(time_window.is_satisfied(early));

        assert_eq!(time_window.lateness(late), SignedDuration::from_mins(30));
        assert!(!time_window.is_satisfied(late));
    }
}
