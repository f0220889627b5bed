use jiff::{Timestamp, civil::Weekday, tz::TimeZone};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Hourly traffic multipliers, `hourly[h]` applies from `h:00` to `h:59` local time.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct TrafficCurve {
    pub hourly: [f64; 24],
}

impl TrafficCurve {
    pub const FREE_FLOW: TrafficCurve = TrafficCurve { hourly: [1.0; 24] };

    pub fn at_hour(&self, hour: usize) -> f64 {
        self.hourly[hour % 24]
    }
}

impl Default for TrafficCurve {
    /// Morning peak 07:00-09:00, evening peak 16:00-18:00.
    fn default() -> Self {
        let mut hourly = [1.0; 24];
        hourly[7] = 1.3;
        hourly[8] = 1.5;
        hourly[9] = 1.2;
        hourly[15] = 1.1;
        hourly[16] = 1.3;
        hourly[17] = 1.5;
        hourly[18] = 1.3;
        hourly[19] = 1.1;
        TrafficCurve { hourly }
    }
}

/// A curve that replaces the default one inside a bounding box.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
pub struct TrafficRegion {
    pub name: String,
    /// `[x, y]` (lon, lat) of the south-west corner.
    pub min: [f64; 2],
    /// `[x, y]` (lon, lat) of the north-east corner.
    pub max: [f64; 2],
    pub curve: TrafficCurve,
}

impl TrafficRegion {
    pub fn contains(&self, point: geo_types::Point) -> bool {
        point.x() >= self.min[0]
            && point.x() <= self.max[0]
            && point.y() >= self.min[1]
            && point.y() <= self.max[1]
    }
}

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CongestionLevel {
    FreeFlow,
    Light,
    Moderate,
    Heavy,
    Severe,
}

impl CongestionLevel {
    pub fn from_multiplier(multiplier: f64) -> Self {
        if multiplier >= 2.0 {
            CongestionLevel::Severe
        } else if multiplier >= 1.5 {
            CongestionLevel::Heavy
        } else if multiplier >= 1.2 {
            CongestionLevel::Moderate
        } else if multiplier >= 1.1 {
            CongestionLevel::Light
        } else {
            CongestionLevel::FreeFlow
        }
    }
}

mod time_zone_name {
    use jiff::tz::TimeZone;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time_zone: &TimeZone,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(time_zone.iana_name().unwrap_or("UTC"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimeZone, D::Error> {
        let name = String::deserialize(deserializer)?;
        if name.eq_ignore_ascii_case("UTC") {
            return Ok(TimeZone::UTC);
        }
        TimeZone::get(&name).map_err(serde::de::Error::custom)
    }
}

fn utc() -> TimeZone {
    TimeZone::UTC
}

fn default_weekend_factor() -> f64 {
    0.7
}

/// Time-of-day traffic model. Multipliers are never below `1.0`.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
pub struct TrafficProfile {
    #[serde(default)]
    pub curve: TrafficCurve,

    #[serde(default)]
    pub regions: Vec<TrafficRegion>,

    /// Applied on Saturdays and Sundays before clamping to `1.0`.
    #[serde(default = "default_weekend_factor")]
    pub weekend_factor: f64,

    /// IANA name of the zone the curves are expressed in.
    #[serde(default = "utc", with = "time_zone_name")]
    #[schemars(with = "String")]
    pub time_zone: TimeZone,
}

impl Default for TrafficProfile {
    fn default() -> Self {
        TrafficProfile {
            curve: TrafficCurve::default(),
            regions: Vec::new(),
            weekend_factor: default_weekend_factor(),
            time_zone: TimeZone::UTC,
        }
    }
}

impl TrafficProfile {
    /// A profile that never slows anything down.
    pub fn free_flow() -> Self {
        TrafficProfile {
            curve: TrafficCurve::FREE_FLOW,
            ..TrafficProfile::default()
        }
    }

    pub fn with_time_zone(mut self, time_zone: TimeZone) -> Self {
        self.time_zone = time_zone;
        self
    }

    pub fn with_region(mut self, region: TrafficRegion) -> Self {
        self.regions.push(region);
        self
    }

    fn curve_for(&self, point: geo_types::Point) -> &TrafficCurve {
        self.regions
            .iter()
            .find(|region| region.contains(point))
            .map(|region| &region.curve)
            .unwrap_or(&self.curve)
    }

    pub fn multiplier(&self, point: impl Into<geo_types::Point>, clock: Timestamp) -> f64 {
        let zoned = clock.to_zoned(self.time_zone.clone());
        let hour = zoned.hour() as usize;

        let mut multiplier = self.curve_for(point.into()).at_hour(hour);

        if matches!(zoned.weekday(), Weekday::Saturday | Weekday::Sunday) {
            multiplier *= self.weekend_factor;
        }

        multiplier.max(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    #[test]
    fn test_default_curve_peaks() {
        let profile = TrafficProfile::default();
        let point = geo_types::Point::new(26.1, 44.4);

        // Tuesday
        assert_eq!(profile.multiplier(point, ts("2025-06-10T08:30:00Z")), 1.5);
        assert_eq!(profile.multiplier(point, ts("2025-06-10T17:10:00Z")), 1.5);
        assert_eq!(profile.multiplier(point, ts("2025-06-10T12:00:00Z")), 1.0);
        assert_eq!(profile.multiplier(point, ts("2025-06-10T03:00:00Z")), 1.0);
    }

    #[test]
    fn test_weekend_is_clamped() {
        let profile = TrafficProfile::default();
        let point = geo_types::Point::new(0.0, 0.0);

        // Saturday, 1.5 * 0.7 = 1.05
        let multiplier = profile.multiplier(point, ts("2025-06-14T08:30:00Z"));
        assert!((multiplier - 1.05).abs() < 1e-12);

        // Saturday noon, 1.0 * 0.7 clamped to 1.0
        assert_eq!(profile.multiplier(point, ts("2025-06-14T12:00:00Z")), 1.0);
    }

    #[test]
    fn test_region_curve() {
        let mut hourly = [1.0; 24];
        hourly[8] = 2.2;
        let profile = TrafficProfile::default().with_region(TrafficRegion {
            name: "city".to_owned(),
            min: [25.9, 44.3],
            max: [26.3, 44.6],
            curve: TrafficCurve { hourly },
        });

        let clock = ts("2025-06-10T08:00:00Z");
        assert_eq!(profile.multiplier(geo_types::Point::new(26.1, 44.4), clock), 2.2);
        assert_eq!(profile.multiplier(geo_types::Point::new(23.6, 46.8), clock), 1.5);
    }

    #[test]
    fn test_time_zone_shifts_hours() {
        let profile =
            TrafficProfile::default().with_time_zone(TimeZone::fixed(jiff::tz::offset(2)));
        let point = geo_types::Point::new(0.0, 0.0);

        // 06:30 UTC is 08:30 at UTC+2
        assert_eq!(profile.multiplier(point, ts("2025-06-10T06:30:00Z")), 1.5);
    }

    #[test]
    fn test_congestion_levels() {
        assert_eq!(CongestionLevel::from_multiplier(1.0), CongestionLevel::FreeFlow);
        assert_eq!(CongestionLevel::from_multiplier(1.1), CongestionLevel::Light);
        assert_eq!(CongestionLevel::from_multiplier(1.3), CongestionLevel::Moderate);
        assert_eq!(CongestionLevel::from_multiplier(1.5), CongestionLevel::Heavy);
        assert_eq!(CongestionLevel::from_multiplier(2.2), CongestionLevel::Severe);
    }

    #[test]
    fn test_deserialize_defaults() {
        let profile: TrafficProfile = serde_json::from_str("{}").unwrap();

        assert_eq!(profile.curve, TrafficCurve::default());
        assert_eq!(profile.weekend_factor, 0.7);
        assert_eq!(profile.time_zone.iana_name(), Some("UTC"));
    }
}
