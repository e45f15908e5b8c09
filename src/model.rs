use crate::error::TimestampOutOfRange;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Fleet {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub features: AssetFeatures,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetFeatures {
    #[serde(default)]
    pub uic: Option<UicFeature>,
    #[serde(default)]
    pub trip: Option<TripFeature>,
    #[serde(default)]
    pub gps: Option<GpsFix>,
    #[serde(default)]
    pub mileage: Option<Reading>,
    #[serde(default)]
    pub speed: Option<Reading>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UicFeature {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TripFeature {
    pub value: TripValue,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripValue {
    pub trip_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GpsFix {
    /// Unix milliseconds.
    pub timestamp: i64,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// A single timestamped scalar feature (mileage, speed).
#[derive(Debug, Clone, Deserialize)]
pub struct Reading {
    /// Unix milliseconds.
    pub timestamp: i64,
    pub value: f64,
}

impl GpsFix {
    pub fn observed_at(&self) -> Result<DateTime<Utc>, TimestampOutOfRange> {
        millis_to_dt(self.timestamp)
    }
}

impl Reading {
    pub fn observed_at(&self) -> Result<DateTime<Utc>, TimestampOutOfRange> {
        millis_to_dt(self.timestamp)
    }
}

fn millis_to_dt(ms: i64) -> Result<DateTime<Utc>, TimestampOutOfRange> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or(TimestampOutOfRange(ms))
}

/// Outcome of one fleet's asset listing within a scrape cycle.
#[derive(Debug, Clone)]
pub struct FleetObservations {
    pub fleet_id: String,
    pub observed: bool,
    pub assets: Vec<Asset>,
}

impl FleetObservations {
    pub fn observed(fleet_id: impl Into<String>, assets: Vec<Asset>) -> Self {
        Self {
            fleet_id: fleet_id.into(),
            observed: true,
            assets,
        }
    }

    pub fn unobserved(fleet_id: impl Into<String>) -> Self {
        Self {
            fleet_id: fleet_id.into(),
            observed: false,
            assets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapedData {
    pub observed_at: DateTime<Utc>,
    pub fleets: Vec<FleetObservations>,
}

impl ScrapedData {
    pub fn empty(observed_at: DateTime<Utc>) -> Self {
        Self {
            observed_at,
            fleets: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.fleets.iter().all(|fleet| fleet.observed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeState {
    Succeeded,
    Failed,
    Incomplete,
}

impl ScrapeState {
    pub fn code(self) -> i64 {
        match self {
            ScrapeState::Succeeded => 0,
            ScrapeState::Failed => 1,
            ScrapeState::Incomplete => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_asset_with_partial_features() {
        let raw = r#"{
            "id": "A1",
            "features": {
                "uic": {"value": "938000000001"},
                "trip": {"value": {"tripId": "T-42"}},
                "gps": {"timestamp": 1700000000000, "position": {"latitude": 48.85, "longitude": 2.35}},
                "speed": {"timestamp": 1700000001000, "value": 87.5}
            }
        }"#;
        let asset: Asset = serde_json::from_str(raw).expect("asset");
        assert_eq!(asset.id, "A1");
        assert_eq!(asset.features.uic.as_ref().map(|u| u.value.as_str()), Some("938000000001"));
        assert_eq!(
            asset.features.trip.as_ref().map(|t| t.value.trip_id.as_str()),
            Some("T-42")
        );
        assert!(asset.features.mileage.is_none());
        let gps = asset.features.gps.expect("gps");
        assert_eq!(gps.observed_at().unwrap().timestamp(), 1_700_000_000);
        assert_eq!(asset.features.speed.map(|s| s.value), Some(87.5));
    }

    #[test]
    fn decodes_asset_without_features() {
        let asset: Asset = serde_json::from_str(r#"{"id": "bare"}"#).expect("asset");
        assert!(asset.features.gps.is_none());
        assert!(asset.features.speed.is_none());
    }

    #[test]
    fn out_of_range_timestamp_is_an_error() {
        let reading = Reading {
            timestamp: i64::MAX,
            value: 1.0,
        };
        let err = reading.observed_at().unwrap_err();
        assert_eq!(err.0, i64::MAX);
    }

    #[test]
    fn scrape_state_codes_are_stable() {
        assert_eq!(ScrapeState::Succeeded.code(), 0);
        assert_eq!(ScrapeState::Failed.code(), 1);
        assert_eq!(ScrapeState::Incomplete.code(), 2);
    }

    #[test]
    fn completeness_tracks_unobserved_fleets() {
        let mut data = ScrapedData::empty(Utc::now());
        assert!(data.is_complete());
        data.fleets.push(FleetObservations::observed("f1", Vec::new()));
        assert!(data.is_complete());
        data.fleets.push(FleetObservations::unobserved("f2"));
        assert!(!data.is_complete());
    }
}
