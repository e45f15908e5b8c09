use crate::error::TimestampOutOfRange;
use crate::model::{Asset, ScrapeState};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const SCRAPE_STATE_METRIC: &str = "scrape_state";

pub const ATTR_FLEET_ID: &str = "asset.fleet_id";
pub const ATTR_ASSET_ID: &str = "asset.id";
pub const ATTR_UIC: &str = "asset.uic";
pub const ATTR_TRIP_ID: &str = "asset.trip_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    GpsLatitude,
    GpsLongitude,
    Mileage,
    Speed,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::GpsLatitude,
        MetricKind::GpsLongitude,
        MetricKind::Mileage,
        MetricKind::Speed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricKind::GpsLatitude => "asset_gps_latitude",
            MetricKind::GpsLongitude => "asset_gps_longitude",
            MetricKind::Mileage => "asset_mileage",
            MetricKind::Speed => "asset_speed",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            MetricKind::GpsLatitude | MetricKind::GpsLongitude => "deg",
            MetricKind::Mileage => "km",
            MetricKind::Speed => "km/h",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            MetricKind::GpsLatitude => "The asset GPS latitude, in degree of arc",
            MetricKind::GpsLongitude => "The asset GPS longitude, in degree of arc",
            MetricKind::Mileage => "The asset mileage, in kilometers.",
            MetricKind::Speed => "The asset speed, in kilometers per hour.",
        }
    }

    /// The sample this asset carries for this metric. `Ok(None)` when the feature is
    /// absent.
    pub fn sample(self, asset: &Asset) -> Result<Option<MetricSample>, TimestampOutOfRange> {
        let features = &asset.features;
        let reading = match self {
            MetricKind::GpsLatitude => features
                .gps
                .as_ref()
                .map(|gps| (gps.observed_at(), gps.position.latitude)),
            MetricKind::GpsLongitude => features
                .gps
                .as_ref()
                .map(|gps| (gps.observed_at(), gps.position.longitude)),
            MetricKind::Mileage => features
                .mileage
                .as_ref()
                .map(|mileage| (mileage.observed_at(), mileage.value)),
            MetricKind::Speed => features
                .speed
                .as_ref()
                .map(|speed| (speed.observed_at(), speed.value)),
        };
        let Some((timestamp, value)) = reading else {
            return Ok(None);
        };
        Ok(Some(MetricSample {
            kind: self,
            timestamp: timestamp?,
            value,
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub kind: MetricKind,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PointValue {
    Double(f64),
    Int(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub value: PointValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gauge {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub data_points: Vec<DataPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceMetrics {
    pub attributes: Vec<(String, String)>,
    pub gauges: Vec<Gauge>,
}

impl ResourceMetrics {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricBatch {
    pub resource_metrics: Vec<ResourceMetrics>,
}

impl MetricBatch {
    pub fn gauges(&self) -> impl Iterator<Item = &Gauge> {
        self.resource_metrics
            .iter()
            .flat_map(|resource| resource.gauges.iter())
    }

    pub fn gauge_count(&self) -> usize {
        self.gauges().count()
    }

    pub fn scrape_state_code(&self) -> Option<i64> {
        self.gauges()
            .find(|gauge| gauge.name == SCRAPE_STATE_METRIC)
            .and_then(|gauge| gauge.data_points.first())
            .and_then(|point| match point.value {
                PointValue::Int(code) => Some(code),
                PointValue::Double(_) => None,
            })
    }
}

#[cfg(test)]
impl MetricBatch {
    pub(crate) fn asset_resources<'a>(
        &'a self,
        asset_id: &'a str,
    ) -> impl Iterator<Item = &'a ResourceMetrics> + 'a {
        self.resource_metrics
            .iter()
            .filter(move |resource| resource.attribute(ATTR_ASSET_ID) == Some(asset_id))
    }
}

/// Accumulates one cycle's output. The scrape-state gauge is written by `finish`, so it is
/// present exactly once whatever happened during the cycle.
#[derive(Debug, Default)]
pub struct MetricBatchBuilder {
    assets: Vec<ResourceMetrics>,
}

impl MetricBatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one resource group for the asset. Assets without accepted samples produce
    /// nothing.
    pub fn push_asset(&mut self, fleet_id: &str, asset: &Asset, samples: Vec<MetricSample>) {
        if samples.is_empty() {
            return;
        }
        self.assets.push(ResourceMetrics {
            attributes: asset_attributes(fleet_id, asset),
            gauges: samples.into_iter().map(sample_gauge).collect(),
        });
    }

    pub fn finish(self, state: ScrapeState) -> MetricBatch {
        let mut resource_metrics = Vec::with_capacity(self.assets.len() + 1);
        resource_metrics.push(ResourceMetrics {
            attributes: Vec::new(),
            gauges: vec![scrape_state_gauge(state)],
        });
        resource_metrics.extend(self.assets);
        MetricBatch { resource_metrics }
    }
}

fn asset_attributes(fleet_id: &str, asset: &Asset) -> Vec<(String, String)> {
    let mut attributes = vec![
        (ATTR_FLEET_ID.to_string(), fleet_id.to_string()),
        (ATTR_ASSET_ID.to_string(), asset.id.clone()),
    ];
    if let Some(uic) = asset.features.uic.as_ref() {
        attributes.push((ATTR_UIC.to_string(), uic.value.clone()));
    }
    if let Some(trip) = asset.features.trip.as_ref() {
        attributes.push((ATTR_TRIP_ID.to_string(), trip.value.trip_id.clone()));
    }
    attributes
}

fn sample_gauge(sample: MetricSample) -> Gauge {
    Gauge {
        name: sample.kind.name().to_string(),
        description: sample.kind.description().to_string(),
        unit: sample.kind.unit().to_string(),
        data_points: vec![DataPoint {
            timestamp: Some(sample.timestamp),
            value: PointValue::Double(sample.value),
        }],
    }
}

fn scrape_state_gauge(state: ScrapeState) -> Gauge {
    Gauge {
        name: SCRAPE_STATE_METRIC.to_string(),
        description: format!(
            "The state of the scrape, {} stands for succeed scrape, {} for incomplete scrape and {} for failed scrape",
            ScrapeState::Succeeded.code(),
            ScrapeState::Incomplete.code(),
            ScrapeState::Failed.code(),
        ),
        unit: String::new(),
        data_points: vec![DataPoint {
            timestamp: None,
            value: PointValue::Int(state.code()),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssetFeatures, GpsFix, Position, Reading, TripFeature, TripValue, UicFeature};
    use chrono::TimeZone;

    fn asset_with_everything() -> Asset {
        Asset {
            id: "A1".to_string(),
            features: AssetFeatures {
                uic: Some(UicFeature {
                    value: "938000000001".to_string(),
                }),
                trip: Some(TripFeature {
                    value: TripValue {
                        trip_id: "T-42".to_string(),
                    },
                }),
                gps: Some(GpsFix {
                    timestamp: 1_700_000_000_000,
                    position: Position {
                        latitude: 48.85,
                        longitude: 2.35,
                    },
                }),
                mileage: Some(Reading {
                    timestamp: 1_700_000_010_000,
                    value: 120_345.5,
                }),
                speed: None,
            },
        }
    }

    #[test]
    fn samples_follow_present_features() {
        let asset = asset_with_everything();
        let kinds: Vec<_> = MetricKind::ALL
            .into_iter()
            .filter_map(|kind| kind.sample(&asset).unwrap())
            .map(|sample| sample.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                MetricKind::GpsLatitude,
                MetricKind::GpsLongitude,
                MetricKind::Mileage
            ]
        );

        let mileage = MetricKind::Mileage.sample(&asset).unwrap().unwrap();
        assert_eq!(
            mileage.timestamp,
            Utc.timestamp_opt(1_700_000_010, 0).unwrap()
        );
        assert_eq!(mileage.value, 120_345.5);
    }

    #[test]
    fn unrepresentable_timestamp_is_reported() {
        let asset = Asset {
            id: "A3".to_string(),
            features: AssetFeatures {
                speed: Some(Reading {
                    timestamp: i64::MIN,
                    value: 5.0,
                }),
                ..AssetFeatures::default()
            },
        };
        let err = MetricKind::Speed.sample(&asset).unwrap_err();
        assert_eq!(err.0, i64::MIN);
        assert!(MetricKind::Mileage.sample(&asset).unwrap().is_none());
    }

    #[test]
    fn scrape_state_is_always_emitted_first() {
        let batch = MetricBatchBuilder::new().finish(ScrapeState::Failed);
        assert_eq!(batch.resource_metrics.len(), 1);
        assert_eq!(batch.gauge_count(), 1);
        assert_eq!(batch.scrape_state_code(), Some(1));
        assert!(batch.resource_metrics[0].attributes.is_empty());
    }

    #[test]
    fn asset_resource_carries_attributes_and_units() {
        let asset = asset_with_everything();
        let samples = MetricKind::ALL
            .into_iter()
            .filter_map(|kind| kind.sample(&asset).unwrap())
            .collect();
        let mut builder = MetricBatchBuilder::new();
        builder.push_asset("F1", &asset, samples);
        let batch = builder.finish(ScrapeState::Succeeded);

        let resource = batch.asset_resources("A1").next().expect("asset resource");
        assert_eq!(resource.attribute(ATTR_FLEET_ID), Some("F1"));
        assert_eq!(resource.attribute(ATTR_UIC), Some("938000000001"));
        assert_eq!(resource.attribute(ATTR_TRIP_ID), Some("T-42"));

        let units: Vec<_> = resource
            .gauges
            .iter()
            .map(|g| (g.name.as_str(), g.unit.as_str()))
            .collect();
        assert_eq!(
            units,
            vec![
                ("asset_gps_latitude", "deg"),
                ("asset_gps_longitude", "deg"),
                ("asset_mileage", "km")
            ]
        );
        assert!(resource.gauges.iter().all(|g| g.data_points.len() == 1));
        assert_eq!(batch.scrape_state_code(), Some(0));
    }

    #[test]
    fn optional_attributes_are_omitted() {
        let asset = Asset {
            id: "A2".to_string(),
            features: AssetFeatures {
                speed: Some(Reading {
                    timestamp: 1_700_000_000_000,
                    value: 12.0,
                }),
                ..AssetFeatures::default()
            },
        };
        let sample = MetricKind::Speed.sample(&asset).unwrap().unwrap();
        let mut builder = MetricBatchBuilder::new();
        builder.push_asset("F1", &asset, vec![sample]);
        let batch = builder.finish(ScrapeState::Succeeded);

        let resource = batch.asset_resources("A2").next().unwrap();
        assert_eq!(resource.attributes.len(), 2);
        assert!(resource.attribute(ATTR_UIC).is_none());
    }

    #[test]
    fn assets_without_samples_produce_no_resource() {
        let mut builder = MetricBatchBuilder::new();
        builder.push_asset("F1", &asset_with_everything(), Vec::new());
        let batch = builder.finish(ScrapeState::Succeeded);
        assert_eq!(batch.resource_metrics.len(), 1);
    }
}
