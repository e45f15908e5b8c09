use crate::error::ScrapeError;
use crate::metrics::{MetricKind, MetricSample};
use crate::model::Asset;
use crate::repository::{AssetMetricKey, TimestampRepository};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Suppress,
}

/// Acceptance rule: reject only when a prior exists and `observed - window` falls strictly
/// before it. An underflowing subtraction counts as "before".
pub fn decide(
    prior: Option<DateTime<Utc>>,
    observed: DateTime<Utc>,
    window: ChronoDuration,
) -> Decision {
    let Some(prior) = prior else {
        return Decision::Accept;
    };
    match observed.checked_sub_signed(window) {
        Some(floor) if floor >= prior => Decision::Accept,
        _ => Decision::Suppress,
    }
}

pub struct DedupEngine {
    repository: Arc<dyn TimestampRepository>,
    window: ChronoDuration,
}

impl DedupEngine {
    pub fn new(repository: Arc<dyn TimestampRepository>, scrape_interval: Duration) -> Self {
        let window = ChronoDuration::from_std(scrape_interval).unwrap_or(ChronoDuration::MAX);
        Self { repository, window }
    }

    /// Looks up the prior timestamp for the sample's key and, on acceptance, records the
    /// sample's own timestamp. A failed lookup is returned; a failed write is only logged so
    /// the already-accepted sample is still emitted.
    pub fn evaluate(&self, asset_id: &str, sample: &MetricSample) -> Result<Decision, ScrapeError> {
        let key = AssetMetricKey::new(asset_id, sample.kind.name());
        let prior = self
            .repository
            .get(&key)
            .map_err(|source| ScrapeError::RepositoryFailure {
                signature: key.signature(),
                source,
            })?;

        let decision = decide(prior, sample.timestamp, self.window);
        match decision {
            Decision::Accept => {
                if let Err(source) = self.repository.store(&key, sample.timestamp) {
                    let err = ScrapeError::RepositoryFailure {
                        signature: key.signature(),
                        source,
                    };
                    tracing::warn!(asset_id, error = %err, "failed to record accepted sample");
                }
            }
            Decision::Suppress => {
                tracing::trace!(
                    signature = %key,
                    observed_at = %sample.timestamp,
                    "suppressed stale sample"
                );
            }
        }
        Ok(decision)
    }

    /// Samples of this asset that should be emitted this cycle. Each metric is decided on
    /// its own; a repository failure or an out-of-range timestamp drops only that metric.
    pub fn accepted_samples(&self, asset: &Asset) -> Vec<MetricSample> {
        let mut accepted = Vec::new();
        for kind in MetricKind::ALL {
            let sample = match kind.sample(asset) {
                Ok(Some(sample)) => sample,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(
                        asset_id = %asset.id,
                        metric = kind.name(),
                        timestamp = err.0,
                        error = %err,
                        "dropping sample with unrepresentable timestamp"
                    );
                    continue;
                }
            };
            match self.evaluate(&asset.id, &sample) {
                Ok(Decision::Accept) => accepted.push(sample),
                Ok(Decision::Suppress) => {}
                Err(err) => {
                    tracing::error!(
                        asset_id = %asset.id,
                        metric = kind.name(),
                        error = %err,
                        "error while accessing asset metric repository"
                    );
                }
            }
        }
        accepted
    }
}
