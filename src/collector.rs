use crate::client::FleetApi;
use crate::error::ScrapeError;
use crate::model::{FleetObservations, ScrapedData};
use chrono::Utc;
use std::sync::Arc;

#[derive(Clone)]
pub struct ObservationCollector {
    api: Arc<dyn FleetApi>,
}

impl ObservationCollector {
    pub fn new(api: Arc<dyn FleetApi>) -> Self {
        Self { api }
    }

    /// Snapshot of every fleet's assets. Failing to list fleets fails the whole snapshot;
    /// a fleet whose assets cannot be listed is kept as unobserved and the rest continue.
    pub async fn scrape_last_observations(&self) -> Result<ScrapedData, ScrapeError> {
        tracing::debug!("starting scrape of latest observations");
        let mut scraped = ScrapedData::empty(Utc::now());

        let fleets = self
            .api
            .list_fleets()
            .await
            .map_err(ScrapeError::UpstreamListFailure)?;

        for fleet in fleets {
            tracing::debug!(fleet_id = %fleet.id, "scraping assets for fleet");
            match self.api.list_assets(&fleet.id).await {
                Ok(assets) => {
                    tracing::debug!(
                        fleet_id = %fleet.id,
                        assets_count = assets.len(),
                        "fleet observed"
                    );
                    scraped
                        .fleets
                        .push(FleetObservations::observed(fleet.id, assets));
                }
                Err(source) => {
                    let err = ScrapeError::UpstreamAssetListFailure {
                        fleet_id: fleet.id.clone(),
                        source,
                    };
                    tracing::error!(fleet_id = %fleet.id, error = %err, "fleet not observed");
                    scraped.fleets.push(FleetObservations::unobserved(fleet.id));
                }
            }
        }

        tracing::info!(fleets = scraped.fleets.len(), "observation scrape complete");
        Ok(scraped)
    }
}
