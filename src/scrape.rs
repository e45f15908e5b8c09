use crate::client::FleetApi;
use crate::collector::ObservationCollector;
use crate::dedup::DedupEngine;
use crate::metrics::{MetricBatch, MetricBatchBuilder, MetricSample};
use crate::model::{Asset, ScrapeState, ScrapedData};
use crate::repository::TimestampRepository;
use std::sync::Arc;
use std::time::Duration;

/// Mutable state of a single scrape cycle: the batch under construction and the running
/// scrape state. Created per cycle and consumed by `finish`.
#[derive(Debug)]
pub struct ScrapeCycle {
    builder: MetricBatchBuilder,
    state: ScrapeState,
    samples: usize,
}

impl ScrapeCycle {
    pub fn new() -> Self {
        Self {
            builder: MetricBatchBuilder::new(),
            state: ScrapeState::Succeeded,
            samples: 0,
        }
    }

    pub fn mark_failed(&mut self) {
        self.state = ScrapeState::Failed;
    }

    /// Incomplete never downgrades a failed cycle.
    pub fn mark_incomplete(&mut self) {
        if self.state == ScrapeState::Succeeded {
            self.state = ScrapeState::Incomplete;
        }
    }

    pub fn record_asset(&mut self, fleet_id: &str, asset: &Asset, samples: Vec<MetricSample>) {
        self.samples += samples.len();
        self.builder.push_asset(fleet_id, asset, samples);
    }

    pub fn finish(self) -> ScrapeReport {
        ScrapeReport {
            state: self.state,
            samples: self.samples,
            batch: self.builder.finish(self.state),
        }
    }
}

impl Default for ScrapeCycle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub batch: MetricBatch,
    pub state: ScrapeState,
    pub samples: usize,
}

pub struct MetricsScrape {
    collector: ObservationCollector,
    dedup: DedupEngine,
}

impl MetricsScrape {
    pub fn new(
        api: Arc<dyn FleetApi>,
        repository: Arc<dyn TimestampRepository>,
        scrape_interval: Duration,
    ) -> Self {
        Self {
            collector: ObservationCollector::new(api),
            dedup: DedupEngine::new(repository, scrape_interval),
        }
    }

    /// Runs one full collect -> decide -> build pass. Always yields a batch; upstream
    /// failures only change the reported scrape state.
    pub async fn generate_metrics(&self) -> ScrapeReport {
        let mut cycle = ScrapeCycle::new();
        match self.collector.scrape_last_observations().await {
            Ok(scraped) => self.apply(&mut cycle, &scraped),
            Err(err) => {
                tracing::error!(error = %err, "error while scraping observations");
                cycle.mark_failed();
            }
        }
        let report = cycle.finish();
        tracing::info!(
            state = ?report.state,
            samples = report.samples,
            "metrics scraping complete"
        );
        report
    }

    fn apply(&self, cycle: &mut ScrapeCycle, scraped: &ScrapedData) {
        tracing::debug!(
            observed_at = %scraped.observed_at,
            fleets = scraped.fleets.len(),
            "observations collected"
        );
        if !scraped.is_complete() {
            cycle.mark_incomplete();
        }
        for fleet in &scraped.fleets {
            if !fleet.observed {
                tracing::error!(
                    fleet_id = %fleet.fleet_id,
                    "fleet has not been observed, scraping is incomplete"
                );
            }
            for asset in &fleet.assets {
                tracing::debug!(
                    fleet_id = %fleet.fleet_id,
                    asset_id = %asset.id,
                    "collecting metrics for asset"
                );
                let samples = self.dedup.accepted_samples(asset);
                cycle.record_asset(&fleet.fleet_id, asset, samples);
            }
        }
    }
}
