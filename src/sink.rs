use crate::error::SinkError;
use crate::metrics::{MetricBatch, ATTR_ASSET_ID};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const SINK_TOKEN_HEADER: &str = "X-Metrics-Ingest-Token";

/// Downstream consumer of scrape batches.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn consume_metrics(&self, batch: MetricBatch) -> Result<(), SinkError>;
}

/// POSTs each batch as JSON.
pub struct HttpJsonSink {
    http: Client,
    url: String,
    token: Option<String>,
}

impl HttpJsonSink {
    pub fn new(
        url: impl Into<String>,
        token: Option<String>,
        connect_timeout: Duration,
    ) -> Result<Self, SinkError> {
        let http = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
            token,
        })
    }
}

#[async_trait]
impl MetricsSink for HttpJsonSink {
    async fn consume_metrics(&self, batch: MetricBatch) -> Result<(), SinkError> {
        let mut request = self.http.post(&self.url).json(&batch);
        if let Some(token) = self.token.as_deref() {
            request = request.header(SINK_TOKEN_HEADER, token);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Status {
                status,
                url: self.url.clone(),
            });
        }
        Ok(())
    }
}

/// Logs a summary of each batch instead of shipping it anywhere.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl MetricsSink for LogSink {
    async fn consume_metrics(&self, batch: MetricBatch) -> Result<(), SinkError> {
        tracing::info!(
            resources = batch.resource_metrics.len(),
            gauges = batch.gauge_count(),
            scrape_state = batch.scrape_state_code(),
            "metrics batch"
        );
        for resource in &batch.resource_metrics {
            let asset_id = resource.attribute(ATTR_ASSET_ID);
            for gauge in &resource.gauges {
                tracing::debug!(
                    asset_id,
                    metric = %gauge.name,
                    unit = %gauge.unit,
                    points = gauge.data_points.len(),
                    "gauge"
                );
            }
        }
        Ok(())
    }
}
