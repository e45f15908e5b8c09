use anyhow::{Context, Result};
use fleet_telemetry_receiver::client::HttpFleetClient;
use fleet_telemetry_receiver::config::Config;
use fleet_telemetry_receiver::repository::open_repository;
use fleet_telemetry_receiver::scheduler::ScrapeScheduler;
use fleet_telemetry_receiver::scrape::MetricsScrape;
use fleet_telemetry_receiver::sink::{HttpJsonSink, LogSink, MetricsSink};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn init_tracing(config: &Config) -> Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime::Tokio, trace::Config as OTelTraceConfig, Resource};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,fleet_telemetry_receiver=info".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    if let Some(endpoint) = &config.otlp_endpoint {
        let endpoint = normalize_otlp_http_endpoint(endpoint);
        let exporter = opentelemetry_otlp::new_exporter()
            .http()
            .with_endpoint(endpoint);
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(OTelTraceConfig::default().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "fleet-telemetry-receiver"),
            ])))
            .install_batch(Tokio)?;

        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

fn normalize_otlp_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.contains("/v1/traces") {
        return trimmed.to_string();
    }
    format!("{}/v1/traces", trimmed.trim_end_matches('/'))
}

fn build_sink(config: &Config) -> Result<Arc<dyn MetricsSink>> {
    match &config.sink_url {
        Some(url) => {
            let sink = HttpJsonSink::new(url, config.sink_token.clone(), config.http_timeout())
                .context("failed to build downstream metrics sink")?;
            tracing::info!(url = %url, "forwarding metrics over HTTP");
            Ok(Arc::new(sink))
        }
        None => {
            tracing::info!("no sink url configured; logging metric batches");
            Ok(Arc::new(LogSink))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config)?;
    config.log_fallbacks();

    let repository = open_repository(&config.repository)
        .context("failed to open asset metric repository")?;
    let client = HttpFleetClient::new(
        &config.base_url,
        config.username.clone(),
        config.password.clone(),
        config.http_timeout(),
    )
    .context("failed to build fleet telemetry client")?;
    let sink = build_sink(&config)?;

    let scrape = MetricsScrape::new(Arc::new(client), repository, config.scrape_interval());
    let cancel = CancellationToken::new();
    let handle = ScrapeScheduler::new(scrape, sink, config.scrape_interval()).start(cancel);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown signal received");
    handle.shutdown().await;

    Ok(())
}
