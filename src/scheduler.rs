use crate::error::ScrapeError;
use crate::scrape::{MetricsScrape, ScrapeReport};
use crate::sink::MetricsSink;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    Running,
    Stopped,
}

pub struct ScrapeScheduler {
    scrape: MetricsScrape,
    sink: Arc<dyn MetricsSink>,
    interval: Duration,
}

impl ScrapeScheduler {
    pub fn new(scrape: MetricsScrape, sink: Arc<dyn MetricsSink>, interval: Duration) -> Self {
        Self {
            scrape,
            sink,
            interval,
        }
    }

    /// Spawns the scrape loop. The first cycle runs immediately; cancellation is observed
    /// only between cycles.
    pub fn start(self, cancel: CancellationToken) -> SchedulerHandle {
        let running = Arc::new(AtomicBool::new(true));
        let loop_running = running.clone();
        let loop_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            self.run(loop_cancel).await;
            loop_running.store(false, Ordering::Release);
        });
        SchedulerHandle {
            cancel,
            running,
            task,
        }
    }

    async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(interval = ?self.interval, "started metrics scraping loop");

        loop {
            self.run_cycle().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
        }
        tracing::info!("metrics scraping loop stopped");
    }

    /// One scrape followed by a forward. Forwarding failures are logged and never stop the
    /// loop.
    pub async fn run_cycle(&self) -> ScrapeReport {
        tracing::info!("scraping metrics");
        let report = self.scrape.generate_metrics().await;
        match self.sink.consume_metrics(report.batch.clone()).await {
            Ok(()) => tracing::info!("metrics successfully consumed"),
            Err(source) => {
                let err = ScrapeError::DownstreamForwardFailure(source);
                tracing::error!(error = %err, "error consuming metrics");
            }
        }
        report
    }
}

pub struct SchedulerHandle {
    cancel: CancellationToken,
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn state(&self) -> ReceiverState {
        if self.running.load(Ordering::Acquire) {
            ReceiverState::Running
        } else {
            ReceiverState::Stopped
        }
    }

    /// Cancels the loop and waits for the in-flight cycle, if any, to finish.
    pub async fn shutdown(self) -> ReceiverState {
        tracing::info!("shutting down receiver");
        let SchedulerHandle {
            cancel,
            running,
            task,
        } = self;
        cancel.cancel();
        if let Err(err) = task.await {
            tracing::error!(error = %err, "scrape loop task failed");
            running.store(false, Ordering::Release);
        }
        ReceiverState::Stopped
    }
}
