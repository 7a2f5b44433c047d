// src/runner/mod.rs
mod orchestrator;

pub use orchestrator::Orchestrator;

use crate::config::{Config, ServiceSpec};
use crate::incident::{IncidentNotifier, IncidentTracker, JsonlFeedSink, NotifyReport};
use crate::metrics::MetricsRegistry;
use crate::probe::{CheckResult, HttpProber, Probe};
use crate::store::{write_atomic, DataDir, ResultStore, SummaryAggregator};
use anyhow::{Context, Result};
use futures::future::try_join_all;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

const DEFAULT_METRICS_TEXTFILE: &str = "metrics.prom";
const INCIDENT_FEED: &str = "events.ndjson";

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub results: Vec<CheckResult>,
    pub up: usize,
    pub down: usize,
    pub incidents: NotifyReport,
    pub duration: Duration,
}

struct MetricsExport {
    registry: MetricsRegistry,
    textfile: PathBuf,
}

/// One full check cycle: probe everything, persist, then notify.
pub struct Runner {
    services: Vec<ServiceSpec>,
    orchestrator: Orchestrator,
    results: ResultStore,
    summaries: SummaryAggregator,
    notifier: IncidentNotifier,
    metrics: Option<MetricsExport>,
}

impl Runner {
    pub fn new(config: &Config, data: &DataDir) -> Result<Self> {
        let prober = HttpProber::new(&config.monitor).context("Failed to create prober")?;
        Self::with_probe(config, data, Arc::new(prober))
    }

    pub fn with_probe(config: &Config, data: &DataDir, probe: Arc<dyn Probe>) -> Result<Self> {
        let metrics = if config.metrics.enabled {
            let textfile = config
                .metrics
                .textfile
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_METRICS_TEXTFILE));
            Some(MetricsExport {
                registry: MetricsRegistry::new()?,
                textfile: data.root().join(textfile),
            })
        } else {
            None
        };

        let notifier = IncidentNotifier::new(IncidentTracker::new(data.incidents()))
            .with_sink(Arc::new(JsonlFeedSink::new(data.incidents().join(INCIDENT_FEED))));

        Ok(Self {
            services: config.services.clone(),
            orchestrator: Orchestrator::new(probe, config.monitor.concurrency),
            results: ResultStore::new(data.checks()),
            summaries: SummaryAggregator::new(data.summary()),
            notifier,
            metrics,
        })
    }

    pub async fn run_once(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        self.execute(run_id)
            .instrument(info_span!("run", run_id = %run_id))
            .await
    }

    async fn execute(&self, run_id: Uuid) -> Result<RunReport> {
        let started = Instant::now();
        info!(
            "Starting monitoring checks for {} services...",
            self.services.len()
        );

        let results = self.orchestrator.probe_all(&self.services).await;

        // Per service: append, then fold. No ordering across services.
        try_join_all(results.iter().map(|result| self.persist(result))).await?;

        let incidents = self
            .notifier
            .notify(&results)
            .await
            .context("Failed to update incident state")?;

        let up = results.iter().filter(|r| r.is_up()).count();
        let down = results.len() - up;
        let duration = started.elapsed();

        if let Some(metrics) = &self.metrics {
            metrics.registry.collector().record_run(results.len(), down, duration);
            self.export_metrics(metrics).await?;
        }

        info!(
            up,
            down,
            opened = incidents.opened,
            resolved = incidents.resolved,
            "Monitoring checks completed in {:?}",
            duration
        );

        Ok(RunReport {
            run_id,
            results,
            up,
            down,
            incidents,
            duration,
        })
    }

    async fn persist(&self, result: &CheckResult) -> Result<()> {
        self.summaries
            .record(&self.results, result)
            .await
            .with_context(|| format!("Failed to record check for {}", result.id))?;

        if let Some(metrics) = &self.metrics {
            metrics.registry.collector().record_check(result);
        }
        Ok(())
    }

    async fn export_metrics(&self, metrics: &MetricsExport) -> Result<()> {
        let body = metrics.registry.gather()?;
        let path = metrics.textfile.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &body))
            .await?
            .context("Failed to write metrics textfile")?;
        Ok(())
    }

    /// Run on a fixed interval until `shutdown` resolves. An in-flight run
    /// always completes; a failed run stops the loop.
    pub async fn run_every<F>(&self, period: Duration, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!("Starting scheduled checks every {:?}", period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await?;
                }
                _ = &mut shutdown => {
                    info!("Scheduler shutting down");
                    return Ok(());
                }
            }
        }
    }
}
