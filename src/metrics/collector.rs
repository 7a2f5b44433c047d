// src/metrics/collector.rs
use crate::probe::CheckResult;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, Histogram, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    /// Prometheus text exposition of everything registered.
    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    pub checks_total: IntCounterVec,
    pub check_duration_seconds: HistogramVec,
    pub services_down: IntGauge,
    pub services_total: IntGauge,
    pub run_duration_seconds: Histogram,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let checks_total = IntCounterVec::new(
            Opts::new("uptime_checks_total", "Total number of checks"),
            &["service", "status"],
        )?;
        registry.register(Box::new(checks_total.clone()))?;

        let check_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "uptime_check_duration_seconds",
                "Response time of checks that produced one",
            ),
            &["service"],
        )?;
        registry.register(Box::new(check_duration_seconds.clone()))?;

        let services_down =
            IntGauge::new("uptime_services_down", "Services down in the last run")?;
        registry.register(Box::new(services_down.clone()))?;

        let services_total =
            IntGauge::new("uptime_services_total", "Services checked in the last run")?;
        registry.register(Box::new(services_total.clone()))?;

        let run_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "uptime_run_duration_seconds",
            "Wall-clock duration of a full run",
        ))?;
        registry.register(Box::new(run_duration_seconds.clone()))?;

        Ok(Self {
            checks_total,
            check_duration_seconds,
            services_down,
            services_total,
            run_duration_seconds,
        })
    }

    pub fn record_check(&self, result: &CheckResult) {
        self.checks_total
            .with_label_values(&[result.id.as_str(), result.status.as_str()])
            .inc();

        if let Some(ms) = result.response_time {
            self.check_duration_seconds
                .with_label_values(&[result.id.as_str()])
                .observe(Duration::from_millis(ms).as_secs_f64());
        }
    }

    pub fn record_run(&self, total: usize, down: usize, duration: Duration) {
        self.services_total.set(total as i64);
        self.services_down.set(down as i64);
        self.run_duration_seconds.observe(duration.as_secs_f64());
    }
}
