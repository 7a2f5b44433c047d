// src/incident/notifier.rs
use super::sink::{IncidentEvent, IncidentSink, LogSink};
use super::tracker::IncidentTracker;
use crate::probe::CheckResult;
use crate::store::StoreError;
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NotifyReport {
    pub down: usize,
    pub opened: usize,
    pub resolved: usize,
}

/// Scans a run's results for down services and drives the incident feed.
pub struct IncidentNotifier {
    tracker: IncidentTracker,
    sinks: Vec<Arc<dyn IncidentSink>>,
}

impl IncidentNotifier {
    pub fn new(tracker: IncidentTracker) -> Self {
        Self {
            tracker,
            sinks: vec![Arc::new(LogSink)],
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn IncidentSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Tracker persistence failures propagate; sink failures are only logged.
    pub async fn notify(&self, batch: &[CheckResult]) -> Result<NotifyReport, StoreError> {
        let mut report = NotifyReport::default();

        for result in batch {
            if !result.is_up() {
                report.down += 1;
                self.dispatch(&IncidentEvent::Down {
                    id: result.id.clone(),
                    timestamp: result.timestamp,
                    message: result.message_or_default().to_string(),
                })
                .await;
            }

            if let Some(event) = self.tracker.observe(result).await? {
                match event {
                    IncidentEvent::Opened { .. } => report.opened += 1,
                    IncidentEvent::Resolved { .. } => report.resolved += 1,
                    IncidentEvent::Down { .. } => {}
                }
                self.dispatch(&event).await;
            }
        }

        Ok(report)
    }

    async fn dispatch(&self, event: &IncidentEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.deliver(event).await {
                error!(
                    sink = sink.name(),
                    service = %event.id(),
                    "failed to deliver incident event: {:#}",
                    e
                );
            }
        }
    }
}
