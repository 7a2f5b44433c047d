// src/incident/sink.rs
use crate::store::{append_line, StoreError};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum IncidentEvent {
    /// Emitted for every down result, whatever the incident state.
    Down {
        id: String,
        timestamp: i64,
        message: String,
    },
    Opened {
        id: String,
        since: i64,
        message: String,
    },
    Resolved {
        id: String,
        since: i64,
        #[serde(rename = "resolvedAt")]
        resolved_at: i64,
    },
}

impl IncidentEvent {
    pub fn id(&self) -> &str {
        match self {
            IncidentEvent::Down { id, .. }
            | IncidentEvent::Opened { id, .. }
            | IncidentEvent::Resolved { id, .. } => id,
        }
    }
}

/// Receiver of incident events, e.g. a ticketing integration.
#[async_trait]
pub trait IncidentSink: Send + Sync {
    async fn deliver(&self, event: &IncidentEvent) -> Result<()>;

    fn name(&self) -> &'static str;
}

pub struct LogSink;

#[async_trait]
impl IncidentSink for LogSink {
    async fn deliver(&self, event: &IncidentEvent) -> Result<()> {
        match event {
            IncidentEvent::Down { id, message, .. } => {
                warn!("INCIDENT: Service {} is down - {}", id, message);
            }
            IncidentEvent::Opened { id, since, .. } => {
                warn!(service = %id, since, "incident opened");
            }
            IncidentEvent::Resolved {
                id,
                since,
                resolved_at,
            } => {
                let minutes = (resolved_at - since) as f64 / 60_000.0;
                info!(service = %id, "incident resolved after {:.1} minutes", minutes);
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Appends every event as one JSON line for an external consumer.
pub struct JsonlFeedSink {
    path: PathBuf,
}

impl JsonlFeedSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl IncidentSink for JsonlFeedSink {
    async fn deliver(&self, event: &IncidentEvent) -> Result<()> {
        let mut line = serde_json::to_vec(event).map_err(|e| StoreError::json(e, &self.path))?;
        line.push(b'\n');
        append_line(&self.path, &line).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "jsonl-feed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_feed_sink_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.ndjson");
        let sink = JsonlFeedSink::new(&path);

        sink.deliver(&IncidentEvent::Down {
            id: "api".to_string(),
            timestamp: 5,
            message: "Expected status 200, got 500".to_string(),
        })
        .await
        .unwrap();
        sink.deliver(&IncidentEvent::Resolved {
            id: "api".to_string(),
            since: 5,
            resolved_at: 9,
        })
        .await
        .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "down");
        assert_eq!(lines[0]["id"], "api");
        assert_eq!(lines[1]["event"], "resolved");
        assert_eq!(lines[1]["resolvedAt"], 9);
    }

    #[tokio::test]
    async fn test_log_sink_never_fails() {
        let event = IncidentEvent::Opened {
            id: "api".to_string(),
            since: 1,
            message: "down".to_string(),
        };
        assert!(LogSink.deliver(&event).await.is_ok());
        assert_eq!(event.id(), "api");
    }
}
