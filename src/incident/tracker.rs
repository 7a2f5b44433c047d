// src/incident/tracker.rs
use super::sink::IncidentEvent;
use crate::probe::{CheckResult, CheckStatus};
use crate::store::{DocumentStore, StoreError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle of a service's outage, persisted as `incidents/<id>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum IncidentState {
    #[default]
    Healthy,
    Firing {
        since: i64,
        message: String,
    },
    Resolved {
        since: i64,
        #[serde(rename = "resolvedAt")]
        resolved_at: i64,
    },
}

impl IncidentState {
    pub fn is_firing(&self) -> bool {
        matches!(self, IncidentState::Firing { .. })
    }

    /// Advance the state for one result; returns the lifecycle event, if any.
    pub fn apply(&mut self, result: &CheckResult) -> Option<IncidentEvent> {
        let message = result.message_or_default().to_string();

        match (&*self, result.status) {
            (IncidentState::Healthy | IncidentState::Resolved { .. }, CheckStatus::Down) => {
                *self = IncidentState::Firing {
                    since: result.timestamp,
                    message: message.clone(),
                };
                Some(IncidentEvent::Opened {
                    id: result.id.clone(),
                    since: result.timestamp,
                    message,
                })
            }
            (IncidentState::Firing { since, .. }, CheckStatus::Down) => {
                let since = *since;
                *self = IncidentState::Firing { since, message };
                None
            }
            (IncidentState::Firing { since, .. }, CheckStatus::Up) => {
                let since = *since;
                *self = IncidentState::Resolved {
                    since,
                    resolved_at: result.timestamp,
                };
                Some(IncidentEvent::Resolved {
                    id: result.id.clone(),
                    since,
                    resolved_at: result.timestamp,
                })
            }
            (_, CheckStatus::Up) => None,
        }
    }
}

#[derive(Clone)]
pub struct IncidentTracker {
    documents: DocumentStore,
}

impl IncidentTracker {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            documents: DocumentStore::new(dir),
        }
    }

    pub async fn observe(&self, result: &CheckResult) -> Result<Option<IncidentEvent>, StoreError> {
        let result = result.clone();
        let id = result.id.clone();

        self.documents
            .update(&id, move |state: &mut IncidentState| state.apply(&result))
            .await
    }

    pub async fn state(&self, id: &str) -> Result<IncidentState, StoreError> {
        Ok(self.documents.load(id).await?.unwrap_or_default())
    }
}
