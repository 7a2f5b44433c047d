// src/runner/orchestrator.rs
use crate::config::ServiceSpec;
use crate::probe::{CheckResult, CheckStatus, Probe};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::error;

/// Fans a probe out over every service and gathers one result per service.
pub struct Orchestrator {
    probe: Arc<dyn Probe>,
    limit: Option<Arc<Semaphore>>,
}

impl Orchestrator {
    /// `concurrency == 0` leaves the fan-out unbounded.
    pub fn new(probe: Arc<dyn Probe>, concurrency: usize) -> Self {
        let limit = (concurrency > 0).then(|| Arc::new(Semaphore::new(concurrency)));
        Self { probe, limit }
    }

    /// Results come back in the order of `services`.
    pub async fn probe_all(&self, services: &[ServiceSpec]) -> Vec<CheckResult> {
        let mut tasks = Vec::with_capacity(services.len());

        for service in services {
            let probe = self.probe.clone();
            let limit = self.limit.clone();
            let service = service.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = match &limit {
                    Some(semaphore) => semaphore.clone().acquire_owned().await.ok(),
                    None => None,
                };
                probe.check(&service).await
            }));
        }

        let joined = futures::future::join_all(tasks).await;

        joined
            .into_iter()
            .zip(services)
            .map(|(outcome, service)| match outcome {
                Ok(result) => result,
                Err(e) => {
                    error!(service = %service.id, "probe task failed: {}", e);
                    CheckResult {
                        id: service.id.clone(),
                        timestamp: Utc::now().timestamp_millis(),
                        status: CheckStatus::Down,
                        status_code: None,
                        response_time: None,
                        message: Some(format!("Probe task failed: {}", e)),
                    }
                }
            })
            .collect()
    }
}
