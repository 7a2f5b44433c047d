// src/probe/prober.rs
use super::assertion;
use super::result::{CheckResult, CheckStatus};
use crate::config::{MonitorConfig, ServiceSpec};
use crate::retry::{RetryDecision, RetryPolicy, RetryStrategy};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

/// Anything that can turn a service definition into one check result.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, service: &ServiceSpec) -> CheckResult;
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// A response that arrived and was fully read.
#[derive(Debug)]
struct Observed {
    status_code: u16,
    body: Option<String>,
    elapsed: Duration,
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct AttemptError {
    message: String,
    elapsed: Duration,
    timed_out: bool,
    retryable: bool,
}

impl AttemptError {
    fn from_reqwest(error: reqwest::Error, elapsed: Duration) -> Self {
        let mut message = error.to_string();
        if message.is_empty() {
            message = "Request failed".to_string();
        }

        Self {
            message,
            elapsed,
            timed_out: error.is_timeout(),
            // Builder errors (bad scheme, malformed request) fail the same way every time.
            retryable: !error.is_builder(),
        }
    }

    fn retry_decision(&self) -> RetryDecision {
        if self.retryable {
            RetryDecision::Retry
        } else {
            RetryDecision::NoRetry
        }
    }
}

pub struct HttpProber {
    client: Client,
    retry: RetryStrategy,
}

impl HttpProber {
    pub fn new(monitor: &MonitorConfig) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(monitor.timeout())
            .user_agent(monitor.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            retry: RetryStrategy::new(RetryPolicy::from_monitor(monitor)),
        })
    }

    async fn attempt(
        &self,
        service: &ServiceSpec,
        method: reqwest::Method,
    ) -> Result<Observed, AttemptError> {
        let start = Instant::now();

        let response = self
            .client
            .request(method, service.url.clone())
            .send()
            .await
            .map_err(|e| AttemptError::from_reqwest(e, start.elapsed()))?;

        let status_code = response.status().as_u16();
        let body = if assertion::needs_body(service.assertions.as_ref()) {
            // Decoded as UTF-8 regardless of any BOM or charset header.
            let bytes = response
                .bytes()
                .await
                .map_err(|e| AttemptError::from_reqwest(e, start.elapsed()))?;
            Some(String::from_utf8_lossy(&bytes).into_owned())
        } else {
            None
        };

        Ok(Observed {
            status_code,
            body,
            elapsed: start.elapsed(),
        })
    }
}

#[async_trait]
impl Probe for HttpProber {
    async fn check(&self, service: &ServiceSpec) -> CheckResult {
        let method = match service.http_method() {
            Ok(method) => method,
            Err(e) => {
                return CheckResult {
                    id: service.id.clone(),
                    timestamp: Utc::now().timestamp_millis(),
                    status: CheckStatus::Down,
                    status_code: None,
                    response_time: None,
                    message: Some(format!("Invalid HTTP method {}: {}", service.method, e)),
                };
            }
        };

        // Only transport failures are retried. A received response is final.
        let outcome = self
            .retry
            .execute_with_decision(
                || self.attempt(service, method.clone()),
                AttemptError::retry_decision,
            )
            .await;

        let timestamp = Utc::now().timestamp_millis();

        match outcome {
            Ok(observed) => {
                let verdict = assertion::evaluate(
                    service.assertions.as_ref(),
                    observed.status_code,
                    observed.body.as_deref(),
                );
                debug!(
                    service = %service.id,
                    status_code = observed.status_code,
                    elapsed_ms = observed.elapsed.as_millis() as u64,
                    "probe completed"
                );

                CheckResult {
                    id: service.id.clone(),
                    timestamp,
                    status: if verdict.up {
                        CheckStatus::Up
                    } else {
                        CheckStatus::Down
                    },
                    status_code: Some(observed.status_code),
                    response_time: Some(observed.elapsed.as_millis() as u64),
                    message: Some(verdict.message),
                }
            }
            Err(error) => {
                debug!(
                    service = %service.id,
                    elapsed_ms = error.elapsed.as_millis() as u64,
                    timed_out = error.timed_out,
                    "probe failed: {}",
                    error
                );

                // A timed out request never produced an outcome to time.
                let response_time = if error.timed_out {
                    None
                } else {
                    Some(error.elapsed.as_millis() as u64)
                };

                CheckResult {
                    id: service.id.clone(),
                    timestamp,
                    status: CheckStatus::Down,
                    status_code: None,
                    response_time,
                    message: Some(error.message),
                }
            }
        }
    }
}
