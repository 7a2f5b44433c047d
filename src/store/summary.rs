// src/store/summary.rs
use super::{DocumentStore, ResultStore, StoreError};
use crate::probe::{CheckResult, CheckStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LastStatus {
    #[default]
    Unknown,
    Up,
    Down,
}

impl From<CheckStatus> for LastStatus {
    fn from(status: CheckStatus) -> Self {
        match status {
            CheckStatus::Up => LastStatus::Up,
            CheckStatus::Down => LastStatus::Down,
        }
    }
}

/// Rolling statistics for one service across every check it has had.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Summary {
    pub uptime_percentage: f64,
    pub total_checks: u64,
    pub up_checks: u64,
    pub avg_response_time: f64,
    pub last_status: LastStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<i64>,
}

impl Summary {
    /// Fold one result into the aggregate.
    ///
    /// The running mean always divides by `total_checks`, including checks
    /// that reported no response time, so timeouts drag the average down on
    /// later measured checks.
    pub fn fold(&mut self, result: &CheckResult) {
        let previous_total = self.total_checks;

        self.total_checks += 1;
        if result.status == CheckStatus::Up {
            self.up_checks += 1;
        }

        if let Some(response_time) = result.response_time {
            let accumulated = self.avg_response_time * previous_total as f64 + response_time as f64;
            self.avg_response_time = accumulated / self.total_checks as f64;
        }

        self.last_status = result.status.into();
        self.last_checked = Some(result.timestamp);
        self.recompute_uptime();
    }

    fn recompute_uptime(&mut self) {
        self.uptime_percentage = if self.total_checks == 0 {
            0.0
        } else {
            self.up_checks as f64 / self.total_checks as f64 * 100.0
        };
    }
}

/// Applies check results to the persisted `<id>.json` summaries.
#[derive(Clone)]
pub struct SummaryAggregator {
    documents: DocumentStore,
}

impl SummaryAggregator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            documents: DocumentStore::new(dir),
        }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.documents.path_for(id)
    }

    /// Returns the summary as written.
    pub async fn update(&self, result: &CheckResult) -> Result<Summary, StoreError> {
        let result = result.clone();
        let id = result.id.clone();

        self.documents
            .update(&id, move |summary: &mut Summary| {
                summary.fold(&result);
                summary.clone()
            })
            .await
    }

    /// Append `result` to its log and fold it into the summary while holding
    /// the summary lock, so the last log line and `lastChecked` always agree.
    pub async fn record(
        &self,
        log: &ResultStore,
        result: &CheckResult,
    ) -> Result<Summary, StoreError> {
        let guard = self.documents.lock(&result.id).await?;
        log.append(result).await?;

        let result = result.clone();
        self.documents
            .update_locked(&guard, move |summary: &mut Summary| {
                summary.fold(&result);
                summary.clone()
            })
            .await
    }

    pub async fn load(&self, id: &str) -> Result<Option<Summary>, StoreError> {
        self.documents.load(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn check(id: &str, status: CheckStatus, response_time: Option<u64>) -> CheckResult {
        CheckResult {
            id: id.to_string(),
            timestamp: 1_700_000_000_000,
            status,
            status_code: None,
            response_time,
            message: None,
        }
    }

    #[test]
    fn test_zero_state() {
        let summary = Summary::default();
        assert_eq!(summary.total_checks, 0);
        assert_eq!(summary.up_checks, 0);
        assert_eq!(summary.avg_response_time, 0.0);
        assert_eq!(summary.last_status, LastStatus::Unknown);

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["lastStatus"], "unknown");
    }

    #[test]
    fn test_four_ups_then_timeout() {
        let mut summary = Summary::default();
        for _ in 0..4 {
            summary.fold(&check("web", CheckStatus::Up, Some(120)));
        }
        summary.fold(&check("web", CheckStatus::Down, None));

        assert_eq!(summary.total_checks, 5);
        assert_eq!(summary.up_checks, 4);
        assert!((summary.uptime_percentage - 80.0).abs() < 1e-9);
        assert!((summary.avg_response_time - 120.0).abs() < 1e-9);
        assert_eq!(summary.last_status, LastStatus::Down);
    }

    #[test]
    fn test_down_lowers_uptime_keeps_up_checks() {
        let mut summary = Summary::default();
        summary.fold(&check("api", CheckStatus::Up, Some(50)));
        let before = summary.clone();

        summary.fold(&check("api", CheckStatus::Down, Some(70)));

        assert_eq!(summary.up_checks, before.up_checks);
        assert_eq!(summary.total_checks, before.total_checks + 1);
        assert!(summary.uptime_percentage < before.uptime_percentage);
        assert!((summary.avg_response_time - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_time_before_measured_understates_average() {
        let mut summary = Summary::default();
        summary.fold(&check("web", CheckStatus::Down, None));
        summary.fold(&check("web", CheckStatus::Up, Some(100)));

        assert!((summary.avg_response_time - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_reads_legacy_document_without_last_checked() {
        let summary: Summary = serde_json::from_str(
            r#"{"uptimePercentage":0,"totalChecks":0,"upChecks":0,"avgResponseTime":0,"lastStatus":"unknown"}"#,
        )
        .unwrap();
        assert_eq!(summary, Summary::default());
    }

    #[tokio::test]
    async fn test_fresh_and_zero_seeded_agree() {
        let fresh_dir = tempfile::tempdir().unwrap();
        let seeded_dir = tempfile::tempdir().unwrap();

        let fresh = SummaryAggregator::new(fresh_dir.path());
        let seeded = SummaryAggregator::new(seeded_dir.path());
        std::fs::write(
            seeded.path_for("api"),
            serde_json::to_string_pretty(&Summary::default()).unwrap(),
        )
        .unwrap();

        let result = check("api", CheckStatus::Up, Some(30));
        assert_eq!(
            fresh.update(&result).await.unwrap(),
            seeded.update(&result).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_persisted_summary_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let aggregator = SummaryAggregator::new(dir.path());

        let written = aggregator
            .update(&check("api", CheckStatus::Up, Some(33)))
            .await
            .unwrap();
        let loaded = aggregator.load("api").await.unwrap().unwrap();

        assert_eq!(written, loaded);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(aggregator.path_for("api")).unwrap())
                .unwrap();
        for key in [
            "uptimePercentage",
            "totalChecks",
            "upChecks",
            "avgResponseTime",
            "lastStatus",
            "lastChecked",
        ] {
            assert!(raw.get(key).is_some(), "missing {}", key);
        }
    }

    #[tokio::test]
    async fn test_concurrent_updates_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let aggregator = SummaryAggregator::new(dir.path());

        let mut tasks = Vec::new();
        for i in 0..40u64 {
            let aggregator = aggregator.clone();
            let status = if i % 4 == 0 {
                CheckStatus::Down
            } else {
                CheckStatus::Up
            };
            tasks.push(tokio::spawn(async move {
                aggregator.update(&check("api", status, Some(10))).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let summary = aggregator.load("api").await.unwrap().unwrap();
        assert_eq!(summary.total_checks, 40);
        assert_eq!(summary.up_checks, 30);
        assert!((summary.uptime_percentage - 75.0).abs() < 1e-9);
        assert!((summary.avg_response_time - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_stale_stored_uptime_is_recomputed() {
        let dir = tempfile::tempdir().unwrap();
        let aggregator = SummaryAggregator::new(dir.path());
        std::fs::write(
            aggregator.path_for("api"),
            r#"{"uptimePercentage":12.5,"totalChecks":4,"upChecks":4,"avgResponseTime":10,"lastStatus":"up"}"#,
        )
        .unwrap();

        let summary = aggregator
            .update(&check("api", CheckStatus::Up, Some(10)))
            .await
            .unwrap();

        assert_eq!(summary.total_checks, 5);
        assert_eq!(summary.up_checks, 5);
        assert!((summary.uptime_percentage - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_log_tail_matches_summary_under_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let aggregator = SummaryAggregator::new(dir.path().join("summary"));
        let log = ResultStore::new(dir.path().join("checks"));
        std::fs::create_dir_all(dir.path().join("checks")).unwrap();

        let mut tasks = Vec::new();
        for i in 0..24i64 {
            let aggregator = aggregator.clone();
            let log = log.clone();
            let status = if i % 3 == 0 {
                CheckStatus::Down
            } else {
                CheckStatus::Up
            };
            tasks.push(tokio::spawn(async move {
                let mut result = check("api", status, Some(5));
                result.timestamp = i;
                aggregator.record(&log, &result).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let contents = std::fs::read_to_string(log.path_for("api")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 24);
        let last: CheckResult = serde_json::from_str(lines[23]).unwrap();

        let summary = aggregator.load("api").await.unwrap().unwrap();
        assert_eq!(summary.total_checks, 24);
        assert_eq!(summary.last_checked, Some(last.timestamp));
        assert_eq!(summary.last_status, LastStatus::from(last.status));
    }

    proptest! {
        #[test]
        fn prop_fold_matches_batch_statistics(
            checks in proptest::collection::vec((any::<bool>(), 0u64..60_000), 1..200)
        ) {
            let mut summary = Summary::default();
            for (up, response_time) in &checks {
                let status = if *up { CheckStatus::Up } else { CheckStatus::Down };
                summary.fold(&check("svc", status, Some(*response_time)));
            }

            let n = checks.len() as u64;
            let ups = checks.iter().filter(|(up, _)| *up).count() as u64;
            let mean = checks.iter().map(|(_, rt)| *rt as f64).sum::<f64>() / n as f64;

            prop_assert_eq!(summary.total_checks, n);
            prop_assert_eq!(summary.up_checks, ups);
            prop_assert!((summary.uptime_percentage - ups as f64 / n as f64 * 100.0).abs() < 1e-9);
            prop_assert!((summary.avg_response_time - mean).abs() < 1e-6 * mean.max(1.0));
        }

        #[test]
        fn prop_counters_never_decrease(
            checks in proptest::collection::vec((any::<bool>(), proptest::option::of(0u64..10_000)), 1..100)
        ) {
            let mut summary = Summary::default();
            for (up, response_time) in checks {
                let before = summary.clone();
                let status = if up { CheckStatus::Up } else { CheckStatus::Down };
                summary.fold(&check("svc", status, response_time));

                prop_assert_eq!(summary.total_checks, before.total_checks + 1);
                prop_assert!(summary.up_checks >= before.up_checks);
                prop_assert!(summary.up_checks <= summary.total_checks);
            }
        }

        #[test]
        fn prop_summary_round_trips(
            total in 0u64..1_000_000,
            up_ratio in 0.0f64..=1.0,
            avg in 0.0f64..100_000.0,
            last_checked in proptest::option::of(0i64..4_000_000_000_000),
        ) {
            let up = (total as f64 * up_ratio) as u64;
            let mut summary = Summary {
                uptime_percentage: 0.0,
                total_checks: total,
                up_checks: up,
                avg_response_time: avg,
                last_status: LastStatus::Up,
                last_checked,
            };
            summary.recompute_uptime();

            let json = serde_json::to_string(&summary).unwrap();
            let parsed: Summary = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(parsed.total_checks, summary.total_checks);
            prop_assert_eq!(parsed.up_checks, summary.up_checks);
            prop_assert_eq!(parsed.last_status, summary.last_status);
            prop_assert_eq!(parsed.last_checked, summary.last_checked);
            prop_assert!((parsed.avg_response_time - summary.avg_response_time).abs() <= 1e-9 * avg.max(1.0));
            prop_assert!((parsed.uptime_percentage - summary.uptime_percentage).abs() <= 1e-9);
        }
    }
}
