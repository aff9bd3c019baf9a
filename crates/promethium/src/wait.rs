//! Polling until workflows finish.
//!
//! Each sweep fetches every unresolved workflow concurrently. A workflow
//! whose status is terminal is recorded and never fetched again; the call
//! returns as soon as the last one resolves, without a trailing sleep.
//!
//! The timeout is cooperative: it is checked before every fetch, and an
//! in-flight request is never aborted. A workflow that ends `FAILED` or
//! `CANCELED` is a normal result, not an error; only the client giving up
//! produces [`PromethiumError::Timeout`].

use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::{PromethiumError, PromethiumResult};
use crate::models::{StatusVocabulary, Workflow, WorkflowId, WorkflowStatus};

/// Default delay between sweeps.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Default time budget for a wait, one day.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(24 * 3600);

/// Anything that can report a workflow's current snapshot.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, id: &WorkflowId) -> PromethiumResult<Workflow>;
}

/// Which status observations reach the [`StatusLog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogPolicy {
    None,
    /// Only observations that differ from the previous one for that id.
    /// The first observation always counts.
    #[default]
    StateChanges,
    All,
}

/// Receives status observations during a wait.
pub trait StatusLog: Send + Sync {
    fn observe(&self, id: &WorkflowId, status: &WorkflowStatus);
}

/// Emits observations as `info` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatusLog;

impl StatusLog for TracingStatusLog {
    fn observe(&self, id: &WorkflowId, status: &WorkflowStatus) {
        info!(workflow_id = %id, status = %status, "Workflow status (id = {}): {}", id, status);
    }
}

/// Per-fetch retry for transient transport failures.
///
/// The default makes a single attempt: any error aborts the wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per fetch, including the first.
    pub max_attempts: u32,
    /// Delay before each retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

/// Parameters of a wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    pub interval: Duration,
    pub timeout: Duration,
    pub log: LogPolicy,
    /// Overrides the client's vocabulary when set.
    pub vocabulary: Option<StatusVocabulary>,
    pub retry: RetryPolicy,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            log: LogPolicy::default(),
            vocabulary: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl WaitOptions {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_log(mut self, log: LogPolicy) -> Self {
        self.log = log;
        self
    }

    pub fn with_vocabulary(mut self, vocabulary: StatusVocabulary) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Poll until every id is terminal, returning each id's terminal snapshot.
///
/// Duplicate ids are polled once. An empty id set is rejected.
pub async fn wait_for_workflows<S>(
    source: &S,
    ids: &[WorkflowId],
    options: &WaitOptions,
    log: &dyn StatusLog,
) -> PromethiumResult<FxHashMap<WorkflowId, Workflow>>
where
    S: StatusSource + ?Sized,
{
    let mut seen = FxHashSet::default();
    let mut pending: Vec<WorkflowId> = ids.iter().filter(|id| seen.insert(*id)).cloned().collect();
    if pending.is_empty() {
        return Err(PromethiumError::InvalidArgument(
            "at least one workflow id is required".into(),
        ));
    }

    let default_vocabulary = StatusVocabulary::default();
    let vocabulary = options.vocabulary.as_ref().unwrap_or(&default_vocabulary);
    let start = Instant::now();
    let mut last: FxHashMap<WorkflowId, WorkflowStatus> = FxHashMap::default();
    let mut warned: FxHashSet<String> = FxHashSet::default();
    let mut finished: FxHashMap<WorkflowId, Workflow> = FxHashMap::default();

    loop {
        let sweep = pending
            .iter()
            .map(|id| fetch_with_retry(source, id, options, start, &pending));
        let snapshots = try_join_all(sweep).await?;

        let mut unresolved = Vec::with_capacity(pending.len());
        for (id, workflow) in pending.iter().zip(snapshots) {
            let status = &workflow.status;

            if !vocabulary.is_known(status) && warned.insert(status.as_str().to_string()) {
                warn!(
                    "Unrecognized workflow status '{}' for {}; treating it as non-terminal",
                    status, id
                );
            }

            let changed = last.get(id) != Some(status);
            let report = match options.log {
                LogPolicy::None => false,
                LogPolicy::StateChanges => changed,
                LogPolicy::All => true,
            };
            if report {
                log.observe(id, status);
            }
            last.insert(id.clone(), status.clone());

            if vocabulary.is_terminal(status) {
                finished.insert(id.clone(), workflow);
            } else {
                unresolved.push(id.clone());
            }
        }

        pending = unresolved;
        if pending.is_empty() {
            return Ok(finished);
        }
        tokio::time::sleep(options.interval).await;
    }
}

async fn fetch_with_retry<S>(
    source: &S,
    id: &WorkflowId,
    options: &WaitOptions,
    start: Instant,
    pending: &[WorkflowId],
) -> PromethiumResult<Workflow>
where
    S: StatusSource + ?Sized,
{
    let mut attempt = 1;
    loop {
        let elapsed = start.elapsed();
        if elapsed > options.timeout {
            return Err(PromethiumError::Timeout {
                elapsed,
                pending: pending.to_vec(),
            });
        }

        match source.fetch_status(id).await {
            Ok(workflow) => return Ok(workflow),
            Err(e) if e.is_retryable() && attempt < options.retry.max_attempts => {
                warn!(
                    "Status fetch for {} failed (attempt {}/{}): {}",
                    id, attempt, options.retry.max_attempts, e
                );
                tokio::time::sleep(options.retry.backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkflowKind;
    use serde_json::Map;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn snapshot(id: &WorkflowId, status: WorkflowStatus) -> Workflow {
        Workflow {
            id: id.clone(),
            name: String::new(),
            kind: WorkflowKind::SinglePointCalculation,
            status,
            created_at: None,
            started_at: None,
            stopped_at: None,
            duration_seconds: None,
            extra: Map::new(),
        }
    }

    /// Replays a scripted status sequence per id; the last status repeats.
    #[derive(Default)]
    struct Scripted {
        scripts: Mutex<FxHashMap<WorkflowId, VecDeque<Result<WorkflowStatus, u16>>>>,
        fetches: Mutex<Vec<WorkflowId>>,
    }

    impl Scripted {
        fn script(self, id: &str, statuses: &[&str]) -> Self {
            let steps = statuses
                .iter()
                .map(|s| Ok(WorkflowStatus::from(s.to_string())))
                .collect();
            self.scripts.lock().unwrap().insert(WorkflowId::new(id), steps);
            self
        }

        fn failing(self, id: &str, steps: Vec<Result<WorkflowStatus, u16>>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(WorkflowId::new(id), steps.into());
            self
        }

        fn fetch_count(&self, id: &str) -> usize {
            self.fetches
                .lock()
                .unwrap()
                .iter()
                .filter(|f| f.as_str() == id)
                .count()
        }
    }

    #[async_trait]
    impl StatusSource for Scripted {
        async fn fetch_status(&self, id: &WorkflowId) -> PromethiumResult<Workflow> {
            self.fetches.lock().unwrap().push(id.clone());
            let mut scripts = self.scripts.lock().unwrap();
            let steps = scripts
                .get_mut(id)
                .ok_or_else(|| PromethiumError::WorkflowNotFound(id.to_string()))?;
            let step = if steps.len() > 1 {
                steps.pop_front()
            } else {
                steps.front().cloned()
            };
            match step {
                Some(Ok(status)) => Ok(snapshot(id, status)),
                Some(Err(code)) => Err(PromethiumError::Transport {
                    status: code,
                    body: String::new(),
                }),
                None => Err(PromethiumError::WorkflowNotFound(id.to_string())),
            }
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(String, String)>>);

    impl StatusLog for Recorder {
        fn observe(&self, id: &WorkflowId, status: &WorkflowStatus) {
            self.0
                .lock()
                .unwrap()
                .push((id.to_string(), status.to_string()));
        }
    }

    impl Recorder {
        fn lines(&self) -> Vec<(String, String)> {
            self.0.lock().unwrap().clone()
        }
    }

    fn ids(names: &[&str]) -> Vec<WorkflowId> {
        names.iter().map(|n| WorkflowId::new(*n)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_changes_logged_once() {
        let source = Scripted::default().script("w1", &["RUNNING", "RUNNING", "COMPLETED"]);
        let log = Recorder::default();
        let result = wait_for_workflows(&source, &ids(&["w1"]), &WaitOptions::default(), &log)
            .await
            .unwrap();

        assert_eq!(
            log.lines(),
            vec![
                ("w1".to_string(), "RUNNING".to_string()),
                ("w1".to_string(), "COMPLETED".to_string()),
            ]
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[&WorkflowId::new("w1")].status, WorkflowStatus::Completed);
        assert_eq!(source.fetch_count("w1"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_log_all_and_none() {
        let source = Scripted::default().script("w1", &["RUNNING", "RUNNING", "SUCCEEDED"]);
        let log = Recorder::default();
        let options = WaitOptions::default().with_log(LogPolicy::All);
        wait_for_workflows(&source, &ids(&["w1"]), &options, &log)
            .await
            .unwrap();
        assert_eq!(log.lines().len(), 3);

        let source = Scripted::default().script("w1", &["RUNNING", "FAILED"]);
        let log = Recorder::default();
        let options = WaitOptions::default().with_log(LogPolicy::None);
        wait_for_workflows(&source, &ids(&["w1"]), &options, &log)
            .await
            .unwrap();
        assert!(log.lines().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_without_result_map() {
        let source = Scripted::default().script("w1", &["RUNNING"]);
        let options = WaitOptions::default()
            .with_interval(Duration::from_secs(10))
            .with_timeout(Duration::from_secs(25));
        let err = wait_for_workflows(&source, &ids(&["w1"]), &options, &TracingStatusLog)
            .await
            .unwrap_err();

        match err {
            PromethiumError::Timeout { elapsed, pending } => {
                assert!(elapsed > Duration::from_secs(25));
                assert_eq!(pending, ids(&["w1"]));
            }
            other => panic!("unexpected error: {other}"),
        }
        // Sweeps at 0s, 10s and 20s; the 30s sweep gives up before fetching.
        assert_eq!(source.fetch_count("w1"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_ids_are_not_polled_again() {
        let source = Scripted::default()
            .script("fast", &["COMPLETED"])
            .script("slow", &["RUNNING", "RUNNING", "RUNNING", "CANCELED"]);
        let result = wait_for_workflows(
            &source,
            &ids(&["fast", "slow"]),
            &WaitOptions::default(),
            &TracingStatusLog,
        )
        .await
        .unwrap();

        assert_eq!(source.fetch_count("fast"), 1);
        assert_eq!(source.fetch_count("slow"), 4);
        assert_eq!(result.len(), 2);
        assert_eq!(
            result[&WorkflowId::new("slow")].status,
            WorkflowStatus::Canceled
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_without_trailing_sleep() {
        let source = Scripted::default().script("w1", &["COMPLETED"]);
        let start = Instant::now();
        wait_for_workflows(&source, &ids(&["w1"]), &WaitOptions::default(), &TracingStatusLog)
            .await
            .unwrap();
        assert!(start.elapsed() < DEFAULT_INTERVAL);
    }

    #[tokio::test]
    async fn test_empty_ids_rejected() {
        let source = Scripted::default();
        let err = wait_for_workflows(&source, &[], &WaitOptions::default(), &TracingStatusLog)
            .await
            .unwrap_err();
        assert!(matches!(err, PromethiumError::InvalidArgument(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_ids_polled_once() {
        let source = Scripted::default().script("w1", &["COMPLETED"]);
        let result = wait_for_workflows(
            &source,
            &ids(&["w1", "w1", "w1"]),
            &WaitOptions::default(),
            &TracingStatusLog,
        )
        .await
        .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(source.fetch_count("w1"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_aborts_without_retry() {
        let source = Scripted::default().failing("w1", vec![Err(503), Ok(WorkflowStatus::Completed)]);
        let err = wait_for_workflows(&source, &ids(&["w1"]), &WaitOptions::default(), &TracingStatusLog)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(source.fetch_count("w1"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_policy_recovers_server_errors() {
        let source = Scripted::default().failing(
            "w1",
            vec![Err(502), Err(503), Ok(WorkflowStatus::Completed)],
        );
        let options =
            WaitOptions::default().with_retry(RetryPolicy::new(3, Duration::from_millis(500)));
        let result = wait_for_workflows(&source, &ids(&["w1"]), &options, &TracingStatusLog)
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(source.fetch_count("w1"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_skips_client_errors() {
        let source = Scripted::default().failing("w1", vec![Err(409), Ok(WorkflowStatus::Completed)]);
        let options =
            WaitOptions::default().with_retry(RetryPolicy::new(5, Duration::from_millis(1)));
        let err = wait_for_workflows(&source, &ids(&["w1"]), &options, &TracingStatusLog)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(409));
        assert_eq!(source.fetch_count("w1"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_vocabulary() {
        let source = Scripted::default().script("w1", &["RUNNING", "ARCHIVED"]);
        let options = WaitOptions::default()
            .with_vocabulary(StatusVocabulary::default().with_terminal("ARCHIVED"));
        let result = wait_for_workflows(&source, &ids(&["w1"]), &options, &TracingStatusLog)
            .await
            .unwrap();
        assert_eq!(
            result[&WorkflowId::new("w1")].status,
            WorkflowStatus::Other("ARCHIVED".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_status_keeps_polling() {
        let source = Scripted::default().script("w1", &["QUEUED", "QUEUED", "COMPLETED"]);
        let result = wait_for_workflows(&source, &ids(&["w1"]), &WaitOptions::default(), &TracingStatusLog)
            .await
            .unwrap();
        assert_eq!(source.fetch_count("w1"), 3);
        assert_eq!(result.len(), 1);
    }
}
