//! Change detection for watched keywords.
//!
//! A poll re-scrapes the backend's full current result set, compares it with
//! the stored snapshot for the key, and reports what is new. Comparison is
//! structural over the whole ordered sequence: any difference at all counts
//! as a change, and the snapshot is then replaced wholesale by the current
//! set. Nothing is written when the sets are identical.
//!
//! With [`DiffMode::Structural`], a record whose status string changed shows
//! up as brand new and its old version silently drops out of the snapshot.
//! [`DiffMode::Identity`] additionally reports [`Change`]s keyed by
//! `(court, case_number)` so callers can tell updates from additions.
//!
//! Polls of the same key are expected to be serialised by the caller; two
//! concurrent polls of one key both read the old snapshot and the last
//! writer wins.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use casepulse_core::{CaseRecord, CoreError, Court, DiffMode, MonitorKey, Settings, Snapshot};
use casepulse_store::{SnapshotStore, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::backend::{BackendCause, BackendError, Backends, Capability};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    InvalidKey(#[from] CoreError),

    #[error("no {0} backend registered")]
    NoBackend(Court),

    #[error("{0} backend does not support monitoring")]
    Unsupported(Court),

    #[error("snapshot worker failed: {0}")]
    Worker(String),
}

#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    pub timeout: Duration,
    pub diff_mode: DiffMode,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            diff_mode: DiffMode::Structural,
        }
    }
}

impl From<&Settings> for MonitorConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            timeout: settings.backend_timeout(),
            diff_mode: settings.diff_mode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    /// Current scrape identical to the snapshot; nothing written.
    Unchanged,
    /// Snapshot replaced with the current scrape.
    Updated,
    /// Backend failed; snapshot untouched.
    Degraded,
}

/// One identity-keyed difference between two polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum Change {
    Added { record: CaseRecord },
    Updated { old: CaseRecord, new: CaseRecord },
    Removed { record: CaseRecord },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub new_items: Vec<CaseRecord>,
    /// Empty in [`DiffMode::Structural`].
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollOutcome {
    pub status: PollStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub new_items: Vec<CaseRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<Change>,
    /// Size of the current result set (zero when degraded).
    pub total: usize,
    /// Snapshot file for the key.
    pub file: String,
}

/// Regional case-status results.
///
/// `degraded` is set when the backend failed and `records` is then empty.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusResults {
    pub records: Vec<CaseRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

pub struct Monitor {
    backends: Backends,
    store: SnapshotStore,
    config: MonitorConfig,
}

impl Monitor {
    pub fn new(backends: Backends, store: SnapshotStore, config: MonitorConfig) -> Self {
        Self {
            backends,
            store,
            config,
        }
    }

    /// Poll `key` once and persist the current result set if it changed.
    ///
    /// Backend failures degrade to [`PollStatus::Degraded`] without touching
    /// the snapshot. Snapshot read or write failures are errors: they are
    /// never reported as "unchanged".
    pub async fn poll(&self, key: &MonitorKey) -> Result<PollOutcome, MonitorError> {
        let file = key.file_name();
        let current = match self.scrape(key).await? {
            Ok(records) => records,
            Err(e) => {
                warn!(court = %e.court, error = %e.cause, key = %file, "monitor scrape failed");
                return Ok(PollOutcome {
                    status: PollStatus::Degraded,
                    message: e.to_string(),
                    new_items: Vec::new(),
                    changes: Vec::new(),
                    total: 0,
                    file,
                });
            }
        };

        let previous = self.load(&file).await?.unwrap_or_default();
        if current == previous {
            info!(key = %file, total = current.len(), "no change");
            return Ok(PollOutcome {
                status: PollStatus::Unchanged,
                message: "No new updates".to_string(),
                new_items: Vec::new(),
                changes: Vec::new(),
                total: current.len(),
                file,
            });
        }

        let delta = diff(&previous, &current, self.config.diff_mode);
        let total = current.len();
        self.save(&file, current).await?;
        info!(
            key = %file,
            new = delta.new_items.len(),
            total,
            "snapshot updated"
        );

        Ok(PollOutcome {
            status: PollStatus::Updated,
            message: "New judgments found".to_string(),
            new_items: delta.new_items,
            changes: delta.changes,
            total,
            file,
        })
    }

    /// Fresh Delhi High Court case-status query, not snapshot-backed.
    ///
    /// Consumers that want deltas for this jurisdiction poll a
    /// [`MonitorKey`] with `court = delhi` instead.
    pub async fn status(
        &self,
        keyword: &str,
        mode: &str,
        year: Option<&str>,
    ) -> Result<StatusResults, MonitorError> {
        let key =
            MonitorKey::new(Court::Delhi, keyword, Some(mode))?.with_year(year.map(str::to_string));
        match self.scrape(&key).await? {
            Ok(records) => {
                info!(court = %Court::Delhi, count = records.len(), "status query returned");
                Ok(StatusResults {
                    records,
                    degraded: None,
                })
            }
            Err(e) => {
                warn!(court = %e.court, error = %e.cause, "status query failed");
                Ok(StatusResults {
                    records: Vec::new(),
                    degraded: Some(e.to_string()),
                })
            }
        }
    }

    /// Saved snapshot file names, sorted.
    pub async fn saved(&self) -> Result<Vec<String>, MonitorError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.list())
            .await
            .map_err(|e| MonitorError::Worker(e.to_string()))?
            .map_err(MonitorError::from)
    }

    /// Outer error: configuration problem. Inner error: backend failure.
    async fn scrape(
        &self,
        key: &MonitorKey,
    ) -> Result<Result<Vec<CaseRecord>, BackendError>, MonitorError> {
        let backend = self
            .backends
            .get(key.court)
            .ok_or(MonitorError::NoBackend(key.court))?;
        if !backend.supports(Capability::Monitor) {
            return Err(MonitorError::Unsupported(key.court));
        }
        let fut = backend.monitor(&key.keyword, &key.mode, key.year.as_deref());
        Ok(match tokio::time::timeout(self.config.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::new(
                key.court,
                BackendCause::Timeout(self.config.timeout),
            )),
        })
    }

    async fn load(&self, file: &str) -> Result<Option<Snapshot>, MonitorError> {
        let store = self.store.clone();
        let file = file.to_string();
        tokio::task::spawn_blocking(move || store.load(&file))
            .await
            .map_err(|e| MonitorError::Worker(e.to_string()))?
            .map_err(MonitorError::from)
    }

    async fn save(&self, file: &str, snapshot: Snapshot) -> Result<(), MonitorError> {
        let store = self.store.clone();
        let file = file.to_string();
        tokio::task::spawn_blocking(move || store.save(&file, &snapshot))
            .await
            .map_err(|e| MonitorError::Worker(e.to_string()))?
            .map_err(MonitorError::from)
    }
}

/// Compute what `current` adds over `previous`.
///
/// `new_items` holds, in current order, every record with no structurally
/// equal record anywhere in `previous` (structural mode), or every added or
/// updated record (identity mode).
pub fn diff(previous: &[CaseRecord], current: &[CaseRecord], mode: DiffMode) -> Delta {
    match mode {
        DiffMode::Structural => Delta {
            new_items: current
                .iter()
                .filter(|record| !previous.contains(record))
                .cloned()
                .collect(),
            changes: Vec::new(),
        },
        DiffMode::Identity => identity_diff(previous, current),
    }
}

fn identity_diff(previous: &[CaseRecord], current: &[CaseRecord]) -> Delta {
    // Records sharing an identity are paired up in order of appearance.
    let mut pending: HashMap<(Court, &str), VecDeque<&CaseRecord>> = HashMap::new();
    for record in previous {
        pending.entry(record.identity()).or_default().push_back(record);
    }

    let mut delta = Delta::default();
    for record in current {
        let old = pending
            .get_mut(&record.identity())
            .and_then(VecDeque::pop_front);
        match old {
            None => {
                delta.new_items.push(record.clone());
                delta.changes.push(Change::Added {
                    record: record.clone(),
                });
            }
            Some(old) if old == record => {}
            Some(old) => {
                delta.new_items.push(record.clone());
                delta.changes.push(Change::Updated {
                    old: old.clone(),
                    new: record.clone(),
                });
            }
        }
    }

    // Whatever is left unpaired was dropped upstream; report in previous order.
    for record in previous {
        if let Some(queue) = pending.get_mut(&record.identity()) {
            if queue.front().is_some_and(|r| std::ptr::eq(*r, record)) {
                queue.pop_front();
                delta.changes.push(Change::Removed {
                    record: record.clone(),
                });
            }
        }
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use async_trait::async_trait;
    use casepulse_core::{CaseDetails, DelhiStatus};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Backend whose monitor answer the test controls between polls.
    #[derive(Clone)]
    struct Scripted {
        court: Court,
        answer: Arc<Mutex<Result<Vec<CaseRecord>, BackendCause>>>,
        calls: Arc<Mutex<Vec<(String, String, Option<String>)>>>,
    }

    impl Scripted {
        fn new(court: Court, records: Vec<CaseRecord>) -> Self {
            Self {
                court,
                answer: Arc::new(Mutex::new(Ok(records))),
                calls: Arc::default(),
            }
        }

        fn set(&self, records: Vec<CaseRecord>) {
            *self.answer.lock().unwrap() = Ok(records);
        }

        fn fail(&self) {
            *self.answer.lock().unwrap() = Err(BackendCause::Transport("portal down".into()));
        }
    }

    #[async_trait]
    impl Backend for Scripted {
        fn court(&self) -> Court {
            self.court
        }

        fn supports(&self, capability: Capability) -> bool {
            capability == Capability::Monitor
        }

        async fn monitor(
            &self,
            keyword: &str,
            mode: &str,
            year: Option<&str>,
        ) -> Result<Vec<CaseRecord>, BackendError> {
            self.calls.lock().unwrap().push((
                keyword.to_string(),
                mode.to_string(),
                year.map(str::to_string),
            ));
            self.answer
                .lock()
                .unwrap()
                .clone()
                .map_err(|cause| BackendError::new(self.court, cause))
        }
    }

    fn case(n: &str) -> CaseRecord {
        CaseDetails::new(Court::Supreme, n)
            .with_parties("Acme Ltd", "Union of India")
            .with_date("2024-03-05")
            .into()
    }

    fn setup(backend: &Scripted, mode: DiffMode) -> (TempDir, SnapshotStore, Monitor) {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::open(tmp.path()).unwrap();
        let mut backends = Backends::new();
        backends.register(backend.clone());
        let config = MonitorConfig {
            diff_mode: mode,
            ..MonitorConfig::default()
        };
        let monitor = Monitor::new(backends, store.clone(), config);
        (tmp, store, monitor)
    }

    fn key() -> MonitorKey {
        MonitorKey::new(Court::Supreme, "acme ltd", None).unwrap()
    }

    #[tokio::test]
    async fn first_poll_saves_everything_as_new() {
        let backend = Scripted::new(Court::Supreme, vec![case("1"), case("2")]);
        let (_tmp, store, monitor) = setup(&backend, DiffMode::Structural);

        let out = monitor.poll(&key()).await.unwrap();

        assert_eq!(out.status, PollStatus::Updated);
        assert_eq!(out.new_items, vec![case("1"), case("2")]);
        assert_eq!(out.total, 2);
        assert_eq!(out.file, "acme_ltd_party.json");
        assert_eq!(
            store.load("acme_ltd_party.json").unwrap(),
            Some(vec![case("1"), case("2")])
        );
        assert_eq!(
            backend.calls.lock().unwrap().as_slice(),
            &[("acme ltd".to_string(), "party".to_string(), None)]
        );
    }

    #[tokio::test]
    async fn second_identical_poll_is_unchanged_and_writes_nothing() {
        let backend = Scripted::new(Court::Supreme, vec![case("1"), case("2")]);
        let (tmp, _store, monitor) = setup(&backend, DiffMode::Structural);
        monitor.poll(&key()).await.unwrap();
        let path = tmp.path().join("acme_ltd_party.json");
        // Replace the file contents with an equal but differently formatted
        // document; an unchanged poll must leave it byte-for-byte alone.
        let compact = serde_json::to_string(&vec![case("1"), case("2")]).unwrap();
        std::fs::write(&path, &compact).unwrap();

        let out = monitor.poll(&key()).await.unwrap();

        assert_eq!(out.status, PollStatus::Unchanged);
        assert!(out.new_items.is_empty());
        assert_eq!(out.total, 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), compact);
    }

    #[tokio::test]
    async fn appended_record_is_the_only_new_item() {
        let backend = Scripted::new(Court::Supreme, vec![case("a"), case("b")]);
        let (_tmp, store, monitor) = setup(&backend, DiffMode::Structural);
        monitor.poll(&key()).await.unwrap();

        backend.set(vec![case("a"), case("b"), case("c")]);
        let out = monitor.poll(&key()).await.unwrap();

        assert_eq!(out.status, PollStatus::Updated);
        assert_eq!(out.new_items, vec![case("c")]);
        assert_eq!(out.total, 3);
        assert_eq!(
            store.load(&out.file).unwrap(),
            Some(vec![case("a"), case("b"), case("c")])
        );
    }

    #[tokio::test]
    async fn field_change_counts_as_new_and_replaces_old() {
        let a = case("a");
        let a_prime: CaseRecord = CaseDetails::new(Court::Supreme, "a")
            .with_parties("Acme Ltd", "Union of India")
            .with_date("2024-04-01")
            .into();
        let backend = Scripted::new(Court::Supreme, vec![a.clone()]);
        let (_tmp, store, monitor) = setup(&backend, DiffMode::Structural);
        monitor.poll(&key()).await.unwrap();

        backend.set(vec![a_prime.clone()]);
        let out = monitor.poll(&key()).await.unwrap();

        assert_eq!(out.status, PollStatus::Updated);
        assert_eq!(out.new_items, vec![a_prime.clone()]);
        assert!(out.changes.is_empty());
        assert_eq!(store.load(&out.file).unwrap(), Some(vec![a_prime]));
    }

    #[tokio::test]
    async fn reorder_is_a_change_without_new_items() {
        let backend = Scripted::new(Court::Supreme, vec![case("a"), case("b")]);
        let (_tmp, store, monitor) = setup(&backend, DiffMode::Structural);
        monitor.poll(&key()).await.unwrap();

        backend.set(vec![case("b"), case("a")]);
        let out = monitor.poll(&key()).await.unwrap();

        assert_eq!(out.status, PollStatus::Updated);
        assert!(out.new_items.is_empty());
        assert_eq!(
            store.load(&out.file).unwrap(),
            Some(vec![case("b"), case("a")])
        );
    }

    #[tokio::test]
    async fn backend_failure_degrades_and_keeps_snapshot() {
        let backend = Scripted::new(Court::Supreme, vec![case("a")]);
        let (_tmp, store, monitor) = setup(&backend, DiffMode::Structural);
        monitor.poll(&key()).await.unwrap();

        backend.fail();
        let out = monitor.poll(&key()).await.unwrap();

        assert_eq!(out.status, PollStatus::Degraded);
        assert!(out.message.contains("portal down"));
        assert_eq!(out.total, 0);
        assert_eq!(store.load(&out.file).unwrap(), Some(vec![case("a")]));
    }

    #[tokio::test]
    async fn corrupt_snapshot_fails_the_poll() {
        let backend = Scripted::new(Court::Supreme, vec![case("a")]);
        let (tmp, _store, monitor) = setup(&backend, DiffMode::Structural);
        std::fs::write(tmp.path().join("acme_ltd_party.json"), "[{").unwrap();

        let err = monitor.poll(&key()).await.unwrap_err();

        assert!(matches!(err, MonitorError::Store(StoreError::Json { .. })));
    }

    #[tokio::test]
    async fn empty_first_poll_is_unchanged() {
        let backend = Scripted::new(Court::Supreme, vec![]);
        let (_tmp, store, monitor) = setup(&backend, DiffMode::Structural);

        let out = monitor.poll(&key()).await.unwrap();

        assert_eq!(out.status, PollStatus::Unchanged);
        assert!(store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unregistered_court_is_an_error() {
        let backend = Scripted::new(Court::Supreme, vec![]);
        let (_tmp, _store, monitor) = setup(&backend, DiffMode::Structural);
        let bombay = MonitorKey::new(Court::Bombay, "acme", None).unwrap();

        let err = monitor.poll(&bombay).await.unwrap_err();

        assert!(matches!(err, MonitorError::NoBackend(Court::Bombay)));
    }

    #[tokio::test]
    async fn identity_mode_reports_updates_and_removals() {
        let a = case("a");
        let a_prime: CaseRecord = CaseDetails::new(Court::Supreme, "a")
            .with_parties("Acme Ltd", "Union of India")
            .with_date("2024-04-01")
            .into();
        let backend = Scripted::new(Court::Supreme, vec![a.clone(), case("b")]);
        let (_tmp, store, monitor) = setup(&backend, DiffMode::Identity);
        monitor.poll(&key()).await.unwrap();

        backend.set(vec![a_prime.clone(), case("c")]);
        let out = monitor.poll(&key()).await.unwrap();

        assert_eq!(out.new_items, vec![a_prime.clone(), case("c")]);
        assert_eq!(
            out.changes,
            vec![
                Change::Updated {
                    old: a,
                    new: a_prime.clone()
                },
                Change::Added { record: case("c") },
                Change::Removed { record: case("b") },
            ]
        );
        assert_eq!(
            store.load(&out.file).unwrap(),
            Some(vec![a_prime, case("c")])
        );
    }

    #[test]
    fn identity_diff_pairs_duplicates_in_order() {
        let prev = vec![case("x"), case("x")];
        let curr = vec![case("x")];
        let delta = diff(&prev, &curr, DiffMode::Identity);
        assert!(delta.new_items.is_empty());
        assert_eq!(delta.changes, vec![Change::Removed { record: case("x") }]);
    }

    #[test]
    fn structural_diff_ignores_position() {
        let delta = diff(
            &[case("a"), case("b")],
            &[case("b"), case("c"), case("a")],
            DiffMode::Structural,
        );
        assert_eq!(delta.new_items, vec![case("c")]);
    }

    #[test]
    fn same_number_in_different_courts_is_distinct() {
        let supreme = case("1/2024");
        let delhi: CaseRecord = CaseDetails::new(Court::Delhi, "1/2024")
            .with_parties("Acme Ltd", "Union of India")
            .with_date("2024-03-05")
            .into();
        let delta = diff(&[supreme], &[delhi.clone()], DiffMode::Identity);
        assert_eq!(delta.changes.len(), 2);
        assert_eq!(delta.changes[0], Change::Added { record: delhi });
    }

    fn status_record() -> CaseRecord {
        DelhiStatus {
            case_number: "W.P.(C) 1234/2024".into(),
            status: Some("Pending".into()),
            petitioner: "Acme Ltd".into(),
            respondent: "GNCTD".into(),
            advocates: "R. Sharma".into(),
            listing_info: "NEXT DATE: 12.04.2024".into(),
            court: Court::Delhi,
            court_no: Some("12".into()),
            order_link: None,
            judgment_link: None,
        }
        .into()
    }

    #[tokio::test]
    async fn status_query_is_stateless() {
        let backend = Scripted::new(Court::Delhi, vec![status_record()]);
        let (_tmp, store, monitor) = setup(&backend, DiffMode::Structural);

        let out = monitor.status(" acme ", "party", Some("2024")).await.unwrap();

        assert_eq!(out.records, vec![status_record()]);
        assert!(out.degraded.is_none());
        assert!(store.list().unwrap().is_empty(), "status never writes");
        assert_eq!(
            backend.calls.lock().unwrap().as_slice(),
            &[(
                "acme".to_string(),
                "party".to_string(),
                Some("2024".to_string())
            )]
        );
    }

    #[tokio::test]
    async fn status_failure_degrades_to_empty() {
        let backend = Scripted::new(Court::Delhi, vec![]);
        backend.fail();
        let (_tmp, _store, monitor) = setup(&backend, DiffMode::Structural);

        let out = monitor.status("acme", "party", None).await.unwrap();

        assert!(out.records.is_empty());
        assert!(out.degraded.is_some());
    }

    #[tokio::test]
    async fn delhi_deltas_use_their_own_key() {
        let backend = Scripted::new(Court::Delhi, vec![status_record()]);
        let (_tmp, _store, monitor) = setup(&backend, DiffMode::Structural);
        let key = MonitorKey::new(Court::Delhi, "acme", None)
            .unwrap()
            .with_year(Some("2024".into()));

        let out = monitor.poll(&key).await.unwrap();

        assert_eq!(out.file, "delhi_acme_party_2024.json");
        assert_eq!(monitor.saved().await.unwrap(), vec![out.file]);
    }

    #[tokio::test]
    async fn status_rejects_blank_keyword_without_calling_backend() {
        let backend = Scripted::new(Court::Delhi, vec![status_record()]);
        let (_tmp, _store, monitor) = setup(&backend, DiffMode::Structural);

        let err = monitor.status("   ", "party", None).await.unwrap_err();

        assert!(matches!(err, MonitorError::InvalidKey(CoreError::EmptyKeyword)));
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_blank_mode_defaults_to_party() {
        let backend = Scripted::new(Court::Delhi, vec![status_record()]);
        let (_tmp, _store, monitor) = setup(&backend, DiffMode::Structural);

        monitor.status("acme", " ", Some("")).await.unwrap();

        assert_eq!(
            backend.calls.lock().unwrap().as_slice(),
            &[("acme".to_string(), "party".to_string(), None)]
        );
    }

    #[tokio::test]
    async fn snapshot_without_kind_is_compared_not_rejected() {
        let backend = Scripted::new(Court::Supreme, vec![case("1"), case("2")]);
        let (tmp, store, monitor) = setup(&backend, DiffMode::Structural);
        std::fs::write(
            tmp.path().join("acme_ltd_party.json"),
            r#"[{"case_number": "1", "petitioner": "Acme Ltd", "respondent": "Union of India",
                 "advocates": "", "court": "supreme", "judge": null, "court_no": null,
                 "date": "2024-03-05"}]"#,
        )
        .unwrap();

        let out = monitor.poll(&key()).await.unwrap();

        assert_eq!(out.status, PollStatus::Updated);
        assert_eq!(out.new_items, vec![case("2")]);
        assert_eq!(
            store.load("acme_ltd_party.json").unwrap(),
            Some(vec![case("1"), case("2")])
        );
    }
}
