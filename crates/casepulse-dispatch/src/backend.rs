//! Backend adapter contract.
//!
//! Each registry module exposes up to three capabilities (`search`,
//! `search_range`, `monitor`); any subset may be implemented. Unimplemented
//! capabilities answer [`BackendCause::Unsupported`]. Adapters do not retry.
//!
//! Adapters that can only block implement [`BlockingBackend`] and are wrapped
//! in [`Blocking`], which runs each call on a bounded pool of blocking threads
//! so request-handling tasks are never starved.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use casepulse_core::{CaseRecord, Court};
use thiserror::Error;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Search,
    SearchRange,
    Monitor,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::Search,
        Capability::SearchRange,
        Capability::Monitor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Search => "search",
            Capability::SearchRange => "search_range",
            Capability::Monitor => "monitor",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown capability: {0:?}")]
pub struct UnknownCapability(pub String);

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "search" => Ok(Capability::Search),
            "search_range" | "search-range" => Ok(Capability::SearchRange),
            "monitor" => Ok(Capability::Monitor),
            other => Err(UnknownCapability(other.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendCause {
    #[error("{0} is not supported")]
    Unsupported(Capability),

    #[error("no backend registered")]
    NotRegistered,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("worker failed: {0}")]
    Worker(String),
}

/// Any adapter-level failure, tagged with the backend it came from.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{court} backend failed: {cause}")]
pub struct BackendError {
    pub court: Court,
    #[source]
    pub cause: BackendCause,
}

impl BackendError {
    pub fn new(court: Court, cause: BackendCause) -> Self {
        Self { court, cause }
    }

    pub fn unsupported(court: Court, capability: Capability) -> Self {
        Self::new(court, BackendCause::Unsupported(capability))
    }
}

/// A registry adapter.
///
/// Dates arrive already in the backend's native literal format.
/// `monitor` is a full stateless re-scrape: it returns the complete current
/// result set for the keyword, never a delta.
#[async_trait]
pub trait Backend: Send + Sync {
    fn court(&self) -> Court;

    fn supports(&self, capability: Capability) -> bool;

    async fn search(&self, _party: &str, _date: &str) -> Result<Vec<CaseRecord>, BackendError> {
        Err(BackendError::unsupported(self.court(), Capability::Search))
    }

    async fn search_range(
        &self,
        _party: &str,
        _start: &str,
        _end: &str,
    ) -> Result<Vec<CaseRecord>, BackendError> {
        Err(BackendError::unsupported(self.court(), Capability::SearchRange))
    }

    async fn monitor(
        &self,
        _keyword: &str,
        _mode: &str,
        _year: Option<&str>,
    ) -> Result<Vec<CaseRecord>, BackendError> {
        Err(BackendError::unsupported(self.court(), Capability::Monitor))
    }
}

/// Blocking counterpart of [`Backend`] for adapters without async I/O.
pub trait BlockingBackend: Send + Sync + 'static {
    fn court(&self) -> Court;

    fn supports(&self, capability: Capability) -> bool;

    fn search(&self, _party: &str, _date: &str) -> Result<Vec<CaseRecord>, BackendError> {
        Err(BackendError::unsupported(self.court(), Capability::Search))
    }

    fn search_range(
        &self,
        _party: &str,
        _start: &str,
        _end: &str,
    ) -> Result<Vec<CaseRecord>, BackendError> {
        Err(BackendError::unsupported(self.court(), Capability::SearchRange))
    }

    fn monitor(
        &self,
        _keyword: &str,
        _mode: &str,
        _year: Option<&str>,
    ) -> Result<Vec<CaseRecord>, BackendError> {
        Err(BackendError::unsupported(self.court(), Capability::Monitor))
    }
}

/// Bounded pool for blocking adapter calls.
///
/// A call that outlives its dispatcher timeout keeps its permit until the
/// blocking thread returns.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Run `f` on a blocking thread once a worker slot is free.
    pub async fn run<T, F>(&self, court: Court, f: F) -> Result<T, BackendError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, BackendError> + Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| BackendError::new(court, BackendCause::Worker(e.to_string())))?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await
        .map_err(|e| BackendError::new(court, BackendCause::Worker(e.to_string())))?
    }
}

/// Adapts a [`BlockingBackend`] to the async [`Backend`] contract.
pub struct Blocking<B> {
    inner: Arc<B>,
    pool: WorkerPool,
}

impl<B: BlockingBackend> Blocking<B> {
    pub fn new(inner: B, pool: WorkerPool) -> Self {
        Self {
            inner: Arc::new(inner),
            pool,
        }
    }
}

#[async_trait]
impl<B: BlockingBackend> Backend for Blocking<B> {
    fn court(&self) -> Court {
        self.inner.court()
    }

    fn supports(&self, capability: Capability) -> bool {
        self.inner.supports(capability)
    }

    async fn search(&self, party: &str, date: &str) -> Result<Vec<CaseRecord>, BackendError> {
        let inner = Arc::clone(&self.inner);
        let (party, date) = (party.to_string(), date.to_string());
        self.pool
            .run(self.court(), move || inner.search(&party, &date))
            .await
    }

    async fn search_range(
        &self,
        party: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<CaseRecord>, BackendError> {
        let inner = Arc::clone(&self.inner);
        let (party, start, end) = (party.to_string(), start.to_string(), end.to_string());
        self.pool
            .run(self.court(), move || inner.search_range(&party, &start, &end))
            .await
    }

    async fn monitor(
        &self,
        keyword: &str,
        mode: &str,
        year: Option<&str>,
    ) -> Result<Vec<CaseRecord>, BackendError> {
        let inner = Arc::clone(&self.inner);
        let (keyword, mode) = (keyword.to_string(), mode.to_string());
        let year = year.map(str::to_string);
        self.pool
            .run(self.court(), move || {
                inner.monitor(&keyword, &mode, year.as_deref())
            })
            .await
    }
}

/// Registered backends, one per court, iterated in registration order.
#[derive(Clone, Default)]
pub struct Backends {
    by_court: BTreeMap<Court, Arc<dyn Backend>>,
}

impl Backends {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its own court, replacing any previous one.
    pub fn register(&mut self, backend: impl Backend + 'static) -> &mut Self {
        self.insert(Arc::new(backend))
    }

    pub fn insert(&mut self, backend: Arc<dyn Backend>) -> &mut Self {
        let court = backend.court();
        if self.by_court.insert(court, backend).is_some() {
            tracing::warn!(court = %court, "replaced previously registered backend");
        }
        self
    }

    pub fn get(&self, court: Court) -> Option<&Arc<dyn Backend>> {
        self.by_court.get(&court)
    }

    /// Registered courts in registration order.
    pub fn courts(&self) -> Vec<Court> {
        self.by_court.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_court.is_empty()
    }
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.by_court.keys()).finish()
    }
}
