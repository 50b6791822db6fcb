//! Fan-out search across the registered backends.
//!
//! One [`SearchCriteria`] becomes one call per selected backend. Calls run
//! concurrently, each under its own timeout; results are concatenated in
//! registration order (supreme, delhi, bombay, then nclat/cerc when selected
//! alone), each backend's own ordering preserved. No deduplication and no
//! cross-backend sorting.
//!
//! Date handling is deliberately asymmetric:
//! - `court = "all"`: every backend gets the date in its own native format.
//! - one named court: the caller's string is passed through unchanged, so
//!   callers already holding a backend-native date can bypass normalisation.
//!   The tribunal is the exception; its lenient normaliser always runs and is
//!   idempotent on tribunal-native input.
//!
//! A failing, timed-out or missing backend contributes zero records and is
//! reported in [`Dispatch::failures`]; it never aborts the others.

use std::time::Duration;

use casepulse_core::{
    CaseRecord, Court, CourtSelector, DateError, SearchCriteria, SearchWindow, Settings,
    normalize,
};
use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::backend::{Backend, BackendCause, BackendError, Backends, Capability};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    InvalidDate(#[from] DateError),
}

#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Per-backend call timeout. Expiry is treated as a backend failure.
    pub timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&Settings> for DispatchConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            timeout: settings.backend_timeout(),
        }
    }
}

/// Merged result of one search: records grouped by backend, plus the
/// backends that contributed nothing because they failed.
#[derive(Debug, Default)]
pub struct Dispatch {
    pub records: Vec<CaseRecord>,
    pub failures: Vec<BackendError>,
}

impl Dispatch {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Regulatory-commission search result.
///
/// `degraded` is set when the backend failed; `results` is then empty, which
/// lets callers tell "no data" apart from "backend down".
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommissionResults {
    pub results: Vec<CaseRecord>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

/// A backend call with dates already in that backend's format.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Single(String),
    Range(String, String),
}

pub struct Dispatcher {
    backends: Backends,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(backends: Backends, config: DispatchConfig) -> Self {
        Self { backends, config }
    }

    /// Courts with a registered backend, in registration order.
    pub fn registered(&self) -> Vec<Court> {
        self.backends.courts()
    }

    /// Run one search across every backend selected by `criteria.court`.
    ///
    /// Only an unparseable date fails the request, and it does so before any
    /// backend is called. A single-date search without a date returns an
    /// empty result without calling anything.
    pub async fn search(&self, criteria: &SearchCriteria) -> Result<Dispatch, DispatchError> {
        let plan = plan(criteria)?;
        if plan.is_empty() {
            return Ok(Dispatch::default());
        }

        info!(
            court = %criteria.court,
            backends = plan.len(),
            "dispatching search"
        );

        let party = criteria.party_name.as_str();
        let outcomes = join_all(
            plan.iter()
                .map(|(court, call)| self.invoke(*court, call, party)),
        )
        .await;

        let mut dispatch = Dispatch::default();
        for ((court, _), outcome) in plan.iter().zip(outcomes) {
            match outcome {
                Ok(records) => {
                    info!(court = %court, count = records.len(), "backend returned");
                    dispatch.records.extend(records);
                }
                Err(e) => {
                    warn!(court = %e.court, error = %e.cause, "backend failed; contributing no records");
                    dispatch.failures.push(e);
                }
            }
        }
        Ok(dispatch)
    }

    /// Regulatory-commission search by month and party.
    ///
    /// Never fails: a backend failure degrades to an empty result with the
    /// cause in [`CommissionResults::degraded`].
    pub async fn search_commission(&self, month: &str, party: &str) -> CommissionResults {
        let outcome = self
            .invoke(Court::Cerc, &Call::Single(month.to_string()), party)
            .await;
        match outcome {
            Ok(results) => {
                info!(court = %Court::Cerc, count = results.len(), "commission search returned");
                CommissionResults {
                    count: results.len(),
                    results,
                    degraded: None,
                }
            }
            Err(e) => {
                warn!(court = %e.court, error = %e.cause, "commission search failed");
                CommissionResults {
                    degraded: Some(e.to_string()),
                    ..CommissionResults::default()
                }
            }
        }
    }

    async fn invoke(
        &self,
        court: Court,
        call: &Call,
        party: &str,
    ) -> Result<Vec<CaseRecord>, BackendError> {
        let Some(backend) = self.backends.get(court) else {
            return Err(BackendError::new(court, BackendCause::NotRegistered));
        };
        let fut = call_backend(&**backend, call, party);
        match tokio::time::timeout(self.config.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::new(
                court,
                BackendCause::Timeout(self.config.timeout),
            )),
        }
    }
}

async fn call_backend(
    backend: &dyn Backend,
    call: &Call,
    party: &str,
) -> Result<Vec<CaseRecord>, BackendError> {
    match call {
        Call::Single(date) => {
            if backend.supports(Capability::Search) {
                backend.search(party, date).await
            } else if backend.supports(Capability::SearchRange) {
                // Range-only registries (the tribunal) answer single dates as a
                // one-day range.
                backend.search_range(party, date, date).await
            } else {
                Err(BackendError::unsupported(backend.court(), Capability::Search))
            }
        }
        Call::Range(start, end) => backend.search_range(party, start, end).await,
    }
}

/// Per-backend calls for `criteria`, in registration order, dates normalised.
fn plan(criteria: &SearchCriteria) -> Result<Vec<(Court, Call)>, DateError> {
    let selector = criteria.court;
    let mut calls = Vec::new();
    match &criteria.window {
        SearchWindow::Single { date } => {
            let Some(date) = date.as_deref().filter(|d| !d.trim().is_empty()) else {
                return Ok(calls);
            };
            for court in selector.courts() {
                calls.push((court, Call::Single(date_for(court, selector, date)?)));
            }
        }
        SearchWindow::Range { start, end } => {
            for court in selector.courts() {
                calls.push((
                    court,
                    Call::Range(
                        date_for(court, selector, start)?,
                        date_for(court, selector, end)?,
                    ),
                ));
            }
        }
    }
    Ok(calls)
}

fn date_for(court: Court, selector: CourtSelector, date: &str) -> Result<String, DateError> {
    if selector.is_all() || court == Court::Nclat {
        normalize(court, date)
    } else {
        Ok(date.to_string())
    }
}
