//! HTTP adapter for a registry scraper running as a separate service.
//!
//! The scraper exposes `POST {url}/search`, `POST {url}/search-range` and
//! `POST {url}/monitor`, each answering a JSON array of [`CaseRecord`]s.

use async_trait::async_trait;
use casepulse_core::{BackendEndpoint, CaseRecord, Court};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::backend::{Backend, BackendCause, BackendError, Capability, UnknownCapability};

pub struct RemoteBackend {
    client: reqwest::Client,
    court: Court,
    base_url: String,
    capabilities: Vec<Capability>,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    party: &'a str,
    date: &'a str,
}

#[derive(Serialize)]
struct RangeBody<'a> {
    party: &'a str,
    start: &'a str,
    end: &'a str,
}

#[derive(Serialize)]
struct MonitorBody<'a> {
    keyword: &'a str,
    mode: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<&'a str>,
}

impl RemoteBackend {
    /// Create an adapter for `court` at `base_url` (like `http://localhost:8101`).
    ///
    /// An empty capability list means the service implements all three.
    pub fn new(court: Court, base_url: &str, capabilities: Vec<Capability>) -> Self {
        Self::with_client(reqwest::Client::new(), court, base_url, capabilities)
    }

    /// Share one connection pool between adapters.
    pub fn with_client(
        client: reqwest::Client,
        court: Court,
        base_url: &str,
        capabilities: Vec<Capability>,
    ) -> Self {
        let capabilities = if capabilities.is_empty() {
            Capability::ALL.to_vec()
        } else {
            capabilities
        };
        Self {
            client,
            court,
            base_url: base_url.trim_end_matches('/').to_string(),
            capabilities,
        }
    }

    /// Build from a configured endpoint, rejecting unknown capability names.
    pub fn from_endpoint(
        client: reqwest::Client,
        court: Court,
        endpoint: &BackendEndpoint,
    ) -> Result<Self, UnknownCapability> {
        let capabilities = endpoint
            .capabilities
            .iter()
            .map(|c| c.parse())
            .collect::<Result<Vec<Capability>, _>>()?;
        Ok(Self::with_client(client, court, &endpoint.url, capabilities))
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        debug!(court = %self.court, url = %url, "calling registry adapter");

        let err = |cause: BackendCause| BackendError::new(self.court, cause);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| err(BackendCause::Transport(e.to_string())))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(err(BackendCause::Upstream {
                status: status.as_u16(),
                body,
            }));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| err(BackendCause::Transport(e.to_string())))?;
        serde_json::from_slice(&bytes).map_err(|e| err(BackendCause::Parse(e.to_string())))
    }
}

#[async_trait]
impl Backend for RemoteBackend {
    fn court(&self) -> Court {
        self.court
    }

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    async fn search(&self, party: &str, date: &str) -> Result<Vec<CaseRecord>, BackendError> {
        if !self.supports(Capability::Search) {
            return Err(BackendError::unsupported(self.court, Capability::Search));
        }
        self.post("search", &SearchBody { party, date }).await
    }

    async fn search_range(
        &self,
        party: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<CaseRecord>, BackendError> {
        if !self.supports(Capability::SearchRange) {
            return Err(BackendError::unsupported(self.court, Capability::SearchRange));
        }
        self.post("search-range", &RangeBody { party, start, end })
            .await
    }

    async fn monitor(
        &self,
        keyword: &str,
        mode: &str,
        year: Option<&str>,
    ) -> Result<Vec<CaseRecord>, BackendError> {
        if !self.supports(Capability::Monitor) {
            return Err(BackendError::unsupported(self.court, Capability::Monitor));
        }
        self.post("monitor", &MonitorBody { keyword, mode, year })
            .await
    }
}
