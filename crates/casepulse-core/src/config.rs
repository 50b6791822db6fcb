//! Layered configuration.
//!
//! Sources, lowest precedence first:
//! - built-in defaults
//! - a TOML file (`casepulse.toml` in the working directory unless a path is given)
//! - environment variables prefixed with `CASEPULSE_`, nested with `__`:
//!   - `CASEPULSE_DATA_DIR=/var/lib/casepulse`
//!   - `CASEPULSE_BACKEND_TIMEOUT_SECS=10`
//!   - `CASEPULSE_BACKENDS__DELHI__URL=http://localhost:8101`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "casepulse.toml";

/// How the monitor reports what changed between two polls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffMode {
    /// A record is new unless an identical record was in the last snapshot.
    #[default]
    Structural,
    /// Also classify changes as added, updated or removed by `(court, case_number)`.
    Identity,
}

/// A remote adapter for one registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendEndpoint {
    pub url: String,
    /// Capability names (`search`, `search_range`, `monitor`). Empty means all.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding one snapshot file per monitor key.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Upper bound on a single backend call; expiry counts as a backend failure.
    #[serde(default = "default_backend_timeout_secs")]
    pub backend_timeout_secs: u64,

    #[serde(default)]
    pub diff_mode: DiffMode,

    /// Remote adapters keyed by court name.
    #[serde(default)]
    pub backends: BTreeMap<String, BackendEndpoint>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("monitor_data")
}

fn default_backend_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend_timeout_secs: default_backend_timeout_secs(),
            diff_mode: DiffMode::default(),
            backends: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load from `casepulse.toml` (if present) and the environment.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from the given TOML file (missing files are skipped) and the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        let settings: Settings = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("CASEPULSE_").split("__"))
            .extract()
            .map_err(Box::new)?;
        tracing::debug!(
            data_dir = %settings.data_dir.display(),
            backends = settings.backends.len(),
            "configuration loaded"
        );
        Ok(settings)
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs.max(1))
    }
}
