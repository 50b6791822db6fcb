//! Query dispatch and change detection over independent registry backends.
//!
//! - [`backend`]: the adapter contract every registry module implements
//! - [`dispatcher`]: fan-out search with per-backend date normalisation and
//!   failure isolation
//! - [`monitor`]: snapshot-backed change detection for watched keywords

pub mod backend;
pub mod dispatcher;
pub mod monitor;

#[cfg(feature = "http")]
pub mod http;

pub use backend::{
    Backend, BackendCause, BackendError, Backends, Blocking, BlockingBackend, Capability,
    UnknownCapability, WorkerPool,
};
pub use dispatcher::{CommissionResults, Dispatch, DispatchConfig, DispatchError, Dispatcher};
pub use monitor::{
    Change, Delta, Monitor, MonitorConfig, MonitorError, PollOutcome, PollStatus, StatusResults,
    diff,
};

#[cfg(feature = "http")]
pub use http::RemoteBackend;
