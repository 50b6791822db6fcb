pub mod config;
pub mod criteria;
pub mod date;
pub mod record;

pub use config::{BackendEndpoint, DiffMode, Settings};
pub use criteria::{CoreError, CourtSelector, MonitorKey, SearchCriteria, SearchWindow};
pub use date::{DateError, DateFormat, normalize};
pub use record::{BombayCase, CaseDetails, CaseRecord, Court, DelhiStatus, Snapshot, WithCase};
