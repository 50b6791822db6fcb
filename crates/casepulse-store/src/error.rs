use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot io error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot {file} is not valid JSON: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("atomic replace of {file} failed: {source}")]
    Persist {
        file: String,
        #[source]
        source: tempfile::PersistError,
    },

    #[error("invalid snapshot file name: {0:?}")]
    InvalidFileName(String),
}
