use crate::video_store::VideoKind;
use thiserror::Error;

/// Failures raised by the entity store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Table {table} has no column named {column}")]
    UnknownColumn { table: &'static str, column: String },

    #[error("Connection lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced to callers of the resolver and the library write paths.
#[derive(Debug, Error)]
pub enum VideoError {
    #[error("Video {0} not found")]
    NotFound(i64),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Malformed {table} row {id}: {source}")]
    MalformedRow {
        table: &'static str,
        id: i64,
        #[source]
        source: serde_json::Error,
    },

    #[error("Video {id} has extension rows in more than one table: {kinds:?}")]
    IntegrityViolation { id: i64, kinds: Vec<VideoKind> },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type VideoResult<T> = Result<T, VideoError>;
