//! Error types for the ingestion pipeline
//!
//! Per-unit failures (fetch, decode, integrity, store) are values the sync job
//! records and moves past. Only [`IngestError`] ever aborts a call.

use thiserror::Error;

use crate::record::{Dataset, NaturalKey};
use crate::source::FetchRange;

/// Retrieving raw data for one fetch range failed
#[derive(Debug, Error)]
#[error("fetch from {source_id} for {range} failed: {cause}")]
pub struct FetchError {
    pub source_id: String,
    pub range: FetchRange,
    pub cause: String,
}

impl FetchError {
    pub fn new(source_id: impl Into<String>, range: FetchRange, cause: impl std::fmt::Display) -> Self {
        Self {
            source_id: source_id.into(),
            range,
            cause: cause.to_string(),
        }
    }
}

/// One raw unit could not be turned into a record
#[derive(Debug, Clone, Error)]
#[error("cannot decode {dataset} unit {raw:?}: {cause}")]
pub struct DecodeError {
    pub dataset: Dataset,
    pub raw: String,
    pub cause: String,
}

impl DecodeError {
    pub fn new(dataset: Dataset, raw: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self {
            dataset,
            raw: raw.into(),
            cause: cause.to_string(),
        }
    }
}

/// Backend failure in the record store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("document error: {0}")]
    Document(#[from] serde_json::Error),

    #[error("no stored document with id {0}")]
    MissingDocument(uuid::Uuid),

    #[error("field '{field}' cannot be indexed or filtered for {dataset}")]
    InvalidField { dataset: Dataset, field: String },

    #[error("stored row is unreadable: {0}")]
    Corrupt(String),
}

/// Outcome of a failed upsert
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// More than one stored document already carries the key; nothing was written
    #[error("{matches} stored documents match {key}")]
    Integrity { key: NaturalKey, matches: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors that abort a whole pipeline call
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no sources are configured")]
    NoSources,

    #[error("none of the {0} configured sources could be launched")]
    NoJobLaunched(usize),

    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("invalid year range {start}..={end}")]
    InvalidYearRange { start: i32, end: i32 },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<gme_common::GmeError> for IngestError {
    fn from(err: gme_common::GmeError) -> Self {
        match err {
            gme_common::GmeError::UnknownSource(id) => IngestError::UnknownSource(id),
            other => IngestError::Config(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
