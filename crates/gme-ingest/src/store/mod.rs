//! Record persistence
//!
//! The store keeps one JSON document per record, addressed by a durable
//! [`DocumentId`] and looked up by canonical natural key. It does not enforce
//! key uniqueness; that is the reconciler's job, and a pre-existing duplicate
//! must stay observable through [`RecordStore::find_by_key`].

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::query::RecordQuery;
use crate::record::{Dataset, Document, NaturalKey};

pub use memory::MemoryStore;
pub use postgres::{DbConfig, PgStore};

/// Store-assigned identifier, stable across replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub dataset: Dataset,
    /// Canonical natural key string
    pub key: String,
    pub time: DateTime<Utc>,
    pub doc: Document,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create an index on `field` for `dataset` if it does not exist yet
    async fn ensure_index(&self, dataset: Dataset, field: &str) -> Result<(), StoreError>;

    /// Every stored document carrying `key`
    async fn find_by_key(&self, key: &NaturalKey) -> Result<Vec<StoredDocument>, StoreError>;

    async fn insert(&self, key: &NaturalKey, doc: Document) -> Result<DocumentId, StoreError>;

    /// Swap the content of document `id`, keeping the id
    async fn replace(&self, dataset: Dataset, id: DocumentId, doc: Document) -> Result<(), StoreError>;

    /// Documents matching `query`, ordered by time
    async fn query(&self, query: &RecordQuery) -> Result<Vec<StoredDocument>, StoreError>;

    /// Remove every document of `dataset`, returning how many were removed
    async fn clear(&self, dataset: Dataset) -> Result<u64, StoreError>;

    async fn count(&self, dataset: Dataset) -> Result<u64, StoreError>;
}
