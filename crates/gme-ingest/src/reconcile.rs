//! Upsert by natural key
//!
//! The store does not enforce key uniqueness, so every write starts with a
//! lookup. Zero matches inserts, one match replaces in place (keeping the
//! document id), more than one is a data-integrity problem and nothing is
//! written.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{ReconcileError, StoreError};
use crate::record::{Dataset, IndexRecord};
use crate::store::{DocumentId, RecordStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(DocumentId),
    Updated(DocumentId),
}

impl UpsertOutcome {
    pub fn id(&self) -> DocumentId {
        match self {
            UpsertOutcome::Inserted(id) | UpsertOutcome::Updated(id) => *id,
        }
    }
}

#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn RecordStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Ensure the time index and one index per queryable field. Safe to repeat.
    pub async fn prepare(&self, dataset: Dataset) -> Result<(), StoreError> {
        self.store.ensure_index(dataset, "time").await?;
        for field in dataset.queryable_fields() {
            self.store.ensure_index(dataset, field).await?;
        }
        debug!(%dataset, "Store prepared");
        Ok(())
    }

    pub async fn upsert(&self, record: &IndexRecord) -> Result<UpsertOutcome, ReconcileError> {
        let key = record.natural_key();
        let doc = record.to_document().map_err(StoreError::from)?;

        let matches = self.store.find_by_key(&key).await?;
        match matches.as_slice() {
            [] => {
                let id = self.store.insert(&key, doc).await?;
                Ok(UpsertOutcome::Inserted(id))
            },
            [existing] => {
                self.store.replace(key.dataset, existing.id, doc).await?;
                Ok(UpsertOutcome::Updated(existing.id))
            },
            many => {
                warn!(key = %key, matches = many.len(), "Duplicate stored records, skipping upsert");
                Err(ReconcileError::Integrity { key, matches: many.len() })
            },
        }
    }
}
