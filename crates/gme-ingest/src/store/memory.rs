//! In-process store for tests and dry runs

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DocumentId, RecordStore, StoredDocument};
use crate::error::StoreError;
use crate::query::RecordQuery;
use crate::record::{Dataset, Document, NaturalKey};

/// Documents are append-only per dataset until it is cleared, so positions
/// in `documents` stay valid for the key and id maps.
#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<Dataset, Vec<StoredDocument>>,
    by_key: HashMap<(Dataset, String), Vec<usize>>,
    by_id: HashMap<DocumentId, (Dataset, usize)>,
    indexes: HashMap<Dataset, BTreeSet<String>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fields indexed so far for `dataset`
    pub async fn indexes(&self, dataset: Dataset) -> Vec<String> {
        let inner = self.inner.read().await;
        inner
            .indexes
            .get(&dataset)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn documents(&self, dataset: Dataset) -> Vec<StoredDocument> {
        let inner = self.inner.read().await;
        inner.documents.get(&dataset).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn ensure_index(&self, dataset: Dataset, field: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.indexes.entry(dataset).or_default().insert(field.to_string());
        Ok(())
    }

    async fn find_by_key(&self, key: &NaturalKey) -> Result<Vec<StoredDocument>, StoreError> {
        let inner = self.inner.read().await;
        let (Some(positions), Some(docs)) = (
            inner.by_key.get(&(key.dataset, key.canonical())),
            inner.documents.get(&key.dataset),
        ) else {
            return Ok(Vec::new());
        };
        Ok(positions.iter().filter_map(|&i| docs.get(i)).cloned().collect())
    }

    async fn insert(&self, key: &NaturalKey, doc: Document) -> Result<DocumentId, StoreError> {
        let id = DocumentId::new();
        let canonical = key.canonical();
        let mut inner = self.inner.write().await;
        let docs = inner.documents.entry(key.dataset).or_default();
        let position = docs.len();
        docs.push(StoredDocument {
            id,
            dataset: key.dataset,
            key: canonical.clone(),
            time: key.time,
            doc,
        });
        inner.by_key.entry((key.dataset, canonical)).or_default().push(position);
        inner.by_id.insert(id, (key.dataset, position));
        Ok(id)
    }

    async fn replace(&self, dataset: Dataset, id: DocumentId, doc: Document) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let position = match inner.by_id.get(&id) {
            Some(&(owner, position)) if owner == dataset => position,
            _ => return Err(StoreError::MissingDocument(id.0)),
        };
        let stored = inner
            .documents
            .get_mut(&dataset)
            .and_then(|docs| docs.get_mut(position))
            .ok_or(StoreError::MissingDocument(id.0))?;
        stored.doc = doc;
        Ok(())
    }

    async fn query(&self, query: &RecordQuery) -> Result<Vec<StoredDocument>, StoreError> {
        let inner = self.inner.read().await;
        let mut found: Vec<StoredDocument> = inner
            .documents
            .get(&query.dataset)
            .map(|docs| docs.iter().filter(|d| query.matches(d)).cloned().collect())
            .unwrap_or_default();
        found.sort_by_key(|d| d.time);
        Ok(found)
    }

    async fn clear(&self, dataset: Dataset) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let removed = inner.documents.remove(&dataset).map_or(0, |docs| docs.len());
        inner.by_key.retain(|(owner, _), _| *owner != dataset);
        inner.by_id.retain(|_, (owner, _)| *owner != dataset);
        Ok(removed as u64)
    }

    async fn count(&self, dataset: Dataset) -> Result<u64, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.documents.get(&dataset).map_or(0, Vec::len) as u64)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::record::{DstRecord, IndexRecord};
    use chrono::{TimeZone, Utc};

    fn dst(hour: u32, value: f64) -> IndexRecord {
        IndexRecord::Dst(DstRecord {
            time: Utc.with_ymd_and_hms(2005, 1, 1, hour, 0, 0).unwrap(),
            dst: Some(value),
        })
    }

    #[tokio::test]
    async fn test_insert_find_replace() {
        let store = MemoryStore::new();
        let record = dst(3, -12.0);
        let key = record.natural_key();

        let id = store.insert(&key, record.to_document().unwrap()).await.unwrap();
        let found = store.find_by_key(&key).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);

        store.replace(Dataset::Dst, id, dst(3, -20.0).to_document().unwrap()).await.unwrap();
        let found = store.find_by_key(&key).await.unwrap();
        assert_eq!(found[0].id, id);
        assert_eq!(found[0].doc.get("dst").unwrap().as_f64(), Some(-20.0));
    }

    #[tokio::test]
    async fn test_duplicates_stay_visible() {
        let store = MemoryStore::new();
        let record = dst(3, -12.0);
        let key = record.natural_key();
        store.insert(&key, record.to_document().unwrap()).await.unwrap();
        store.insert(&key, record.to_document().unwrap()).await.unwrap();
        assert_eq!(store.find_by_key(&key).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_replace_unknown_id_fails() {
        let store = MemoryStore::new();
        let result = store
            .replace(Dataset::Dst, DocumentId::new(), dst(1, 0.0).to_document().unwrap())
            .await;
        assert!(matches!(result, Err(StoreError::MissingDocument(_))));
    }

    #[tokio::test]
    async fn test_clear_and_count() {
        let store = MemoryStore::new();
        for hour in 0..4 {
            let record = dst(hour, -1.0);
            store.insert(&record.natural_key(), record.to_document().unwrap()).await.unwrap();
        }
        assert_eq!(store.count(Dataset::Dst).await.unwrap(), 4);
        assert_eq!(store.count(Dataset::Kp).await.unwrap(), 0);
        assert_eq!(store.clear(Dataset::Dst).await.unwrap(), 4);
        assert_eq!(store.count(Dataset::Dst).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_key_lookup_after_clear_and_reinsert() {
        let store = MemoryStore::new();
        for hour in 0..24 {
            let record = dst(hour, -1.0);
            store.insert(&record.natural_key(), record.to_document().unwrap()).await.unwrap();
        }
        let kp = IndexRecord::Kp(crate::record::KpRecord {
            time: Utc.with_ymd_and_hms(2005, 1, 1, 0, 0, 0).unwrap(),
            kp: Vec::new(),
            ap: Vec::new(),
            kp_sum: None,
            ap_mean: None,
            cp: None,
            sunspot: None,
            f107: None,
        });
        store.insert(&kp.natural_key(), kp.to_document().unwrap()).await.unwrap();

        let key = dst(17, 0.0).natural_key();
        assert_eq!(store.find_by_key(&key).await.unwrap()[0].time.format("%H").to_string(), "17");

        store.clear(Dataset::Dst).await.unwrap();
        assert!(store.find_by_key(&key).await.unwrap().is_empty());
        assert_eq!(store.find_by_key(&kp.natural_key()).await.unwrap().len(), 1);

        let id = store.insert(&key, dst(17, -5.0).to_document().unwrap()).await.unwrap();
        let found = store.find_by_key(&key).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
        store.replace(Dataset::Dst, id, dst(17, -6.0).to_document().unwrap()).await.unwrap();
        assert_eq!(store.count(Dataset::Dst).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replace_checks_the_dataset() {
        let store = MemoryStore::new();
        let record = dst(2, -3.0);
        let id = store.insert(&record.natural_key(), record.to_document().unwrap()).await.unwrap();
        let result = store.replace(Dataset::Ae, id, record.to_document().unwrap()).await;
        assert!(matches!(result, Err(StoreError::MissingDocument(_))));
    }

    #[tokio::test]
    async fn test_ensure_index_is_idempotent() {
        let store = MemoryStore::new();
        store.ensure_index(Dataset::Dst, "time").await.unwrap();
        store.ensure_index(Dataset::Dst, "time").await.unwrap();
        store.ensure_index(Dataset::Dst, "dst").await.unwrap();
        assert_eq!(store.indexes(Dataset::Dst).await, vec!["dst".to_string(), "time".to_string()]);
    }
}
