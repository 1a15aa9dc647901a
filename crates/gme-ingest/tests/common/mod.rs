//! Shared fixtures for gme-ingest integration tests
//!
//! Scripted source clients return canned lines per year, and
//! [`FlakyStore`] wraps the in-memory store to inject backend failures.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Datelike;
use gme_ingest::decode::IagaDecoder;
use gme_ingest::error::{FetchError, StoreError};
use gme_ingest::query::RecordQuery;
use gme_ingest::record::{Dataset, Document, NaturalKey};
use gme_ingest::source::{FetchRange, IngestSource, RawUnit, SourceClient};
use gme_ingest::store::{DocumentId, MemoryStore, RecordStore, StoredDocument};

/// Initialize tracing for tests
pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,gme_ingest=debug,sqlx=warn")),
        )
        .with_test_writer()
        .try_init();
}

/// One IAGA-2002 Dst data line
pub fn dst_line(year: i32, month: u32, day: u32, hour: u32, value: i32) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:00:00.000 {:03} {:>8}",
        year, month, day, hour, 1, value
    )
}

pub const DST_HEADER: &[&str] = &[
    " Format                 IAGA-2002                                    |",
    " Source of Data         WDC for Geomagnetism, Kyoto                  |",
    "DATE       TIME         DOY     DST                                  |",
];

/// Client answering each year from a script and recording what was asked
#[derive(Default)]
pub struct ScriptedClient {
    source_id: String,
    years: HashMap<i32, Result<Vec<String>, String>>,
    calls: Mutex<Vec<i32>>,
}

impl ScriptedClient {
    pub fn new(source_id: &str) -> Self {
        Self { source_id: source_id.to_string(), ..Self::default() }
    }

    pub fn year(mut self, year: i32, lines: Vec<String>) -> Self {
        self.years.insert(year, Ok(lines));
        self
    }

    pub fn failing_year(mut self, year: i32, cause: &str) -> Self {
        self.years.insert(year, Err(cause.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<i32> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SourceClient for ScriptedClient {
    async fn fetch(&self, range: &FetchRange) -> Result<Vec<RawUnit>, FetchError> {
        let year = range.start.year();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(year);
        }
        match self.years.get(&year) {
            Some(Ok(lines)) => Ok(lines.iter().map(RawUnit::new).collect()),
            Some(Err(cause)) => Err(FetchError::new(self.source_id.clone(), *range, cause)),
            None => Ok(Vec::new()),
        }
    }
}

/// Client whose fetch panics, to exercise task isolation
pub struct PanickingClient;

#[async_trait]
impl SourceClient for PanickingClient {
    async fn fetch(&self, _range: &FetchRange) -> Result<Vec<RawUnit>, FetchError> {
        panic!("source exploded");
    }
}

pub fn dst_source(id: &str, client: Arc<dyn SourceClient>) -> IngestSource {
    IngestSource::new(id, Dataset::Dst, client, Arc::new(IagaDecoder::dst()))
}

/// Memory store that fails writes for chosen years and index creation for chosen datasets
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing_write_years: HashSet<i32>,
    failing_index: HashSet<Dataset>,
    failing_clear: HashSet<Dataset>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes_in(mut self, year: i32) -> Self {
        self.failing_write_years.insert(year);
        self
    }

    pub fn fail_index_for(mut self, dataset: Dataset) -> Self {
        self.failing_index.insert(dataset);
        self
    }

    pub fn fail_clear_for(mut self, dataset: Dataset) -> Self {
        self.failing_clear.insert(dataset);
        self
    }

    fn write_fails(&self, doc: &Document) -> bool {
        doc.get("time")
            .and_then(|t| t.as_str())
            .and_then(|t| t.get(0..4))
            .and_then(|y| y.parse::<i32>().ok())
            .is_some_and(|y| self.failing_write_years.contains(&y))
    }
}

fn injected() -> StoreError {
    StoreError::Corrupt("injected failure".to_string())
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn ensure_index(&self, dataset: Dataset, field: &str) -> Result<(), StoreError> {
        if self.failing_index.contains(&dataset) {
            return Err(injected());
        }
        self.inner.ensure_index(dataset, field).await
    }

    async fn find_by_key(&self, key: &NaturalKey) -> Result<Vec<StoredDocument>, StoreError> {
        self.inner.find_by_key(key).await
    }

    async fn insert(&self, key: &NaturalKey, doc: Document) -> Result<DocumentId, StoreError> {
        if self.write_fails(&doc) {
            return Err(injected());
        }
        self.inner.insert(key, doc).await
    }

    async fn replace(&self, dataset: Dataset, id: DocumentId, doc: Document) -> Result<(), StoreError> {
        if self.write_fails(&doc) {
            return Err(injected());
        }
        self.inner.replace(dataset, id, doc).await
    }

    async fn query(&self, query: &RecordQuery) -> Result<Vec<StoredDocument>, StoreError> {
        self.inner.query(query).await
    }

    async fn clear(&self, dataset: Dataset) -> Result<u64, StoreError> {
        if self.failing_clear.contains(&dataset) {
            return Err(injected());
        }
        self.inner.clear(dataset).await
    }

    async fn count(&self, dataset: Dataset) -> Result<u64, StoreError> {
        self.inner.count(dataset).await
    }
}
