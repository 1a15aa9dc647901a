//! Remote source clients
//!
//! Each upstream archive is wrapped in a [`SourceClient`] that returns the raw
//! units (text lines) covering a [`FetchRange`]. Clients know nothing about
//! decoding or storage.

pub mod ftp;
pub mod kp;
pub mod kyoto;
pub mod madrigal;
pub mod omni;
pub mod poes;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::decode::RecordDecoder;
use crate::error::FetchError;
use crate::record::Dataset;

/// Inclusive UTC time range requested from a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FetchRange {
    /// Whole calendar year: Jan 1 00:00:00 through Dec 31 23:59:59
    pub fn year(year: i32) -> Self {
        let start = Utc
            .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = Utc
            .with_ymd_and_hms(year, 12, 31, 23, 59, 59)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { start, end }
    }

    pub fn start_year(&self) -> i32 {
        self.start.year()
    }

    pub fn end_year(&self) -> i32 {
        self.end.year()
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time <= self.end
    }
}

impl fmt::Display for FetchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start.format("%Y-%m-%d %H:%M:%S"), self.end.format("%Y-%m-%d %H:%M:%S"))
    }
}

/// One undecoded unit of source data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUnit {
    /// Where the line came from when it affects decoding (e.g. POES satellite id)
    pub origin: Option<String>,
    pub line: String,
}

impl RawUnit {
    pub fn new(line: impl Into<String>) -> Self {
        Self { origin: None, line: line.into() }
    }

    pub fn with_origin(origin: impl Into<String>, line: impl Into<String>) -> Self {
        Self { origin: Some(origin.into()), line: line.into() }
    }
}

/// Split a downloaded text body into raw units, dropping blank lines
pub fn lines_of(body: &str, origin: Option<&str>) -> Vec<RawUnit> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| RawUnit {
            origin: origin.map(str::to_string),
            line: line.trim_end().to_string(),
        })
        .collect()
}

/// A remote archive that can be asked for one range of raw data
#[async_trait]
pub trait SourceClient: Send + Sync {
    async fn fetch(&self, range: &FetchRange) -> Result<Vec<RawUnit>, FetchError>;
}

/// Wraps any client with a per-fetch deadline; an elapsed deadline is a fetch failure
pub struct TimeoutClient {
    source_id: String,
    inner: Arc<dyn SourceClient>,
    timeout: Duration,
}

impl TimeoutClient {
    pub fn new(source_id: impl Into<String>, inner: Arc<dyn SourceClient>, timeout: Duration) -> Self {
        Self { source_id: source_id.into(), inner, timeout }
    }
}

#[async_trait]
impl SourceClient for TimeoutClient {
    async fn fetch(&self, range: &FetchRange) -> Result<Vec<RawUnit>, FetchError> {
        match tokio::time::timeout(self.timeout, self.inner.fetch(range)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::new(
                self.source_id.clone(),
                *range,
                format!("timed out after {}s", self.timeout.as_secs()),
            )),
        }
    }
}

/// A configured source: the client, its decoder and where it starts
#[derive(Clone)]
pub struct IngestSource {
    pub id: String,
    pub dataset: Dataset,
    pub client: Arc<dyn SourceClient>,
    pub decoder: Arc<dyn RecordDecoder>,
    pub earliest_year: i32,
}

impl IngestSource {
    pub fn new(
        id: impl Into<String>,
        dataset: Dataset,
        client: Arc<dyn SourceClient>,
        decoder: Arc<dyn RecordDecoder>,
    ) -> Self {
        Self {
            id: id.into(),
            dataset,
            client,
            decoder,
            earliest_year: dataset.earliest_year(),
        }
    }

    pub fn with_earliest_year(mut self, year: i32) -> Self {
        self.earliest_year = year;
        self
    }

    /// Bound every fetch of this source by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = Arc::new(TimeoutClient::new(self.id.clone(), self.client, timeout));
        self
    }
}

impl fmt::Debug for IngestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestSource")
            .field("id", &self.id)
            .field("dataset", &self.dataset)
            .field("earliest_year", &self.earliest_year)
            .finish()
    }
}
