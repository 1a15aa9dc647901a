//! NOAA POES averaged particle data, one text file per satellite per day
//!
//! Days are requested with bounded concurrency. A satellite that was not
//! flying on a given day has no file; a 404 is treated as "no data", not as a
//! failure.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use futures::stream::{self, StreamExt};
use reqwest::StatusCode;
use tracing::{debug, info};

use super::{lines_of, FetchRange, RawUnit, SourceClient};
use crate::error::FetchError;

pub const DEFAULT_POES_URL: &str = "https://satdat.ngdc.noaa.gov/sem/poes/data/avg/txt";

/// NOAA-15..19 and MetOp-01..03
pub const DEFAULT_SATELLITES: &[&str] = &["n15", "n16", "n17", "n18", "n19", "m01", "m02", "m03"];

pub const DEFAULT_CONCURRENCY: usize = 8;

pub struct PoesClient {
    source_id: String,
    http: reqwest::Client,
    base_url: String,
    satellites: Vec<String>,
    concurrency: usize,
}

impl PoesClient {
    pub fn new(source_id: impl Into<String>, http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            http,
            base_url: base_url.into(),
            satellites: DEFAULT_SATELLITES.iter().map(|s| s.to_string()).collect(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_satellites<I, S>(mut self, satellites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.satellites = satellites.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// `{base}/{yyyy}/{sat}/poes_{sat}_{yyyymmdd}.txt`
    pub fn url_for(&self, satellite: &str, day: NaiveDate) -> String {
        format!(
            "{}/{}/{}/poes_{}_{}.txt",
            self.base_url.trim_end_matches('/'),
            day.year(),
            satellite,
            satellite,
            day.format("%Y%m%d")
        )
    }

    async fn fetch_day(&self, satellite: &str, day: NaiveDate) -> Result<Option<String>, String> {
        let url = self.url_for(satellite, day);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("request for {} failed: {}", url, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .text()
                .await
                .map(Some)
                .map_err(|e| format!("failed to read {}: {}", url, e)),
            status => Err(format!("HTTP {} for {}", status, url)),
        }
    }
}

#[async_trait]
impl SourceClient for PoesClient {
    async fn fetch(&self, range: &FetchRange) -> Result<Vec<RawUnit>, FetchError> {
        let days: Vec<NaiveDate> = range
            .start
            .date_naive()
            .iter_days()
            .take_while(|d| *d <= range.end.date_naive())
            .collect();

        let requests: Vec<(usize, String, NaiveDate)> = days
            .iter()
            .flat_map(|day| self.satellites.iter().map(move |sat| (sat.clone(), *day)))
            .enumerate()
            .map(|(i, (sat, day))| (i, sat, day))
            .collect();

        debug!(source = %self.source_id, files = requests.len(), %range, "Requesting POES files");

        let mut bodies: Vec<(usize, String, Option<String>)> = stream::iter(requests)
            .map(|(i, sat, day)| async move {
                let result = self.fetch_day(&sat, day).await;
                (i, sat, result)
            })
            .buffer_unordered(self.concurrency)
            .map(|(i, sat, result)| result.map(|body| (i, sat, body)))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<_, _>>()
            .map_err(|cause| FetchError::new(self.source_id.clone(), *range, cause))?;

        // restore day/satellite order
        bodies.sort_by_key(|(i, _, _)| *i);

        let found = bodies.iter().filter(|(_, _, b)| b.is_some()).count();
        info!(source = %self.source_id, files = found, %range, "POES files retrieved");

        Ok(bodies
            .into_iter()
            .filter_map(|(_, sat, body)| body.map(|b| lines_of(&b, Some(sat.as_str()))))
            .flatten()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_url() {
        let client = PoesClient::new("poes", reqwest::Client::new(), "https://host/avg/txt/");
        let day = NaiveDate::from_ymd_opt(2001, 3, 9).unwrap_or_default();
        assert_eq!(client.url_for("n15", day), "https://host/avg/txt/2001/n15/poes_n15_20010309.txt");
    }

    #[test]
    fn test_concurrency_never_zero() {
        let client = PoesClient::new("poes", reqwest::Client::new(), DEFAULT_POES_URL).with_concurrency(0);
        assert_eq!(client.concurrency, 1);
    }
}
