//! WDC for Geomagnetism, Kyoto: Dst and AE via the data-request form
//!
//! The form takes the range as century / tens / year digits plus a month, and
//! returns the requested index as IAGA-2002 text.

use async_trait::async_trait;
use chrono::Datelike;
use tracing::debug;

use super::{lines_of, FetchRange, RawUnit, SourceClient};
use crate::error::FetchError;

pub const DEFAULT_KYOTO_URL: &str = "https://wdc.kugi.kyoto-u.ac.jp/cgi-bin/dstae-cgi";

/// Index selected in the form's `Output` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KyotoIndex {
    Dst,
    Ae,
}

impl KyotoIndex {
    fn output(self) -> &'static str {
        match self {
            KyotoIndex::Dst => "DST",
            KyotoIndex::Ae => "AE",
        }
    }
}

pub struct KyotoClient {
    source_id: String,
    http: reqwest::Client,
    url: String,
    index: KyotoIndex,
    email: String,
}

impl KyotoClient {
    pub fn new(
        source_id: impl Into<String>,
        http: reqwest::Client,
        url: impl Into<String>,
        index: KyotoIndex,
        email: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            http,
            url: url.into(),
            index,
            email: email.into(),
        }
    }

    /// Form fields for one request range
    pub fn form_fields(&self, range: &FetchRange) -> Vec<(&'static str, String)> {
        let (s_cent, s_tens, s_year) = split_year(range.start.year());
        let (e_cent, e_tens, e_year) = split_year(range.end.year());
        vec![
            ("SCent", s_cent.to_string()),
            ("STens", s_tens.to_string()),
            ("SYear", s_year.to_string()),
            ("SMonth", format!("{:02}", range.start.month())),
            ("ECent", e_cent.to_string()),
            ("ETens", e_tens.to_string()),
            ("EYear", e_year.to_string()),
            ("EMonth", format!("{:02}", range.end.month())),
            ("Image Type", "GIF".to_string()),
            ("COLOR", "COLOR".to_string()),
            ("AE Sensitivity", "0".to_string()),
            ("Dst Sensitivity", "0".to_string()),
            ("Output", self.index.output().to_string()),
            ("Out format", "IAGA2002".to_string()),
            ("Email", self.email.clone()),
        ]
    }
}

/// 2004 -> (20, 0, 4)
fn split_year(year: i32) -> (i32, i32, i32) {
    let cent = year / 100;
    let tens = (year - cent * 100) / 10;
    (cent, tens, year - cent * 100 - tens * 10)
}

#[async_trait]
impl SourceClient for KyotoClient {
    async fn fetch(&self, range: &FetchRange) -> Result<Vec<RawUnit>, FetchError> {
        let fail = |cause: String| FetchError::new(self.source_id.clone(), *range, cause);

        debug!(source = %self.source_id, %range, "Requesting Kyoto data");

        let response = self
            .http
            .get(&self.url)
            .query(&self.form_fields(range))
            .send()
            .await
            .map_err(|e| fail(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| fail(format!("failed to read body: {}", e)))?;

        Ok(lines_of(&body, None))
    }
}
