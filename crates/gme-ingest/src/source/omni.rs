//! NASA SPDF high-resolution OMNI yearly ASCII files
//!
//! One file per year and resolution. A range spanning several years fetches
//! each year's file in turn.

use async_trait::async_trait;
use tracing::debug;

use super::ftp::FtpClient;
use super::{lines_of, FetchRange, RawUnit, SourceClient};
use crate::error::FetchError;

pub const DEFAULT_OMNI_FTP_HOST: &str = "spdf.gsfc.nasa.gov";
pub const DEFAULT_OMNI_DIR: &str = "/pub/data/omni/high_res_omni";

/// Time resolution of an OMNI product, in minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OmniResolution {
    OneMinute,
    FiveMinute,
}

impl OmniResolution {
    pub fn minutes(self) -> u8 {
        match self {
            OmniResolution::OneMinute => 1,
            OmniResolution::FiveMinute => 5,
        }
    }

    pub fn file_name(self, year: i32) -> String {
        match self {
            OmniResolution::OneMinute => format!("omni_min{}.asc", year),
            OmniResolution::FiveMinute => format!("omni_5min{}.asc", year),
        }
    }
}

pub struct OmniClient {
    source_id: String,
    ftp: FtpClient,
    directory: String,
    resolution: OmniResolution,
}

impl OmniClient {
    pub fn new(
        source_id: impl Into<String>,
        ftp: FtpClient,
        directory: impl Into<String>,
        resolution: OmniResolution,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            ftp,
            directory: directory.into(),
            resolution,
        }
    }

    pub fn path_for(&self, year: i32) -> String {
        format!("{}/{}", self.directory.trim_end_matches('/'), self.resolution.file_name(year))
    }
}

#[async_trait]
impl SourceClient for OmniClient {
    async fn fetch(&self, range: &FetchRange) -> Result<Vec<RawUnit>, FetchError> {
        let mut units = Vec::new();
        for year in range.start_year()..=range.end_year() {
            let path = self.path_for(year);
            debug!(source = %self.source_id, path = %path, "Fetching OMNI file");
            let body = self
                .ftp
                .download_text(&path)
                .await
                .map_err(|e| FetchError::new(self.source_id.clone(), *range, format!("{:#}", e)))?;
            units.extend(lines_of(&body, None));
        }
        Ok(units)
    }
}
