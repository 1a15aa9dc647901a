//! GFZ Potsdam yearly Kp/ap files in WDC exchange format

use async_trait::async_trait;
use tracing::debug;

use super::ftp::FtpClient;
use super::{lines_of, FetchRange, RawUnit, SourceClient};
use crate::error::FetchError;

pub const DEFAULT_KP_FTP_HOST: &str = "ftp.gfz-potsdam.de";
pub const DEFAULT_KP_DIR: &str = "/pub/home/obs/kp-ap/wdc/yearly";

pub struct KpClient {
    source_id: String,
    ftp: FtpClient,
    directory: String,
}

impl KpClient {
    pub fn new(source_id: impl Into<String>, ftp: FtpClient, directory: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            ftp,
            directory: directory.into(),
        }
    }

    pub fn path_for(&self, year: i32) -> String {
        format!("{}/kp{}.wdc", self.directory.trim_end_matches('/'), year)
    }
}

#[async_trait]
impl SourceClient for KpClient {
    async fn fetch(&self, range: &FetchRange) -> Result<Vec<RawUnit>, FetchError> {
        let mut units = Vec::new();
        for year in range.start_year()..=range.end_year() {
            let path = self.path_for(year);
            debug!(source = %self.source_id, path = %path, "Fetching Kp file");
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
