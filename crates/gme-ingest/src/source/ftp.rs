//! Anonymous FTP downloads with retry
//!
//! suppaftp's blocking client runs on the blocking pool; each attempt opens a
//! fresh session in extended passive mode.

use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};
use suppaftp::FtpStream;
use tracing::{debug, info, warn};

pub const MAX_RETRIES: u32 = 3;

/// Delay before retry `n` is this value times `n`
pub const RETRY_DELAY_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct FtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Anonymous servers expect the contact email here
    pub password: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl FtpConfig {
    pub fn anonymous(host: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            password: email.into(),
            ..Self::default()
        }
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 21,
            username: "anonymous".to_string(),
            password: "anonymous@".to_string(),
            max_retries: MAX_RETRIES,
            retry_delay: Duration::from_secs(RETRY_DELAY_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FtpClient {
    config: FtpConfig,
}

impl FtpClient {
    pub fn new(config: FtpConfig) -> Self {
        Self { config }
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Download `path`, retrying with a linearly growing delay
    pub async fn download_file(&self, path: &str) -> Result<Vec<u8>> {
        let attempts = self.config.max_retries.max(1);

        for attempt in 1..=attempts {
            debug!(host = %self.config.host, path, attempt, "FTP download attempt");

            let outcome = tokio::task::spawn_blocking({
                let config = self.config.clone();
                let path = path.to_string();
                move || Self::download_file_sync(&config, &path)
            })
            .await;

            match outcome {
                Ok(Ok(data)) => {
                    info!(host = %self.config.host, path, bytes = data.len(), "Downloaded");
                    return Ok(data);
                },
                Ok(Err(e)) if attempt < attempts => {
                    let delay = self.config.retry_delay * attempt;
                    warn!(
                        path,
                        attempt,
                        error = %e,
                        "FTP download failed, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                },
                Ok(Err(e)) => {
                    return Err(e).with_context(|| {
                        format!("Failed to download {} after {} attempts", path, attempts)
                    });
                },
                Err(e) => {
                    return Err(anyhow::anyhow!("FTP download task failed: {}", e));
                },
            }
        }

        Err(anyhow::anyhow!("no FTP download attempt was made for {}", path))
    }

    /// Download `path` and decode it as (lossy) UTF-8 text
    pub async fn download_text(&self, path: &str) -> Result<String> {
        let data = self.download_file(path).await?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    fn download_file_sync(config: &FtpConfig, path: &str) -> Result<Vec<u8>> {
        let mut ftp_stream = FtpStream::connect(format!("{}:{}", config.host, config.port))
            .with_context(|| format!("Failed to connect to {}", config.host))?;

        ftp_stream.set_mode(suppaftp::Mode::ExtendedPassive);

        ftp_stream
            .login(&config.username, &config.password)
            .context("FTP login failed")?;

        ftp_stream
            .transfer_type(suppaftp::types::FileType::Binary)
            .context("Failed to set binary mode")?;

        let mut reader = ftp_stream
            .retr_as_buffer(path)
            .with_context(|| format!("Failed to retrieve {}", path))?;

        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .context("Failed to read file data")?;

        if let Err(e) = ftp_stream.quit() {
            warn!("Failed to quit FTP session gracefully: {}", e);
        }

        Ok(data)
    }
}
