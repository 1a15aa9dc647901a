//! Ingestion configuration
//!
//! Everything is read from environment variables (a `.env` file is loaded by
//! the binary first). Unset variables fall back to the defaults below; set
//! but unparsable ones are errors rather than silently ignored.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use gme_common::GmeError;
use serde::{Deserialize, Serialize};

use crate::job::DEFAULT_MAX_REPORTED_ISSUES;
use crate::source::{kp, kyoto, madrigal, omni, poes};
use crate::store::DbConfig;

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 900;
pub const DEFAULT_CONTACT_EMAIL: &str = "gme-sync@example.org";
pub const DEFAULT_FTP_RETRIES: u32 = 3;
pub const DEFAULT_FTP_RETRY_DELAY_SECS: u64 = 5;

/// Every source the pipeline knows how to build, in launch order
pub const SOURCE_IDS: &[&str] = &["omni-1min", "omni-5min", "poes", "kp", "dst", "ae", "tec"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(format!("expected postgres or memory, got '{}'", other)),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Postgres => f.write_str("postgres"),
            StoreBackend::Memory => f.write_str("memory"),
        }
    }
}

/// Upstream locations, overridable for mirrors and tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub kyoto_url: String,
    pub omni_ftp_host: String,
    pub omni_dir: String,
    pub kp_ftp_host: String,
    pub kp_dir: String,
    pub poes_url: String,
    pub madrigal_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            kyoto_url: kyoto::DEFAULT_KYOTO_URL.to_string(),
            omni_ftp_host: omni::DEFAULT_OMNI_FTP_HOST.to_string(),
            omni_dir: omni::DEFAULT_OMNI_DIR.to_string(),
            kp_ftp_host: kp::DEFAULT_KP_FTP_HOST.to_string(),
            kp_dir: kp::DEFAULT_KP_DIR.to_string(),
            poes_url: poes::DEFAULT_POES_URL.to_string(),
            madrigal_url: madrigal::DEFAULT_MADRIGAL_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// Deadline for one source fetch (one year of data)
    pub fetch_timeout_secs: u64,
    pub max_reported_issues: usize,
    /// Source ids to run; all of [`SOURCE_IDS`] when not configured
    pub enabled_sources: Vec<String>,
    /// Sent to Kyoto and used as the anonymous FTP password
    pub contact_email: String,
    pub madrigal_user_name: String,
    pub madrigal_affiliation: String,
    pub ftp_max_retries: u32,
    pub ftp_retry_delay_secs: u64,
    pub poes_concurrency: usize,
    pub endpoints: EndpointConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::Postgres,
            database_url: None,
            database_max_connections: crate::store::postgres::DEFAULT_MAX_CONNECTIONS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_reported_issues: DEFAULT_MAX_REPORTED_ISSUES,
            enabled_sources: SOURCE_IDS.iter().map(|s| s.to_string()).collect(),
            contact_email: DEFAULT_CONTACT_EMAIL.to_string(),
            madrigal_user_name: "GME sync".to_string(),
            madrigal_affiliation: "unaffiliated".to_string(),
            ftp_max_retries: DEFAULT_FTP_RETRIES,
            ftp_retry_delay_secs: DEFAULT_FTP_RETRY_DELAY_SECS,
            poes_concurrency: poes::DEFAULT_CONCURRENCY,
            endpoints: EndpointConfig::default(),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T>(name: &str, default: T) -> Result<T, GmeError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| GmeError::invalid_setting(name, raw.clone(), e)),
        None => Ok(default),
    }
}

impl IngestConfig {
    /// Load configuration from environment variables and validate it
    pub fn from_env() -> Result<Self, GmeError> {
        let config = Self::load_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`IngestConfig::from_env`], for commands that never open the store
    pub fn from_env_without_store() -> Result<Self, GmeError> {
        let config = Self::load_env()?;
        config.validate_sources()?;
        Ok(config)
    }

    fn load_env() -> Result<Self, GmeError> {
        let defaults = Self::default();
        let endpoints = EndpointConfig {
            kyoto_url: env_string("GME_KYOTO_URL").unwrap_or(defaults.endpoints.kyoto_url),
            omni_ftp_host: env_string("GME_OMNI_FTP_HOST").unwrap_or(defaults.endpoints.omni_ftp_host),
            omni_dir: env_string("GME_OMNI_DIR").unwrap_or(defaults.endpoints.omni_dir),
            kp_ftp_host: env_string("GME_KP_FTP_HOST").unwrap_or(defaults.endpoints.kp_ftp_host),
            kp_dir: env_string("GME_KP_DIR").unwrap_or(defaults.endpoints.kp_dir),
            poes_url: env_string("GME_POES_URL").unwrap_or(defaults.endpoints.poes_url),
            madrigal_url: env_string("GME_MADRIGAL_URL").unwrap_or(defaults.endpoints.madrigal_url),
        };

        let enabled_sources = match env_string("GME_SOURCES") {
            Some(list) => list
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.enabled_sources,
        };

        let config = Self {
            store: env_parse("GME_STORE", defaults.store)?,
            database_url: env_string("DATABASE_URL"),
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS", defaults.database_max_connections)?,
            fetch_timeout_secs: env_parse("GME_FETCH_TIMEOUT_SECS", defaults.fetch_timeout_secs)?,
            max_reported_issues: env_parse("GME_MAX_REPORTED_ISSUES", defaults.max_reported_issues)?,
            enabled_sources,
            contact_email: env_string("GME_CONTACT_EMAIL").unwrap_or(defaults.contact_email),
            madrigal_user_name: env_string("GME_MADRIGAL_USER_NAME").unwrap_or(defaults.madrigal_user_name),
            madrigal_affiliation: env_string("GME_MADRIGAL_AFFILIATION")
                .unwrap_or(defaults.madrigal_affiliation),
            ftp_max_retries: env_parse("GME_FTP_MAX_RETRIES", defaults.ftp_max_retries)?,
            ftp_retry_delay_secs: env_parse("GME_FTP_RETRY_DELAY_SECS", defaults.ftp_retry_delay_secs)?,
            poes_concurrency: env_parse("GME_POES_CONCURRENCY", defaults.poes_concurrency)?,
            endpoints,
        };
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GmeError> {
        if self.store == StoreBackend::Postgres && self.database_url.is_none() {
            return Err(GmeError::Config(
                "DATABASE_URL must be set when GME_STORE=postgres".to_string(),
            ));
        }
        if self.database_max_connections == 0 {
            return Err(GmeError::invalid_setting("DATABASE_MAX_CONNECTIONS", "0", "must be positive"));
        }
        self.validate_sources()
    }

    /// Checks that do not involve the store backend
    pub fn validate_sources(&self) -> Result<(), GmeError> {
        if self.fetch_timeout_secs == 0 {
            return Err(GmeError::invalid_setting("GME_FETCH_TIMEOUT_SECS", "0", "must be positive"));
        }
        if self.poes_concurrency == 0 {
            return Err(GmeError::invalid_setting("GME_POES_CONCURRENCY", "0", "must be positive"));
        }
        if self.enabled_sources.is_empty() {
            return Err(GmeError::Config("GME_SOURCES enables no sources".to_string()));
        }
        if let Some(unknown) = self.enabled_sources.iter().find(|s| !SOURCE_IDS.contains(&s.as_str())) {
            return Err(GmeError::UnknownSource(unknown.clone()));
        }
        Ok(())
    }

    pub fn with_store(mut self, store: StoreBackend) -> Self {
        self.store = store;
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_endpoints(mut self, endpoints: EndpointConfig) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn is_enabled(&self, source_id: &str) -> bool {
        self.enabled_sources.iter().any(|s| s == source_id)
    }

    /// Pool settings for the Postgres backend, `None` without a database URL
    pub fn db_config(&self) -> Option<DbConfig> {
        self.database_url.as_ref().map(|url| DbConfig {
            url: url.clone(),
            max_connections: self.database_max_connections,
            ..DbConfig::default()
        })
    }

    pub fn madrigal_user(&self) -> madrigal::MadrigalUser {
        madrigal::MadrigalUser {
            fullname: self.madrigal_user_name.clone(),
            email: self.contact_email.clone(),
            affiliation: self.madrigal_affiliation.clone(),
        }
    }
}
