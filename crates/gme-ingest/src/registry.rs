//! Wiring: configured sources and the record store

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::{IngestConfig, StoreBackend, SOURCE_IDS};
use crate::decode::{IagaDecoder, KpDecoder, OmniDecoder, PoesDecoder, TecDecoder};
use crate::record::Dataset;
use crate::source::ftp::{FtpClient, FtpConfig};
use crate::source::kp::KpClient;
use crate::source::kyoto::{KyotoClient, KyotoIndex};
use crate::source::madrigal::MadrigalClient;
use crate::source::omni::{OmniClient, OmniResolution};
use crate::source::poes::PoesClient;
use crate::source::IngestSource;
use crate::store::{MemoryStore, PgStore, RecordStore};

fn ftp_client(config: &IngestConfig, host: &str) -> FtpClient {
    FtpClient::new(
        FtpConfig::anonymous(host, &config.contact_email)
            .with_retries(config.ftp_max_retries, Duration::from_secs(config.ftp_retry_delay_secs)),
    )
}

/// Build one source by id
pub fn build_source(config: &IngestConfig, http: &reqwest::Client, id: &str) -> Option<IngestSource> {
    let endpoints = &config.endpoints;
    let source = match id {
        "dst" => IngestSource::new(
            id,
            Dataset::Dst,
            Arc::new(KyotoClient::new(
                id,
                http.clone(),
                &endpoints.kyoto_url,
                KyotoIndex::Dst,
                &config.contact_email,
            )),
            Arc::new(IagaDecoder::dst()),
        ),
        "ae" => IngestSource::new(
            id,
            Dataset::Ae,
            Arc::new(KyotoClient::new(
                id,
                http.clone(),
                &endpoints.kyoto_url,
                KyotoIndex::Ae,
                &config.contact_email,
            )),
            Arc::new(IagaDecoder::ae()),
        ),
        "kp" => IngestSource::new(
            id,
            Dataset::Kp,
            Arc::new(KpClient::new(id, ftp_client(config, &endpoints.kp_ftp_host), &endpoints.kp_dir)),
            Arc::new(KpDecoder::new()),
        ),
        "omni-1min" | "omni-5min" => {
            let resolution = if id == "omni-1min" {
                OmniResolution::OneMinute
            } else {
                OmniResolution::FiveMinute
            };
            IngestSource::new(
                id,
                Dataset::Omni,
                Arc::new(OmniClient::new(
                    id,
                    ftp_client(config, &endpoints.omni_ftp_host),
                    &endpoints.omni_dir,
                    resolution,
                )),
                Arc::new(OmniDecoder::new(resolution.minutes())),
            )
        },
        "poes" => IngestSource::new(
            id,
            Dataset::Poes,
            Arc::new(
                PoesClient::new(id, http.clone(), &endpoints.poes_url)
                    .with_concurrency(config.poes_concurrency),
            ),
            Arc::new(PoesDecoder::new()),
        ),
        "tec" => IngestSource::new(
            id,
            Dataset::Tec,
            Arc::new(MadrigalClient::new(
                id,
                http.clone(),
                &endpoints.madrigal_url,
                config.madrigal_user(),
            )),
            Arc::new(TecDecoder::new()),
        ),
        _ => return None,
    };
    Some(source.with_timeout(config.fetch_timeout()))
}

/// Every enabled source, in launch order
pub fn build_sources(config: &IngestConfig) -> Result<Vec<IngestSource>> {
    let http = reqwest::Client::builder()
        .user_agent(concat!("gme-ingest/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let sources: Vec<IngestSource> = SOURCE_IDS
        .iter()
        .filter(|id| config.is_enabled(id))
        .filter_map(|id| build_source(config, &http, id))
        .collect();

    info!(
        sources = ?sources.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
        "Configured sources"
    );
    Ok(sources)
}

pub async fn open_store(config: &IngestConfig) -> Result<Arc<dyn RecordStore>> {
    match config.store {
        StoreBackend::Memory => {
            info!("Using in-memory record store");
            Ok(Arc::new(MemoryStore::new()))
        },
        StoreBackend::Postgres => {
            let db = config
                .db_config()
                .context("DATABASE_URL must be set for the postgres store")?;
            let store = PgStore::connect(&db)
                .await
                .context("Failed to connect to the record database")?;
            Ok(Arc::new(store))
        },
    }
}
