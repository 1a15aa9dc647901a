//! Fan-out of one sync job per configured source
//!
//! Jobs run as independent tokio tasks. A job that cannot start, panics or
//! is cancelled becomes a failed [`SourceReport`]; it never takes its
//! siblings down with it.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{IngestError, Result};
use crate::job::{SourceReport, SyncJob, DEFAULT_MAX_REPORTED_ISSUES};
use crate::reconcile::Reconciler;
use crate::record::Dataset;
use crate::source::IngestSource;
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Last year and this year
    Incremental,
    /// Everything since each source's earliest year, rebuilding where supported
    Full,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Incremental => f.write_str("incremental"),
            SyncMode::Full => f.write_str("full"),
        }
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "incremental" | "recent" => Ok(SyncMode::Incremental),
            "full" | "all" => Ok(SyncMode::Full),
            other => Err(format!("unknown sync mode '{}' (expected incremental or full)", other)),
        }
    }
}

/// Inclusive range of years one job covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearWindow {
    pub start: i32,
    pub end: i32,
}

impl YearWindow {
    pub fn for_mode(mode: SyncMode, earliest_year: i32, current_year: i32) -> Self {
        match mode {
            SyncMode::Incremental => Self { start: current_year - 1, end: current_year },
            SyncMode::Full => Self { start: earliest_year, end: current_year },
        }
    }
}

/// Per-run values handed down to every job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub run_id: Uuid,
    pub mode: SyncMode,
    pub current_year: i32,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new(mode: SyncMode) -> Self {
        Self::at(mode, Utc::now())
    }

    /// Context for a run that considers `now` the current instant
    pub fn at(mode: SyncMode, now: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            current_year: now.year(),
            started_at: now,
        }
    }

    pub fn window_for(&self, source: &IngestSource) -> YearWindow {
        YearWindow::for_mode(self.mode, source.earliest_year, self.current_year)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub mode: SyncMode,
    pub current_year: i32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Collections emptied before a full rebuild, with the number of documents removed
    pub cleared: Vec<(Dataset, u64)>,
    pub reports: Vec<SourceReport>,
}

impl RunSummary {
    pub fn report(&self, source: &str) -> Option<&SourceReport> {
        self.reports.iter().find(|r| r.source == source)
    }

    pub fn inserted(&self) -> u64 {
        self.reports.iter().map(|r| r.inserted).sum()
    }

    pub fn updated(&self) -> u64 {
        self.reports.iter().map(|r| r.updated).sum()
    }

    pub fn skipped(&self) -> u64 {
        self.reports.iter().map(|r| r.skipped).sum()
    }

    pub fn failed_sources(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter(|r| !r.succeeded())
            .map(|r| r.source.as_str())
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.reports.iter().all(SourceReport::succeeded)
    }
}

pub struct Orchestrator {
    sources: Vec<IngestSource>,
    store: Arc<dyn RecordStore>,
    max_reported_issues: usize,
}

impl Orchestrator {
    pub fn new(sources: Vec<IngestSource>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            sources,
            store,
            max_reported_issues: DEFAULT_MAX_REPORTED_ISSUES,
        }
    }

    pub fn with_max_reported_issues(mut self, max: usize) -> Self {
        self.max_reported_issues = max;
        self
    }

    pub fn sources(&self) -> &[IngestSource] {
        &self.sources
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub async fn run(&self, mode: SyncMode) -> Result<RunSummary> {
        self.run_with_context(RunContext::new(mode)).await
    }

    /// Launch every source, wait for all of them and collect their reports
    pub async fn run_with_context(&self, ctx: RunContext) -> Result<RunSummary> {
        if self.sources.is_empty() {
            return Err(IngestError::NoSources);
        }

        info!(
            run_id = %ctx.run_id,
            mode = %ctx.mode,
            current_year = ctx.current_year,
            sources = self.sources.len(),
            "Starting sync run"
        );

        let (cleared, failed_clears) = match ctx.mode {
            SyncMode::Full => self.clear_rebuild_datasets().await,
            SyncMode::Incremental => (Vec::new(), Vec::new()),
        };

        let mut reports = Vec::with_capacity(self.sources.len());
        let mut launched = Vec::new();

        for source in &self.sources {
            if let Some((_, cause)) = failed_clears.iter().find(|(d, _)| *d == source.dataset) {
                reports.push(SourceReport::launch_failed(
                    &source.id,
                    source.dataset,
                    format!("could not clear {} for rebuild: {}", source.dataset, cause),
                ));
                continue;
            }

            let window = ctx.window_for(source);
            let reconciler = Reconciler::new(Arc::clone(&self.store));
            let job = SyncJob::new(source.clone(), reconciler.clone())
                .with_max_reported_issues(self.max_reported_issues);
            let dataset = source.dataset;

            let handle = tokio::spawn(async move {
                reconciler
                    .prepare(dataset)
                    .await
                    .map_err(|e| format!("store preparation failed: {}", e))?;
                Ok::<_, String>(job.run(window.start, window.end).await)
            });
            launched.push((source.id.clone(), dataset, handle));
        }

        let (meta, handles): (Vec<_>, Vec<_>) = launched
            .into_iter()
            .map(|(id, dataset, handle)| ((id, dataset), handle))
            .unzip();

        for ((id, dataset), joined) in meta.into_iter().zip(join_all(handles).await) {
            let report = match joined {
                Ok(Ok(report)) => report,
                Ok(Err(cause)) => {
                    warn!(source = %id, cause = %cause, "Sync job could not start");
                    SourceReport::launch_failed(id, dataset, cause)
                },
                Err(e) => {
                    error!(source = %id, error = %e, "Sync job task failed");
                    SourceReport::launch_failed(id, dataset, format!("job task failed: {}", e))
                },
            };
            reports.push(report);
        }

        if reports.iter().all(|r| !r.launched) {
            return Err(IngestError::NoJobLaunched(reports.len()));
        }

        // configuration order
        reports.sort_by_key(|r| self.sources.iter().position(|s| s.id == r.source));

        let summary = RunSummary {
            run_id: ctx.run_id,
            mode: ctx.mode,
            current_year: ctx.current_year,
            started_at: ctx.started_at,
            finished_at: Utc::now(),
            cleared,
            reports,
        };

        info!(
            run_id = %summary.run_id,
            inserted = summary.inserted(),
            updated = summary.updated(),
            skipped = summary.skipped(),
            failed_sources = summary.failed_sources().len(),
            "Sync run complete"
        );

        Ok(summary)
    }

    /// Clear each rebuildable dataset once, however many sources feed it
    async fn clear_rebuild_datasets(&self) -> (Vec<(Dataset, u64)>, Vec<(Dataset, String)>) {
        let datasets: BTreeSet<Dataset> = self
            .sources
            .iter()
            .map(|s| s.dataset)
            .filter(|d| d.rebuilds_on_full())
            .collect();

        let mut cleared = Vec::new();
        let mut failed = Vec::new();
        for dataset in datasets {
            match self.store.clear(dataset).await {
                Ok(removed) => {
                    info!(%dataset, removed, "Cleared collection for rebuild");
                    cleared.push((dataset, removed));
                },
                Err(e) => {
                    error!(%dataset, error = %e, "Failed to clear collection for rebuild");
                    failed.push((dataset, e.to_string()));
                },
            }
        }
        (cleared, failed)
    }

    /// Backfill or repair one source over an explicit year range
    pub async fn sync_one(&self, source_id: &str, start_year: i32, end_year: i32) -> Result<SourceReport> {
        let source = self
            .sources
            .iter()
            .find(|s| s.id == source_id)
            .ok_or_else(|| IngestError::UnknownSource(source_id.to_string()))?;

        if start_year > end_year {
            return Err(IngestError::InvalidYearRange { start: start_year, end: end_year });
        }

        let reconciler = Reconciler::new(Arc::clone(&self.store));
        reconciler.prepare(source.dataset).await?;

        let report = SyncJob::new(source.clone(), reconciler)
            .with_max_reported_issues(self.max_reported_issues)
            .run(start_year, end_year)
            .await;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incremental_window() {
        let w = YearWindow::for_mode(SyncMode::Incremental, 1980, 2026);
        assert_eq!(w, YearWindow { start: 2025, end: 2026 });
    }

    #[test]
    fn test_full_window_starts_at_earliest_year() {
        let w = YearWindow::for_mode(SyncMode::Full, 1995, 2026);
        assert_eq!(w, YearWindow { start: 1995, end: 2026 });
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("recent".parse::<SyncMode>(), Ok(SyncMode::Incremental));
        assert_eq!("FULL".parse::<SyncMode>(), Ok(SyncMode::Full));
        assert!("weekly".parse::<SyncMode>().is_err());
    }
}
