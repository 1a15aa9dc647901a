//! One source's fetch -> decode -> reconcile loop over a year range
//!
//! Years run strictly in order, one at a time, and each year's batch is
//! dropped before the next fetch. Nothing that goes wrong inside a year
//! escapes the job: failures become [`SyncIssue`]s in the [`SourceReport`].

use std::time::Instant;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::ReconcileError;
use crate::reconcile::{Reconciler, UpsertOutcome};
use crate::record::{Dataset, IndexRecord};
use crate::source::{FetchRange, IngestSource};

pub const DEFAULT_MAX_REPORTED_ISSUES: usize = 100;

/// Something a job skipped or could not do
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncIssue {
    Fetch { year: i32, cause: String },
    Decode { year: i32, raw: String, cause: String },
    Integrity { key: String, matches: usize },
    Store { key: String, cause: String },
    /// Every decoded record of the year failed to store
    YearStoreFailure { year: i32, records: usize },
    /// The job never ran
    Launch { cause: String },
}

/// Outcome of one source's run
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub dataset: Dataset,
    pub launched: bool,
    pub years_attempted: Vec<i32>,
    pub failed_years: Vec<i32>,
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
    pub issues: Vec<SyncIssue>,
    /// Issues beyond the reporting cap; they were still logged
    pub issues_omitted: usize,
    pub duration_secs: f64,
    #[serde(skip)]
    max_issues: usize,
}

impl SourceReport {
    pub fn new(source: impl Into<String>, dataset: Dataset, max_issues: usize) -> Self {
        Self {
            source: source.into(),
            dataset,
            launched: true,
            years_attempted: Vec::new(),
            failed_years: Vec::new(),
            inserted: 0,
            updated: 0,
            skipped: 0,
            issues: Vec::new(),
            issues_omitted: 0,
            duration_secs: 0.0,
            max_issues,
        }
    }

    /// Report for a job that could not be started
    pub fn launch_failed(source: impl Into<String>, dataset: Dataset, cause: impl std::fmt::Display) -> Self {
        let mut report = Self::new(source, dataset, 1);
        report.launched = false;
        report.record_issue(SyncIssue::Launch { cause: cause.to_string() });
        report
    }

    pub fn record_issue(&mut self, issue: SyncIssue) {
        if self.issues.len() < self.max_issues {
            self.issues.push(issue);
        } else {
            self.issues_omitted += 1;
        }
    }

    fn fail_year(&mut self, year: i32) {
        if self.failed_years.last() != Some(&year) {
            self.failed_years.push(year);
        }
    }

    /// Launched, and every attempted year completed
    pub fn succeeded(&self) -> bool {
        self.launched && self.failed_years.is_empty()
    }

    pub fn issue_count(&self) -> usize {
        self.issues.len() + self.issues_omitted
    }
}

pub struct SyncJob {
    source: IngestSource,
    reconciler: Reconciler,
    max_reported_issues: usize,
}

impl SyncJob {
    pub fn new(source: IngestSource, reconciler: Reconciler) -> Self {
        Self {
            source,
            reconciler,
            max_reported_issues: DEFAULT_MAX_REPORTED_ISSUES,
        }
    }

    pub fn with_max_reported_issues(mut self, max: usize) -> Self {
        self.max_reported_issues = max;
        self
    }

    pub fn source(&self) -> &IngestSource {
        &self.source
    }

    /// Sync `start_year..=end_year`. An inverted range attempts nothing.
    #[instrument(skip(self), fields(source = %self.source.id, dataset = %self.source.dataset))]
    pub async fn run(&self, start_year: i32, end_year: i32) -> SourceReport {
        let started = Instant::now();
        let mut report = SourceReport::new(&self.source.id, self.source.dataset, self.max_reported_issues);

        for year in start_year..=end_year {
            report.years_attempted.push(year);
            self.sync_year(year, &mut report).await;
        }

        report.duration_secs = started.elapsed().as_secs_f64();
        info!(
            years = report.years_attempted.len(),
            failed_years = report.failed_years.len(),
            inserted = report.inserted,
            updated = report.updated,
            skipped = report.skipped,
            "Sync job finished"
        );
        report
    }

    async fn sync_year(&self, year: i32, report: &mut SourceReport) {
        let source = &self.source;
        let range = FetchRange::year(year);

        let units = match source.client.fetch(&range).await {
            Ok(units) => units,
            Err(e) => {
                warn!(source = %source.id, year, error = %e, "Fetch failed, skipping year");
                report.fail_year(year);
                report.record_issue(SyncIssue::Fetch { year, cause: e.cause });
                return;
            },
        };

        let mut batch: Vec<IndexRecord> = Vec::with_capacity(units.len());
        for unit in &units {
            if source.decoder.is_header(unit) {
                continue;
            }
            match source.decoder.decode(unit) {
                Ok(record) => batch.push(record),
                Err(e) => {
                    warn!(source = %source.id, year, raw = %e.raw, error = %e.cause, "Skipping undecodable unit");
                    report.skipped += 1;
                    report.record_issue(SyncIssue::Decode { year, raw: e.raw, cause: e.cause });
                },
            }
        }
        drop(units);

        let mut store_failures = 0usize;
        for record in &batch {
            match self.reconciler.upsert(record).await {
                Ok(UpsertOutcome::Inserted(_)) => report.inserted += 1,
                Ok(UpsertOutcome::Updated(_)) => report.updated += 1,
                Err(ReconcileError::Integrity { key, matches }) => {
                    report.skipped += 1;
                    report.record_issue(SyncIssue::Integrity { key: key.to_string(), matches });
                },
                Err(ReconcileError::Store(e)) => {
                    let key = record.natural_key();
                    warn!(source = %source.id, key = %key, error = %e, "Store failed, skipping record");
                    store_failures += 1;
                    report.skipped += 1;
                    report.record_issue(SyncIssue::Store { key: key.to_string(), cause: e.to_string() });
                },
            }
        }

        if !batch.is_empty() && store_failures == batch.len() {
            warn!(source = %source.id, year, records = batch.len(), "Every record of the year failed to store");
            report.fail_year(year);
            report.record_issue(SyncIssue::YearStoreFailure { year, records: batch.len() });
        }

        info!(source = %source.id, year, records = batch.len(), "Year synced");
    }
}
