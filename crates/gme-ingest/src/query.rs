//! Read path: range queries over stored records
//!
//! A query selects one dataset, optionally narrows it to a time window, and
//! applies value predicates on the dataset's queryable fields. Absent values
//! never satisfy a range predicate; [`FieldPredicate::Unset`] selects exactly
//! those.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::error::{IngestError, Result};
use crate::record::{document_number, Dataset, IndexRecord};
use crate::store::{RecordStore, StoredDocument};

/// Inclusive time window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(IngestError::InvalidQuery(format!(
                "window end {} is before start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Window from `start`; a missing end means one day after `start`
    pub fn from_start(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<Self> {
        Self::new(start, end.unwrap_or(start + Duration::days(1)))
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldPredicate {
    /// Inclusive range; absent values never match
    Between(f64, f64),
    /// Matches only documents where the field is absent
    Unset,
}

impl FieldPredicate {
    /// Range predicate with bounds put in order
    pub fn between(a: f64, b: f64) -> Self {
        if a <= b {
            FieldPredicate::Between(a, b)
        } else {
            FieldPredicate::Between(b, a)
        }
    }

    pub fn matches(&self, value: Option<f64>) -> bool {
        match (self, value) {
            (FieldPredicate::Between(lo, hi), Some(v)) => *lo <= v && v <= *hi,
            (FieldPredicate::Between(..), None) => false,
            (FieldPredicate::Unset, value) => value.is_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValuePredicate {
    pub field: String,
    pub predicate: FieldPredicate,
}

impl fmt::Display for ValuePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.predicate {
            FieldPredicate::Between(lo, hi) => write!(f, "{}={}:{}", self.field, lo, hi),
            FieldPredicate::Unset => write!(f, "{}=unset", self.field),
        }
    }
}

/// `field=lo:hi` or `field=unset`
impl FromStr for ValuePredicate {
    type Err = IngestError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bad = || IngestError::InvalidQuery(format!("expected field=lo:hi or field=unset, got {:?}", s));
        let (field, rhs) = s.split_once('=').ok_or_else(bad)?;
        let field = field.trim();
        if field.is_empty() {
            return Err(bad());
        }
        let predicate = if rhs.trim().eq_ignore_ascii_case("unset") {
            FieldPredicate::Unset
        } else {
            let (lo, hi) = rhs.split_once(':').ok_or_else(bad)?;
            let lo: f64 = lo.trim().parse().map_err(|_| bad())?;
            let hi: f64 = hi.trim().parse().map_err(|_| bad())?;
            FieldPredicate::between(lo, hi)
        };
        Ok(Self { field: field.to_string(), predicate })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub dataset: Dataset,
    pub window: Option<TimeWindow>,
    pub predicates: Vec<ValuePredicate>,
}

impl RecordQuery {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset, window: None, predicates: Vec::new() }
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn between(mut self, field: impl Into<String>, lo: f64, hi: f64) -> Self {
        self.predicates.push(ValuePredicate {
            field: field.into(),
            predicate: FieldPredicate::between(lo, hi),
        });
        self
    }

    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.predicates.push(ValuePredicate { field: field.into(), predicate: FieldPredicate::Unset });
        self
    }

    pub fn with_predicate(mut self, predicate: ValuePredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Reject predicates on fields the dataset cannot filter by
    pub fn validate(&self) -> Result<()> {
        for p in &self.predicates {
            if !self.dataset.is_queryable(&p.field) {
                return Err(IngestError::InvalidQuery(format!(
                    "{} has no queryable field '{}' (expected one of: {})",
                    self.dataset,
                    p.field,
                    self.dataset.queryable_fields().join(", ")
                )));
            }
            if let FieldPredicate::Between(lo, hi) = p.predicate {
                if !lo.is_finite() || !hi.is_finite() {
                    return Err(IngestError::InvalidQuery(format!("non-finite bound in {}", p)));
                }
            }
        }
        Ok(())
    }

    /// Whether a stored document satisfies every part of the query
    pub fn matches(&self, stored: &StoredDocument) -> bool {
        stored.dataset == self.dataset
            && self.window.map_or(true, |w| w.contains(stored.time))
            && self
                .predicates
                .iter()
                .all(|p| p.predicate.matches(document_number(&stored.doc, &p.field)))
    }
}

/// Run `query` and decode the matches, oldest first
///
/// An empty result is not an error. Documents that no longer decode are
/// logged and left out.
pub async fn read_records(store: &dyn RecordStore, query: &RecordQuery) -> Result<Vec<IndexRecord>> {
    query.validate()?;

    let mut stored = store.query(query).await?;
    stored.sort_by_key(|s| s.time);

    let mut records = Vec::with_capacity(stored.len());
    for doc in stored {
        match IndexRecord::from_document(&doc.doc) {
            Ok(record) => records.push(record),
            Err(e) => warn!(id = %doc.id, key = %doc.key, error = %e, "Stored document does not decode"),
        }
    }

    debug!(dataset = %query.dataset, found = records.len(), "Query complete");
    Ok(records)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_defaults_to_one_day() {
        let start = Utc.with_ymd_and_hms(2011, 3, 1, 0, 0, 0).unwrap();
        let window = TimeWindow::from_start(start, None).unwrap();
        assert_eq!(window.end, Utc.with_ymd_and_hms(2011, 3, 2, 0, 0, 0).unwrap());
        assert!(TimeWindow::new(window.end, window.start).is_err());
    }

    #[test]
    fn test_between_normalizes_bounds() {
        assert_eq!(FieldPredicate::between(5.0, -5.0), FieldPredicate::Between(-5.0, 5.0));
        assert!(FieldPredicate::between(5.0, -5.0).matches(Some(0.0)));
        assert!(FieldPredicate::between(-5.0, 5.0).matches(Some(5.0)));
        assert!(!FieldPredicate::between(-5.0, 5.0).matches(None));
    }

    #[test]
    fn test_unset_matches_only_absent() {
        assert!(FieldPredicate::Unset.matches(None));
        assert!(!FieldPredicate::Unset.matches(Some(0.0)));
    }

    #[test]
    fn test_parse_predicates() {
        let p: ValuePredicate = "dst=-50:0".parse().unwrap();
        assert_eq!(p.field, "dst");
        assert_eq!(p.predicate, FieldPredicate::Between(-50.0, 0.0));
        let p: ValuePredicate = "tec=unset".parse().unwrap();
        assert_eq!(p.predicate, FieldPredicate::Unset);
        assert!("dst".parse::<ValuePredicate>().is_err());
        assert!("dst=1".parse::<ValuePredicate>().is_err());
        assert!("=1:2".parse::<ValuePredicate>().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_fields() {
        assert!(RecordQuery::new(Dataset::Dst).between("dst", -1.0, 1.0).validate().is_ok());
        assert!(RecordQuery::new(Dataset::Dst).between("tec", -1.0, 1.0).validate().is_err());
        assert!(RecordQuery::new(Dataset::Dst).between("dst", f64::NAN, 1.0).validate().is_err());
    }
}
