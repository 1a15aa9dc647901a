//! Per-format decoders: one raw unit in, one typed record out
//!
//! Decoding is pure. Header and comment lines are recognised by
//! [`RecordDecoder::is_header`] and skipped by the caller; anything else that
//! does not decode is a [`DecodeError`].

pub mod iaga;
pub mod kp;
pub mod omni;
pub mod poes;
pub mod tec;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::DecodeError;
use crate::record::{Dataset, IndexRecord};
use crate::source::RawUnit;

pub use iaga::IagaDecoder;
pub use kp::KpDecoder;
pub use omni::OmniDecoder;
pub use poes::PoesDecoder;
pub use tec::TecDecoder;

pub trait RecordDecoder: Send + Sync {
    fn dataset(&self) -> Dataset;

    /// Whether `raw` is preamble rather than data
    fn is_header(&self, _raw: &RawUnit) -> bool {
        false
    }

    fn decode(&self, raw: &RawUnit) -> Result<IndexRecord, DecodeError>;
}

/// Shorthand for building a [`DecodeError`] for `raw`
pub(crate) fn fail(dataset: Dataset, raw: &RawUnit, cause: impl std::fmt::Display) -> DecodeError {
    DecodeError::new(dataset, raw.line.clone(), cause)
}

/// Whitespace token as a float, or `None` when it equals one of the fill values
pub(crate) fn value_or_fill(token: &str, fills: &[f64]) -> Result<Option<f64>, String> {
    let value: f64 = token
        .parse()
        .map_err(|_| format!("{:?} is not a number", token))?;
    if !value.is_finite() || fills.iter().any(|fill| (value - fill).abs() < f64::EPSILON) {
        return Ok(None);
    }
    Ok(Some(value))
}

pub(crate) fn utc(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Result<DateTime<Utc>, String> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .map(|t| t.and_utc())
        .ok_or_else(|| {
            format!(
                "invalid timestamp {:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            )
        })
}

pub(crate) fn int<T: std::str::FromStr>(token: &str, what: &str) -> Result<T, String> {
    token
        .trim()
        .parse()
        .map_err(|_| format!("bad {} {:?}", what, token))
}
