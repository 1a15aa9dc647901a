//! Madrigal isprint rows for GPS TEC
//!
//! `year month day hour min sec gdlat glon tec dtec`, with `missing` (or the
//! requested badval of -1) where a cell has no measurement.

use super::{fail, int, utc, RecordDecoder};
use crate::error::DecodeError;
use crate::record::{Dataset, IndexRecord, TecRecord};
use crate::source::RawUnit;

const COLUMNS: usize = 10;
const BADVAL: f64 = -1.0;

#[derive(Debug, Default)]
pub struct TecDecoder;

impl TecDecoder {
    pub fn new() -> Self {
        Self
    }

    fn decode_line(&self, line: &str) -> Result<IndexRecord, String> {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() < COLUMNS {
            return Err(format!("expected {} columns, found {}", COLUMNS, cols.len()));
        }

        let time = utc(
            int(cols[0], "year")?,
            int(cols[1], "month")?,
            int(cols[2], "day")?,
            int(cols[3], "hour")?,
            int(cols[4], "minute")?,
            int(cols[5], "second")?,
        )?;

        let coordinate = |i: usize, what: &str| -> Result<f64, String> {
            cols[i]
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("bad {} {:?}", what, cols[i]))
        };
        let measurement = |i: usize| -> Result<Option<f64>, String> {
            if cols[i].eq_ignore_ascii_case("missing") {
                return Ok(None);
            }
            let v: f64 = cols[i]
                .parse()
                .map_err(|_| format!("column {} is not a number: {:?}", i, cols[i]))?;
            Ok(((v - BADVAL).abs() > f64::EPSILON && v.is_finite()).then_some(v))
        };

        Ok(IndexRecord::Tec(TecRecord {
            time,
            glat: coordinate(6, "latitude")?,
            glon: coordinate(7, "longitude")?,
            tec: measurement(8)?,
            dtec: measurement(9)?,
        }))
    }
}

impl RecordDecoder for TecDecoder {
    fn dataset(&self) -> Dataset {
        Dataset::Tec
    }

    fn is_header(&self, raw: &RawUnit) -> bool {
        raw.line
            .trim_start()
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
    }

    fn decode(&self, raw: &RawUnit) -> Result<IndexRecord, DecodeError> {
        self.decode_line(&raw.line).map_err(|cause| fail(Dataset::Tec, raw, cause))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_isprint_row() {
        let raw = RawUnit::new("2011 3 1 0 2 30 42.00 -71.00 12.3 1.1");
        let IndexRecord::Tec(rec) = TecDecoder::new().decode(&raw).unwrap() else {
            panic!("expected a TEC record");
        };
        assert_eq!(rec.time.to_rfc3339(), "2011-03-01T00:02:30+00:00");
        assert_eq!(rec.glat, 42.0);
        assert_eq!(rec.glon, -71.0);
        assert_eq!(rec.tec, Some(12.3));
        assert_eq!(rec.dtec, Some(1.1));
    }

    #[test]
    fn test_missing_measurements_are_absent() {
        let decoder = TecDecoder::new();
        let IndexRecord::Tec(rec) = decoder
            .decode(&RawUnit::new("2011 3 1 0 2 30 42.00 -71.00 missing -1.0000e+00"))
            .unwrap()
        else {
            panic!("expected a TEC record");
        };
        assert_eq!(rec.tec, None);
        assert_eq!(rec.dtec, None);
    }

    #[test]
    fn test_header_and_bad_rows() {
        let decoder = TecDecoder::new();
        assert!(decoder.is_header(&RawUnit::new("YEAR MONTH DAY HOUR MIN SEC GDLAT GLON TEC DTEC")));
        assert!(decoder.decode(&RawUnit::new("2011 3 1 0 2 30 missing -71.00 12.3 1.1")).is_err());
        assert!(decoder.decode(&RawUnit::new("2011 3 1 0 2 30")).is_err());
    }
}
