//! NOAA POES averaged daily text rows
//!
//! Row layout (whitespace separated):
//! `year month day hour minute second glat glon alt lval mlt folat folon ted echar pchar econtrib`.
//! The satellite is not in the row; it comes from the file the row was read
//! from (`n15`, `m02`, ...), carried as the raw unit's origin. Values at or
//! below -999 are fill.

use super::{fail, int, utc, RecordDecoder};
use crate::error::DecodeError;
use crate::record::{Dataset, IndexRecord, PoesRecord};
use crate::source::RawUnit;

const COLUMNS: usize = 17;
const FILL_CEILING: f64 = -999.0;

#[derive(Debug, Default)]
pub struct PoesDecoder;

impl PoesDecoder {
    pub fn new() -> Self {
        Self
    }

    fn decode_line(&self, raw: &RawUnit) -> Result<IndexRecord, String> {
        let origin = raw.origin.as_deref().ok_or("row has no satellite origin")?;
        let satnum = satellite_number(origin)?;

        let cols: Vec<&str> = raw.line.split_whitespace().collect();
        if cols.len() < COLUMNS {
            return Err(format!("expected {} columns, found {}", COLUMNS, cols.len()));
        }

        let seconds: f64 = cols[5].parse().map_err(|_| format!("bad second {:?}", cols[5]))?;
        if !(0.0..60.0).contains(&seconds) {
            return Err(format!("second {} out of range", seconds));
        }
        let time = utc(
            int(cols[0], "year")?,
            int(cols[1], "month")?,
            int(cols[2], "day")?,
            int(cols[3], "hour")?,
            int(cols[4], "minute")?,
            seconds.trunc() as u32,
        )?;

        let value = |i: usize| -> Result<Option<f64>, String> {
            let v: f64 = cols[i]
                .parse()
                .map_err(|_| format!("column {} is not a number: {:?}", i, cols[i]))?;
            Ok((v.is_finite() && v > FILL_CEILING).then_some(v))
        };

        Ok(IndexRecord::Poes(PoesRecord {
            time,
            satnum,
            glat: value(6)?,
            glon: value(7)?,
            alt: value(8)?,
            lval: value(9)?,
            mlt: value(10)?,
            folat: value(11)?,
            folon: value(12)?,
            ted: value(13)?,
            echar: value(14)?,
            pchar: value(15)?,
            econtrib: value(16)?,
        }))
    }
}

/// `n15` -> 15, `m02` -> 2
pub fn satellite_number(origin: &str) -> Result<u16, String> {
    let digits = origin
        .strip_prefix('n')
        .or_else(|| origin.strip_prefix('m'))
        .ok_or_else(|| format!("unknown satellite {:?}", origin))?;
    int(digits, "satellite number")
}

impl RecordDecoder for PoesDecoder {
    fn dataset(&self) -> Dataset {
        Dataset::Poes
    }

    fn is_header(&self, raw: &RawUnit) -> bool {
        raw.line
            .trim_start()
            .chars()
            .next()
            .is_some_and(|c| c == '#' || c.is_ascii_alphabetic())
    }

    fn decode(&self, raw: &RawUnit) -> Result<IndexRecord, DecodeError> {
        self.decode_line(raw).map_err(|cause| fail(Dataset::Poes, raw, cause))
    }
}
