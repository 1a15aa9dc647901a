//! High-resolution OMNI ASCII rows
//!
//! Columns are whitespace separated: year, day of year, hour, minute, then the
//! spacecraft/quality block and the measurements. Each column has its own
//! fill value in the OMNI HRO format description; only an exact match is
//! absent.

use chrono::Duration;

use super::{fail, int, utc, value_or_fill, RecordDecoder};
use crate::error::DecodeError;
use crate::record::{Dataset, IndexRecord, OmniRecord};
use crate::source::RawUnit;

/// Last column read from a row (ASY/H)
const LAST_COLUMN: usize = 43;

const FILL_TIMESHIFT: f64 = 999999.0;
const FILL_FIELD: f64 = 9999.99;
const FILL_SPEED: f64 = 99999.9;
const FILL_DENSITY: f64 = 999.99;
const FILL_TEMPERATURE: f64 = 9999999.0;
const FILL_PRESSURE: f64 = 99.99;
const FILL_E_BETA: f64 = 999.99;
const FILL_MACH: f64 = 999.9;
const FILL_INDEX: f64 = 99999.0;

pub struct OmniDecoder {
    res: u8,
}

impl OmniDecoder {
    /// Decoder for rows of the product with `res`-minute resolution
    pub fn new(res: u8) -> Self {
        Self { res }
    }

    fn decode_line(&self, line: &str) -> Result<IndexRecord, String> {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() <= LAST_COLUMN {
            return Err(format!("expected at least {} columns, found {}", LAST_COLUMN + 1, cols.len()));
        }

        let year: i32 = int(cols[0], "year")?;
        let doy: i64 = int(cols[1], "day of year")?;
        if !(1..=366).contains(&doy) {
            return Err(format!("day of year {} out of range", doy));
        }
        let time = utc(year, 1, 1, int(cols[2], "hour")?, int(cols[3], "minute")?, 0)?
            + Duration::days(doy - 1);

        let value = |i: usize, fill: f64| -> Result<Option<f64>, String> {
            value_or_fill(cols[i], &[fill]).map_err(|e| format!("column {}: {}", i, e))
        };

        Ok(IndexRecord::Omni(OmniRecord {
            time,
            res: self.res,
            timeshift: value(9, FILL_TIMESHIFT)?,
            b_mag_avg: value(13, FILL_FIELD)?,
            bx: value(14, FILL_FIELD)?,
            by_gse: value(15, FILL_FIELD)?,
            bz_gse: value(16, FILL_FIELD)?,
            by_gsm: value(17, FILL_FIELD)?,
            bz_gsm: value(18, FILL_FIELD)?,
            flow_speed: value(21, FILL_SPEED)?,
            vx: value(22, FILL_SPEED)?,
            vy: value(23, FILL_SPEED)?,
            vz: value(24, FILL_SPEED)?,
            np: value(25, FILL_DENSITY)?,
            temp: value(26, FILL_TEMPERATURE)?,
            p_dyn: value(27, FILL_PRESSURE)?,
            e_field: value(28, FILL_E_BETA)?,
            beta: value(29, FILL_E_BETA)?,
            mach_num: value(30, FILL_MACH)?,
            ae: value(37, FILL_INDEX)?,
            al: value(38, FILL_INDEX)?,
            au: value(39, FILL_INDEX)?,
            sym_d: value(40, FILL_INDEX)?,
            sym_h: value(41, FILL_INDEX)?,
            asy_d: value(42, FILL_INDEX)?,
            asy_h: value(43, FILL_INDEX)?,
        }))
    }
}

impl RecordDecoder for OmniDecoder {
    fn dataset(&self) -> Dataset {
        Dataset::Omni
    }

    fn decode(&self, raw: &RawUnit) -> Result<IndexRecord, DecodeError> {
        self.decode_line(&raw.line).map_err(|cause| fail(Dataset::Omni, raw, cause))
    }
}
