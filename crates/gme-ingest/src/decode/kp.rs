//! GFZ Kp/ap daily lines in the fixed-width WDC exchange format
//!
//! | columns | content |
//! |---|---|
//! | 0-5 | `yymmdd` |
//! | 6-11 | Bartels rotation and day |
//! | 12-27 | eight Kp values, two chars each, in thirds (`17` = 2-) |
//! | 28-30 | daily Kp sum, same encoding |
//! | 31-54 | eight ap values, three chars each |
//! | 55-57 | daily Ap |
//! | 58-60 | Cp |
//! | 62-64 | sunspot number |
//! | 65-69 | F10.7 flux |
//!
//! Trailing fields are missing on preliminary lines. A blank field is absent;
//! every other value, nines included, is a measurement.

use super::{fail, utc, RecordDecoder};
use crate::error::DecodeError;
use crate::record::{Dataset, IndexRecord, KpRecord, KpValue};
use crate::source::RawUnit;

/// Two-digit years below this belong to the 2000s
const CENTURY_PIVOT: i32 = 32;

/// Shortest line carrying the date and the Kp block
const MIN_LINE_LEN: usize = 28;

#[derive(Debug, Default)]
pub struct KpDecoder;

impl KpDecoder {
    pub fn new() -> Self {
        Self
    }

    fn decode_line(&self, line: &str) -> Result<IndexRecord, String> {
        if !line.is_ascii() {
            return Err("non-ASCII characters in fixed-width line".to_string());
        }
        if line.len() < MIN_LINE_LEN {
            return Err(format!("line too short ({} chars)", line.len()));
        }

        let yy: i32 = number(line, 0, 2)?.ok_or("missing year")?;
        let month: u32 = number(line, 2, 4)?.ok_or("missing month")?;
        let day: u32 = number(line, 4, 6)?.ok_or("missing day")?;
        let year = if yy < CENTURY_PIVOT { 2000 + yy } else { 1900 + yy };
        let time = utc(year, month, day, 0, 0, 0)?;

        let mut kp = Vec::with_capacity(8);
        for slot in 0..8 {
            let start = 12 + slot * 2;
            match number::<u16>(line, start, start + 2)? {
                Some(tenths) => kp.push(KpValue::from_wdc_tenths(tenths).map_err(|e| e.to_string())?),
                None => break,
            }
        }

        let mut ap = Vec::with_capacity(8);
        for slot in 0..8 {
            let start = 31 + slot * 3;
            match number::<i32>(line, start, start + 3)? {
                Some(value) => ap.push(value),
                None => break,
            }
        }

        Ok(IndexRecord::Kp(KpRecord {
            time,
            kp,
            ap,
            kp_sum: number::<u16>(line, 28, 31)?.map(format_kp_sum),
            ap_mean: number(line, 55, 58)?,
            cp: number(line, 58, 61)?,
            sunspot: number(line, 62, 65)?,
            f107: number(line, 65, 70)?,
        }))
    }
}

/// Fixed-width field, `None` when the line is too short or the field is blank
fn number<T: std::str::FromStr>(line: &str, start: usize, end: usize) -> Result<Option<T>, String> {
    let Some(field) = line.get(start..end.min(line.len())).map(str::trim) else {
        return Ok(None);
    };
    if field.is_empty() {
        return Ok(None);
    }
    field
        .parse()
        .map(Some)
        .map_err(|_| format!("bad field {:?} at columns {}-{}", field, start, end - 1))
}

/// Daily sum in thirds: `137` -> `"14-"`, `140` -> `"14"`, `143` -> `"14+"`
pub fn format_kp_sum(tenths: u16) -> String {
    let whole = tenths / 10;
    match tenths % 10 {
        3 => format!("{}+", whole),
        7 => format!("{}-", whole + 1),
        _ => whole.to_string(),
    }
}

impl RecordDecoder for KpDecoder {
    fn dataset(&self) -> Dataset {
        Dataset::Kp
    }

    fn is_header(&self, raw: &RawUnit) -> bool {
        raw.line.starts_with('#')
    }

    fn decode(&self, raw: &RawUnit) -> Result<IndexRecord, DecodeError> {
        self.decode_line(&raw.line).map_err(|cause| fail(Dataset::Kp, raw, cause))
    }
}
