//! IAGA-2002 text as served by the Kyoto WDC (Dst hourly, AE one-minute)
//!
//! ```text
//! DATE       TIME         DOY     DST  |
//! 2005-01-01 03:00:00.000 001      -12
//! ```
//!
//! Header lines begin with a space (`" Format  IAGA-2002 |"`) or with `DATE`.

use super::{fail, int, utc, value_or_fill, RecordDecoder};
use crate::error::DecodeError;
use crate::record::{AeRecord, Dataset, DstRecord, IndexRecord};
use crate::source::RawUnit;

/// Fill markers used by Kyoto in IAGA-2002 output
const FILLS: &[f64] = &[99999.0, 9999.0];

pub struct IagaDecoder {
    dataset: Dataset,
}

impl IagaDecoder {
    pub fn dst() -> Self {
        Self { dataset: Dataset::Dst }
    }

    pub fn ae() -> Self {
        Self { dataset: Dataset::Ae }
    }

    fn decode_line(&self, line: &str) -> Result<IndexRecord, String> {
        let cols: Vec<&str> = line.split_whitespace().collect();
        let wanted = match self.dataset {
            Dataset::Ae => 7,
            _ => 4,
        };
        if cols.len() < wanted {
            return Err(format!("expected {} columns, found {}", wanted, cols.len()));
        }

        let time = parse_date_time(cols[0], cols[1])?;
        let value = |i: usize| value_or_fill(cols[i], FILLS);

        match self.dataset {
            Dataset::Ae => Ok(IndexRecord::Ae(AeRecord {
                time,
                ae: value(3)?,
                au: value(4)?,
                al: value(5)?,
                ao: value(6)?,
            })),
            _ => Ok(IndexRecord::Dst(DstRecord { time, dst: value(3)? })),
        }
    }
}

/// `2005-01-01` + `03:00:00.000`
fn parse_date_time(date: &str, time: &str) -> Result<chrono::DateTime<chrono::Utc>, String> {
    if date.len() < 10 || time.len() < 8 {
        return Err(format!("bad date/time {:?} {:?}", date, time));
    }
    let part = |s: &str, a: usize, b: usize, what: &str| -> Result<u32, String> {
        s.get(a..b).ok_or_else(|| format!("bad {}", what)).and_then(|t| int(t, what))
    };
    let year: i32 = date
        .get(0..4)
        .ok_or_else(|| "bad year".to_string())
        .and_then(|t| int(t, "year"))?;
    utc(
        year,
        part(date, 5, 7, "month")?,
        part(date, 8, 10, "day")?,
        part(time, 0, 2, "hour")?,
        part(time, 3, 5, "minute")?,
        part(time, 6, 8, "second")?,
    )
}

impl RecordDecoder for IagaDecoder {
    fn dataset(&self) -> Dataset {
        self.dataset
    }

    fn is_header(&self, raw: &RawUnit) -> bool {
        // IAGA-2002 header and comment records end in `|`
        let line = raw.line.trim();
        line.ends_with('|') || line.starts_with("DATE") || line.starts_with('#')
    }

    fn decode(&self, raw: &RawUnit) -> Result<IndexRecord, DecodeError> {
        self.decode_line(&raw.line).map_err(|cause| fail(self.dataset, raw, cause))
    }
}
