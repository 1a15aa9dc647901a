//! Concrete record types, one per dataset
//!
//! Every field except `time` (and the key discriminators) is optional: `None`
//! means the source did not report a value. Absent fields are left out of the
//! stored projection entirely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Dataset, IndexSample, KpValue};

/// Hourly Dst sample (WDC for Geomagnetism, Kyoto)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DstRecord {
    pub time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst: Option<f64>,
}

impl IndexSample for DstRecord {
    const DATASET: Dataset = Dataset::Dst;

    fn time(&self) -> DateTime<Utc> {
        self.time
    }
}

/// One-minute auroral electrojet sample (WDC for Geomagnetism, Kyoto)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AeRecord {
    pub time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ae: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub au: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub al: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ao: Option<f64>,
}

impl IndexSample for AeRecord {
    const DATASET: Dataset = Dataset::Ae;

    fn time(&self) -> DateTime<Utc> {
        self.time
    }
}

/// One UT day of three-hourly Kp/ap values (GFZ Potsdam WDC files)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpRecord {
    pub time: DateTime<Utc>,
    /// Up to eight three-hourly Kp values, in time order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kp: Vec<KpValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ap: Vec<i32>,
    /// Daily Kp sum in text form, e.g. "14-"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kp_sum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ap_mean: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunspot: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f107: Option<f64>,
}

impl IndexSample for KpRecord {
    const DATASET: Dataset = Dataset::Kp;

    fn time(&self) -> DateTime<Utc> {
        self.time
    }
}

/// High-resolution OMNI solar wind and IMF sample (NASA SPDF)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OmniRecord {
    pub time: DateTime<Utc>,
    /// Time resolution in minutes (1 or 5)
    pub res: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeshift: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b_mag_avg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_gse: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bz_gse: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_gsm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bz_gsm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vz: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub np: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_dyn: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e_field: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mach_num: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ae: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub al: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub au: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sym_d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sym_h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asy_d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asy_h: Option<f64>,
}

impl IndexSample for OmniRecord {
    const DATASET: Dataset = Dataset::Omni;

    fn time(&self) -> DateTime<Utc> {
        self.time
    }

    fn discriminator(&self) -> Option<String> {
        Some(format!("res={}", self.res))
    }
}

/// Averaged POES particle sample for one satellite (NOAA)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PoesRecord {
    pub time: DateTime<Utc>,
    /// Satellite number: 15..=19 for NOAA, 1..=3 for MetOp
    pub satnum: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lval: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mlt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ted: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub echar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pchar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub econtrib: Option<f64>,
}

impl IndexSample for PoesRecord {
    const DATASET: Dataset = Dataset::Poes;

    fn time(&self) -> DateTime<Utc> {
        self.time
    }

    fn discriminator(&self) -> Option<String> {
        Some(format!("sat={}", self.satnum))
    }
}

/// GPS total electron content at one geographic cell (Madrigal)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TecRecord {
    pub time: DateTime<Utc>,
    pub glat: f64,
    pub glon: f64,
    /// TECU (1e16 electrons/m^2)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tec: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtec: Option<f64>,
}

impl IndexSample for TecRecord {
    const DATASET: Dataset = Dataset::Tec;

    fn time(&self) -> DateTime<Utc> {
        self.time
    }

    fn discriminator(&self) -> Option<String> {
        Some(format!("glat={:.2},glon={:.2}", self.glat, self.glon))
    }
}
