//! Index record data model
//!
//! A record is one decoded sample of one geophysical index. Each dataset has
//! its own concrete struct; [`IndexRecord`] is the tagged union the pipeline
//! passes around. All variants share the `(dataset, time)` envelope through
//! [`IndexSample`], and sources that emit several records per timestamp add a
//! discriminator to form the [`NaturalKey`].

pub mod indices;
pub mod kp;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use indices::{AeRecord, DstRecord, KpRecord, OmniRecord, PoesRecord, TecRecord};
pub use kp::{KpError, KpModifier, KpValue};

/// Stored projection of a record
pub type Document = serde_json::Map<String, Value>;

/// One named geophysical index series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dataset {
    Dst,
    Kp,
    #[serde(rename = "AE")]
    Ae,
    Omni,
    #[serde(rename = "POES")]
    Poes,
    #[serde(rename = "TEC")]
    Tec,
}

impl Dataset {
    pub const ALL: [Dataset; 6] = [
        Dataset::Dst,
        Dataset::Kp,
        Dataset::Ae,
        Dataset::Omni,
        Dataset::Poes,
        Dataset::Tec,
    ];

    /// Store collection holding this dataset
    pub fn collection(self) -> &'static str {
        match self {
            Dataset::Dst => "dst",
            Dataset::Kp => "kp",
            Dataset::Ae => "ae",
            Dataset::Omni => "omni",
            Dataset::Poes => "poes",
            Dataset::Tec => "tec",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Dataset::Dst => "Dst",
            Dataset::Kp => "Kp",
            Dataset::Ae => "AE",
            Dataset::Omni => "Omni",
            Dataset::Poes => "POES",
            Dataset::Tec => "TEC",
        }
    }

    /// Provenance line stored with every document
    pub fn info(self) -> &'static str {
        match self {
            Dataset::Dst | Dataset::Ae => {
                "These data were downloaded from WDC For Geomagnetism, Kyoto.  *Please be courteous and give credit to data providers when credit is due.*"
            },
            Dataset::Kp => {
                "These data were downloaded from the GFZ German Research Centre for Geosciences, Potsdam.  *Please be courteous and give credit to data providers when credit is due.*"
            },
            Dataset::Omni => {
                "These data were downloaded from NASA SPDF.  *Please be courteous and give credit to data providers when credit is due.*"
            },
            Dataset::Poes => {
                "These data were downloaded from NOAA NGDC/NCEI.  *Please be courteous and give credit to data providers when credit is due.*"
            },
            Dataset::Tec => {
                "These data were downloaded from Madrigal.  *Please be courteous and give credit to data providers when credit is due.*"
            },
        }
    }

    /// First year the upstream archive covers
    pub fn earliest_year(self) -> i32 {
        match self {
            Dataset::Dst | Dataset::Kp | Dataset::Ae => 1980,
            Dataset::Omni => 1995,
            Dataset::Poes => 1998,
            Dataset::Tec => 2000,
        }
    }

    /// Whether a full run wipes the collection before refilling it
    pub fn rebuilds_on_full(self) -> bool {
        matches!(self, Dataset::Omni | Dataset::Poes)
    }

    /// Scalar numeric fields that are indexed and usable in value filters
    pub fn queryable_fields(self) -> &'static [&'static str] {
        match self {
            Dataset::Dst => &["dst"],
            Dataset::Ae => &["ae", "au", "al", "ao"],
            Dataset::Kp => &["ap_mean", "cp", "sunspot", "f107"],
            Dataset::Omni => &[
                "res", "timeshift", "b_mag_avg", "bx", "by_gse", "bz_gse", "by_gsm", "bz_gsm",
                "flow_speed", "vx", "vy", "vz", "np", "temp", "p_dyn", "e_field", "beta",
                "mach_num", "ae", "al", "au", "sym_d", "sym_h", "asy_d", "asy_h",
            ],
            Dataset::Poes => &[
                "satnum", "glat", "glon", "alt", "lval", "mlt", "folat", "folon", "ted", "echar",
                "pchar", "econtrib",
            ],
            Dataset::Tec => &["glat", "glon", "tec", "dtec"],
        }
    }

    pub fn is_queryable(self, field: &str) -> bool {
        self.queryable_fields().contains(&field)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for Dataset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Dataset::ALL
            .into_iter()
            .find(|d| d.collection() == wanted)
            .ok_or_else(|| format!("unknown dataset '{}'", s))
    }
}

/// Minimal attribute tuple that identifies one stored record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub dataset: Dataset,
    pub time: DateTime<Utc>,
    pub discriminator: Option<String>,
}

impl NaturalKey {
    /// Stable text form used for equality lookups in the store
    pub fn canonical(&self) -> String {
        let time = self.time.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        match &self.discriminator {
            Some(extra) => format!("{}|{}", time, extra),
            None => time,
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.dataset.collection(), self.canonical())
    }
}

/// Shared envelope of every concrete record type
pub trait IndexSample {
    const DATASET: Dataset;

    fn time(&self) -> DateTime<Utc>;

    /// Extra key component for datasets with several records per timestamp
    fn discriminator(&self) -> Option<String> {
        None
    }

    fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            dataset: Self::DATASET,
            time: self.time(),
            discriminator: self.discriminator(),
        }
    }
}

/// A decoded sample of any dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dataset")]
pub enum IndexRecord {
    Dst(DstRecord),
    Kp(KpRecord),
    #[serde(rename = "AE")]
    Ae(AeRecord),
    Omni(OmniRecord),
    #[serde(rename = "POES")]
    Poes(PoesRecord),
    #[serde(rename = "TEC")]
    Tec(TecRecord),
}

macro_rules! each_variant {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            IndexRecord::Dst($inner) => $body,
            IndexRecord::Kp($inner) => $body,
            IndexRecord::Ae($inner) => $body,
            IndexRecord::Omni($inner) => $body,
            IndexRecord::Poes($inner) => $body,
            IndexRecord::Tec($inner) => $body,
        }
    };
}

impl IndexRecord {
    pub fn dataset(&self) -> Dataset {
        match self {
            IndexRecord::Dst(_) => Dataset::Dst,
            IndexRecord::Kp(_) => Dataset::Kp,
            IndexRecord::Ae(_) => Dataset::Ae,
            IndexRecord::Omni(_) => Dataset::Omni,
            IndexRecord::Poes(_) => Dataset::Poes,
            IndexRecord::Tec(_) => Dataset::Tec,
        }
    }

    pub fn time(&self) -> DateTime<Utc> {
        each_variant!(self, r => r.time())
    }

    pub fn natural_key(&self) -> NaturalKey {
        each_variant!(self, r => r.natural_key())
    }

    /// Document persisted for this record: present fields plus `dataset` and `info`
    pub fn to_document(&self) -> Result<Document, serde_json::Error> {
        let mut doc = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            other => {
                return Err(serde::ser::Error::custom(format!(
                    "record serialized to non-object {}",
                    other
                )))
            },
        };
        doc.insert("info".to_string(), Value::String(self.dataset().info().to_string()));
        Ok(doc)
    }

    /// Rebuild a record from a stored document
    pub fn from_document(doc: &Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(doc.clone()))
    }
}

macro_rules! impl_from_record {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for IndexRecord {
                fn from(record: $ty) -> Self {
                    IndexRecord::$variant(record)
                }
            }
        )*
    };
}

impl_from_record!(
    Dst => DstRecord,
    Kp => KpRecord,
    Ae => AeRecord,
    Omni => OmniRecord,
    Poes => PoesRecord,
    Tec => TecRecord,
);

impl fmt::Display for IndexRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} record FROM: {}", self.dataset(), self.time())?;
        let doc = self.to_document().map_err(|_| fmt::Error)?;
        for (key, value) in doc.iter().filter(|(k, _)| k.as_str() != "info") {
            writeln!(f, "{} = {}", key, value)?;
        }
        Ok(())
    }
}

/// Numeric value of `field` in a stored document, `None` when absent
pub fn document_number(doc: &Document, field: &str) -> Option<f64> {
    doc.get(field).and_then(Value::as_f64)
}
