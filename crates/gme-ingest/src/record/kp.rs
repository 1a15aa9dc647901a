//! Graded Kp category values
//!
//! Kp is reported on a 28-step scale: a base integer 0..=9 refined by a
//! third-step modifier (`3-`, `3`, `3+`). Stored documents carry a single
//! float per value: `base + 0.3` for minus, `base + 0.5` for no modifier and
//! `base + 0.7` for plus. The WDC exchange format uses tenths instead
//! (`27` = 3-, `30` = 3, `33` = 3+).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance when matching an encoded fraction to a modifier slot
const FRACTION_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum KpError {
    #[error("Kp base {0} is outside 0..=9")]
    BaseOutOfRange(u8),

    #[error("Kp {0} is not on the Kp scale")]
    OffScale(String),

    #[error("encoded Kp {0} has no valid modifier fraction")]
    BadEncoding(f64),

    #[error("WDC Kp value {0} is not a multiple of a third")]
    BadWdcValue(u16),

    #[error("cannot parse Kp text {0:?}")]
    BadText(String),
}

/// Third-step refinement of a Kp base value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KpModifier {
    None,
    Minus,
    Plus,
}

impl KpModifier {
    /// Fraction added to the base in the stored encoding
    pub fn offset(self) -> f64 {
        match self {
            KpModifier::None => 0.5,
            KpModifier::Minus => 0.3,
            KpModifier::Plus => 0.7,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            KpModifier::None => "",
            KpModifier::Minus => "-",
            KpModifier::Plus => "+",
        }
    }

    fn from_offset(fraction: f64) -> Option<Self> {
        [KpModifier::Minus, KpModifier::None, KpModifier::Plus]
            .into_iter()
            .find(|m| (m.offset() - fraction).abs() < FRACTION_TOLERANCE)
    }
}

/// One graded Kp category value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct KpValue {
    base: u8,
    modifier: KpModifier,
}

impl KpValue {
    pub const MAX_BASE: u8 = 9;

    /// Build a value, rejecting combinations that do not exist on the scale (`0-`, `9+`)
    pub fn new(base: u8, modifier: KpModifier) -> Result<Self, KpError> {
        if base > Self::MAX_BASE {
            return Err(KpError::BaseOutOfRange(base));
        }
        let value = Self { base, modifier };
        match (base, modifier) {
            (0, KpModifier::Minus) | (Self::MAX_BASE, KpModifier::Plus) => {
                Err(KpError::OffScale(value.to_string()))
            },
            _ => Ok(value),
        }
    }

    pub fn base(self) -> u8 {
        self.base
    }

    pub fn modifier(self) -> KpModifier {
        self.modifier
    }

    /// Stored float form (`3-` -> 3.3, `3` -> 3.5, `3+` -> 3.7)
    pub fn encode(self) -> f64 {
        f64::from(self.base) + self.modifier.offset()
    }

    /// Inverse of [`KpValue::encode`]
    pub fn decode(encoded: f64) -> Result<Self, KpError> {
        if !encoded.is_finite() || encoded < 0.0 {
            return Err(KpError::BadEncoding(encoded));
        }
        let base = encoded.floor();
        if base > f64::from(Self::MAX_BASE) {
            return Err(KpError::BadEncoding(encoded));
        }
        let modifier =
            KpModifier::from_offset(encoded - base).ok_or(KpError::BadEncoding(encoded))?;
        Self::new(base as u8, modifier)
    }

    /// Parse the WDC tenths-of-thirds form (`17` -> 2-, `20` -> 2, `23` -> 2+)
    pub fn from_wdc_tenths(tenths: u16) -> Result<Self, KpError> {
        let whole = tenths / 10;
        let (base, modifier) = match tenths % 10 {
            0 => (whole, KpModifier::None),
            3 => (whole, KpModifier::Plus),
            7 => (whole + 1, KpModifier::Minus),
            _ => return Err(KpError::BadWdcValue(tenths)),
        };
        let base = u8::try_from(base).map_err(|_| KpError::BadWdcValue(tenths))?;
        Self::new(base, modifier).map_err(|_| KpError::BadWdcValue(tenths))
    }

    pub fn to_wdc_tenths(self) -> u16 {
        let base = u16::from(self.base) * 10;
        match self.modifier {
            KpModifier::None => base,
            KpModifier::Plus => base + 3,
            KpModifier::Minus => base - 3,
        }
    }
}

impl From<KpValue> for f64 {
    fn from(value: KpValue) -> Self {
        value.encode()
    }
}

impl TryFrom<f64> for KpValue {
    type Error = KpError;

    fn try_from(encoded: f64) -> Result<Self, Self::Error> {
        Self::decode(encoded)
    }
}

impl fmt::Display for KpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base, self.modifier.suffix())
    }
}

impl FromStr for KpValue {
    type Err = KpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let bad = || KpError::BadText(s.to_string());
        let mut chars = text.chars();
        let base = chars
            .next()
            .and_then(|c| c.to_digit(10))
            .ok_or_else(bad)?;
        let modifier = match chars.as_str() {
            "" | "o" => KpModifier::None,
            "-" => KpModifier::Minus,
            "+" => KpModifier::Plus,
            _ => return Err(bad()),
        };
        Self::new(base as u8, modifier)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_minus_encodes_to_point_three() {
        let kp = KpValue::new(3, KpModifier::Minus).unwrap();
        assert!((kp.encode() - 3.3).abs() < 1e-9);
        assert_eq!(KpValue::decode(3.3).unwrap(), kp);
    }

    #[test]
    fn test_plus_encodes_to_point_seven() {
        let kp = KpValue::new(5, KpModifier::Plus).unwrap();
        assert!((kp.encode() - 5.7).abs() < 1e-9);
        assert_eq!(KpValue::decode(5.7).unwrap(), kp);
    }

    #[test]
    fn test_plain_encodes_to_half() {
        for base in 0..=9 {
            let kp = KpValue::new(base, KpModifier::None).unwrap();
            assert!((kp.encode() - (f64::from(base) + 0.5)).abs() < 1e-9);
            assert_eq!(KpValue::decode(kp.encode()).unwrap(), kp);
        }
    }

    #[test]
    fn test_whole_scale_round_trips() {
        let mut seen = 0;
        for base in 0..=9 {
            for modifier in [KpModifier::Minus, KpModifier::None, KpModifier::Plus] {
                if let Ok(kp) = KpValue::new(base, modifier) {
                    assert_eq!(KpValue::decode(kp.encode()).unwrap(), kp);
                    assert_eq!(KpValue::from_wdc_tenths(kp.to_wdc_tenths()).unwrap(), kp);
                    assert_eq!(kp.to_string().parse::<KpValue>().unwrap(), kp);
                    seen += 1;
                }
            }
        }
        assert_eq!(seen, 28);
    }

    #[test]
    fn test_off_scale_values_rejected() {
        assert!(KpValue::new(0, KpModifier::Minus).is_err());
        assert!(KpValue::new(9, KpModifier::Plus).is_err());
        assert!(KpValue::new(10, KpModifier::None).is_err());
        assert!(KpValue::decode(3.0).is_err());
        assert!(KpValue::decode(3.1).is_err());
        assert!(KpValue::decode(-0.5).is_err());
        assert!(KpValue::decode(f64::NAN).is_err());
        assert!(KpValue::decode(10.5).is_err());
    }

    #[test]
    fn test_wdc_tenths() {
        assert_eq!(KpValue::from_wdc_tenths(17).unwrap().to_string(), "2-");
        assert_eq!(KpValue::from_wdc_tenths(20).unwrap().to_string(), "2");
        assert_eq!(KpValue::from_wdc_tenths(23).unwrap().to_string(), "2+");
        assert_eq!(KpValue::from_wdc_tenths(0).unwrap().to_string(), "0");
        assert!(KpValue::from_wdc_tenths(15).is_err());
        assert!(KpValue::from_wdc_tenths(93).is_err());
    }

    #[test]
    fn test_text_forms() {
        assert_eq!("4o".parse::<KpValue>().unwrap(), KpValue::new(4, KpModifier::None).unwrap());
        assert!("x+".parse::<KpValue>().is_err());
        assert!("4*".parse::<KpValue>().is_err());
    }

    #[test]
    fn test_serde_uses_encoded_float() {
        let kp = KpValue::new(6, KpModifier::Minus).unwrap();
        let json = serde_json::to_value(kp).unwrap();
        assert!((json.as_f64().unwrap() - 6.3).abs() < 1e-9);
        let back: KpValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, kp);
        assert!(serde_json::from_str::<KpValue>("6.1").is_err());
    }
}
