//! Typed size quantities
//!
//! The partition tool reports every size and position as a string made of a
//! magnitude and a unit suffix (e.g. "100MiB"). These strings are parsed once,
//! at the model boundary, into a [`Quantity`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Unit suffix attached to a reported size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeUnit {
    B,
    KiB,
    #[default]
    MiB,
    GiB,
    TiB,
    #[serde(rename = "kB")]
    Kb,
    MB,
    GB,
    TB,
}

impl SizeUnit {
    const ALL: [SizeUnit; 9] = [
        SizeUnit::KiB,
        SizeUnit::MiB,
        SizeUnit::GiB,
        SizeUnit::TiB,
        SizeUnit::Kb,
        SizeUnit::MB,
        SizeUnit::GB,
        SizeUnit::TB,
        SizeUnit::B,
    ];

    /// Suffix as printed by the partition tool
    pub fn suffix(self) -> &'static str {
        match self {
            Self::B => "B",
            Self::KiB => "KiB",
            Self::MiB => "MiB",
            Self::GiB => "GiB",
            Self::TiB => "TiB",
            Self::Kb => "kB",
            Self::MB => "MB",
            Self::GB => "GB",
            Self::TB => "TB",
        }
    }

    /// Number of bytes in one unit
    pub fn bytes(self) -> u64 {
        match self {
            Self::B => 1,
            Self::KiB => 1 << 10,
            Self::MiB => 1 << 20,
            Self::GiB => 1 << 30,
            Self::TiB => 1 << 40,
            Self::Kb => 1_000,
            Self::MB => 1_000_000,
            Self::GB => 1_000_000_000,
            Self::TB => 1_000_000_000_000,
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|unit| unit.suffix() == suffix)
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Decimal places kept from a reported magnitude
const FRACTION_DIGITS: u32 = 3;
const SCALE: u64 = 10u64.pow(FRACTION_DIGITS);

/// A magnitude paired with its unit
///
/// The magnitude is held exactly in thousandths of the unit. parted prints
/// fractions for positions that are not aligned to the unit (e.g. "0.03MiB"
/// for a partition starting at sector 63).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quantity {
    thousandths: u64,
    pub unit: SizeUnit,
}

impl Quantity {
    pub const fn new(magnitude: u64, unit: SizeUnit) -> Self {
        Self {
            thousandths: magnitude.saturating_mul(SCALE),
            unit,
        }
    }

    pub const fn mib(magnitude: u64) -> Self {
        Self::new(magnitude, SizeUnit::MiB)
    }

    /// Whole part of the magnitude
    pub fn whole(&self) -> u64 {
        self.thousandths / SCALE
    }

    pub fn is_whole(&self) -> bool {
        self.thousandths % SCALE == 0
    }

    /// Size in bytes, rounded down, or `None` on overflow
    pub fn to_bytes(&self) -> Option<u64> {
        let bytes =
            u128::from(self.thousandths) * u128::from(self.unit.bytes()) / u128::from(SCALE);
        u64::try_from(bytes).ok()
    }

    /// Whole magnitude, provided the quantity is expressed in `unit`
    ///
    /// Positions are compared as plain whole magnitudes, so a different unit
    /// or a fractional value is a parse error.
    pub fn magnitude_in(&self, unit: SizeUnit) -> Result<u64, ModelError> {
        if self.unit != unit {
            return Err(ModelError::Parse(format!(
                "expected a value in {unit}, found {self}"
            )));
        }
        if !self.is_whole() {
            return Err(ModelError::Parse(format!(
                "expected a whole number of {unit}, found {self}"
            )));
        }
        Ok(self.whole())
    }
}

impl FromStr for Quantity {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim();
        let split = value
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| ModelError::Parse(format!("missing unit suffix in {raw:?}")))?;
        let (number, suffix) = value.split_at(split);

        let unit = SizeUnit::from_suffix(suffix)
            .ok_or_else(|| ModelError::Parse(format!("unknown unit {suffix:?} in {raw:?}")))?;

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(ModelError::Parse(format!(
                "malformed magnitude {number:?} in {raw:?}"
            )));
        }

        let (kept, rest) = fraction.split_at(fraction.len().min(FRACTION_DIGITS as usize));
        if rest.chars().any(|c| c != '0') {
            return Err(ModelError::Parse(format!(
                "more than {FRACTION_DIGITS} decimal places in {raw:?}"
            )));
        }

        let whole = whole
            .parse::<u64>()
            .map_err(|e| ModelError::Parse(format!("invalid magnitude in {raw:?}: {e}")))?;
        let fraction = format!("{kept:0<width$}", width = FRACTION_DIGITS as usize)
            .parse::<u64>()
            .map_err(|e| ModelError::Parse(format!("invalid fraction in {raw:?}: {e}")))?;

        let thousandths = whole
            .checked_mul(SCALE)
            .and_then(|scaled| scaled.checked_add(fraction))
            .ok_or_else(|| ModelError::Parse(format!("magnitude out of range in {raw:?}")))?;

        Ok(Self { thousandths, unit })
    }
}

impl TryFrom<String> for Quantity {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Quantity> for String {
    fn from(value: Quantity) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_whole() {
            return write!(f, "{}{}", self.whole(), self.unit);
        }
        let fraction = format!(
            "{:0width$}",
            self.thousandths % SCALE,
            width = FRACTION_DIGITS as usize
        );
        write!(
            f,
            "{}.{}{}",
            self.whole(),
            fraction.trim_end_matches('0'),
            self.unit
        )
    }
}
