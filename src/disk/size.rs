//! Byte-exact sizes with binary (IEC) and decimal (SI) units
//!
//! A [`Size`] is always a whole number of bytes. Only the values produced by
//! [`Size::to_unit`] are floating point, and their precision is chosen by the
//! caller.

use crate::utils::error::PlannerError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Every unit a [`Size`] can be expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    B,
    KiB,
    MiB,
    GiB,
    TiB,
    KB,
    MB,
    GB,
    TB,
}

impl Unit {
    /// Number of bytes in one of this unit
    pub const fn multiplier(self) -> u64 {
        match self {
            Self::B => 1,
            Self::KiB => 1 << 10,
            Self::MiB => 1 << 20,
            Self::GiB => 1 << 30,
            Self::TiB => 1 << 40,
            Self::KB => 1_000,
            Self::MB => 1_000_000,
            Self::GB => 1_000_000_000,
            Self::TB => 1_000_000_000_000,
        }
    }

    pub const fn suffix(self) -> &'static str {
        match self {
            Self::B => "B",
            Self::KiB => "KiB",
            Self::MiB => "MiB",
            Self::GiB => "GiB",
            Self::TiB => "TiB",
            Self::KB => "KB",
            Self::MB => "MB",
            Self::GB => "GB",
            Self::TB => "TB",
        }
    }

    /// Look up a unit by suffix, ignoring case. An empty suffix means bytes.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        let unit = match suffix.to_ascii_lowercase().as_str() {
            "" | "b" | "byte" | "bytes" => Self::B,
            "kib" => Self::KiB,
            "mib" => Self::MiB,
            "gib" => Self::GiB,
            "tib" => Self::TiB,
            "kb" => Self::KB,
            "mb" => Self::MB,
            "gb" => Self::GB,
            "tb" => Self::TB,
            _ => return None,
        };
        Some(unit)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// 1024-based units accepted by [`Size::from_binary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryUnit {
    B,
    KiB,
    MiB,
    GiB,
    TiB,
}

impl From<BinaryUnit> for Unit {
    fn from(unit: BinaryUnit) -> Self {
        match unit {
            BinaryUnit::B => Unit::B,
            BinaryUnit::KiB => Unit::KiB,
            BinaryUnit::MiB => Unit::MiB,
            BinaryUnit::GiB => Unit::GiB,
            BinaryUnit::TiB => Unit::TiB,
        }
    }
}

/// 1000-based units accepted by [`Size::from_decimal`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecimalUnit {
    B,
    KB,
    MB,
    GB,
    TB,
}

impl From<DecimalUnit> for Unit {
    fn from(unit: DecimalUnit) -> Self {
        match unit {
            DecimalUnit::B => Unit::B,
            DecimalUnit::KB => Unit::KB,
            DecimalUnit::MB => Unit::MB,
            DecimalUnit::GB => Unit::GB,
            DecimalUnit::TB => Unit::TB,
        }
    }
}

/// Units tried, largest first, when rendering a size exactly
const EXACT_DISPLAY_UNITS: [Unit; 8] = [
    Unit::TiB,
    Unit::GiB,
    Unit::MiB,
    Unit::KiB,
    Unit::TB,
    Unit::GB,
    Unit::MB,
    Unit::KB,
];

static SIZE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<int>\d+)?(?P<frac>\.\d+)?\s*(?P<unit>[A-Za-z]*)\s*$")
        .expect("size pattern is valid")
});

/// A quantity of bytes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Size(u64);

impl Size {
    pub const ZERO: Size = Size(0);
    pub const MIB: Size = Size(1 << 20);

    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Build a size from a magnitude in any unit; stores `floor(magnitude * unit)`.
    pub fn new(magnitude: f64, unit: Unit) -> Result<Self, PlannerError> {
        if !magnitude.is_finite() {
            return Err(PlannerError::InvalidSize(format!(
                "magnitude {} is not a finite number",
                magnitude
            )));
        }
        if magnitude < 0.0 {
            return Err(PlannerError::InvalidSize(format!(
                "magnitude {} is negative",
                magnitude
            )));
        }

        let multiplier = unit.multiplier();
        let overflow = || {
            PlannerError::InvalidSize(format!("{} {} does not fit in 64 bits", magnitude, unit))
        };

        // Whole magnitudes stay in integer arithmetic so large sizes are exact
        if magnitude.fract() == 0.0 && magnitude < u64::MAX as f64 {
            return (magnitude as u64)
                .checked_mul(multiplier)
                .map(Self)
                .ok_or_else(overflow);
        }

        let bytes = (magnitude * multiplier as f64).floor();
        if bytes >= u64::MAX as f64 {
            return Err(overflow());
        }
        Ok(Self(bytes as u64))
    }

    pub fn from_binary(magnitude: f64, unit: BinaryUnit) -> Result<Self, PlannerError> {
        Self::new(magnitude, unit.into())
    }

    pub fn from_decimal(magnitude: f64, unit: DecimalUnit) -> Result<Self, PlannerError> {
        Self::new(magnitude, unit.into())
    }

    pub const fn to_bytes(self) -> u64 {
        self.0
    }

    /// Value in `unit`, rounded half-to-even to `decimals` fractional digits.
    ///
    /// Precision beyond what an `f64` can scale returns the unrounded value.
    pub fn to_unit(self, unit: impl Into<Unit>, decimals: u32) -> f64 {
        let value = self.0 as f64 / unit.into().multiplier() as f64;
        let factor = 10f64.powi(decimals.min(i32::MAX as u32) as i32);
        let scaled = value * factor;
        if !factor.is_finite() || !scaled.is_finite() {
            return value;
        }
        scaled.round_ties_even() / factor
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Size) -> Option<Size> {
        self.0.checked_add(rhs.0).map(Size)
    }

    pub fn saturating_sub(self, rhs: Size) -> Size {
        Size(self.0.saturating_sub(rhs.0))
    }

    /// Human-readable size in binary units with one decimal (e.g. "1.5 GiB")
    pub fn human(self) -> String {
        let unit = [Unit::TiB, Unit::GiB, Unit::MiB, Unit::KiB]
            .into_iter()
            .find(|u| self.0 >= u.multiplier());

        match unit {
            Some(u) => format!("{:.1} {}", self.0 as f64 / u.multiplier() as f64, u),
            None => format!("{} B", self.0),
        }
    }
}

impl Add for Size {
    type Output = Size;

    fn add(self, rhs: Size) -> Size {
        Size(self.0 + rhs.0)
    }
}

impl Sub for Size {
    type Output = Size;

    fn sub(self, rhs: Size) -> Size {
        Size(self.0 - rhs.0)
    }
}

/// Exact rendering in the largest unit that divides the byte count evenly
impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("0B");
        }
        match EXACT_DISPLAY_UNITS
            .iter()
            .find(|u| self.0 % u.multiplier() == 0)
        {
            Some(u) => write!(f, "{}{}", self.0 / u.multiplier(), u),
            None => write!(f, "{}B", self.0),
        }
    }
}

impl FromStr for Size {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PlannerError::InvalidSize(format!("cannot parse '{}' as a size", s));

        let caps = SIZE_RE.captures(s).ok_or_else(invalid)?;
        let int = caps.name("int").map(|m| m.as_str());
        let frac = caps.name("frac").map(|m| m.as_str());
        let unit = Unit::from_suffix(caps.name("unit").map_or("", |m| m.as_str()))
            .ok_or_else(invalid)?;

        match (int, frac) {
            (None, None) => Err(invalid()),
            (Some(whole), None) => {
                let whole: u64 = whole.parse().map_err(|_| invalid())?;
                whole
                    .checked_mul(unit.multiplier())
                    .map(Size)
                    .ok_or_else(|| PlannerError::InvalidSize(format!("'{}' does not fit in 64 bits", s)))
            }
            (whole, Some(frac)) => {
                let number = format!("{}{}", whole.unwrap_or("0"), frac);
                let magnitude: f64 = number.parse().map_err(|_| invalid())?;
                Size::new(magnitude, unit)
            }
        }
    }
}

impl TryFrom<String> for Size {
    type Error = PlannerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Size> for String {
    fn from(size: Size) -> Self {
        size.to_string()
    }
}
