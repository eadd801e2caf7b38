//! Weights and weight units.

use crate::error::RuleError;
use crate::fxp::Fxp;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Units a weight can be expressed in.
///
/// Metric units use the game's simplified ratios (1 kg = 2 lb).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WeightUnit {
    /// Pounds.
    #[default]
    Pound,
    /// Ounces.
    Ounce,
    /// Short tons.
    Ton,
    /// Kilograms.
    Kilogram,
    /// Grams.
    Gram,
}

impl WeightUnit {
    /// The abbreviation used in documents and descriptions.
    pub fn key(self) -> &'static str {
        match self {
            WeightUnit::Pound => "lb",
            WeightUnit::Ounce => "oz",
            WeightUnit::Ton => "tn",
            WeightUnit::Kilogram => "kg",
            WeightUnit::Gram => "g",
        }
    }

    /// Convert a value in these units to pounds.
    pub fn to_pounds(self, value: Fxp) -> Fxp {
        match self {
            WeightUnit::Pound => value,
            WeightUnit::Ounce => value / Fxp::from_int(16),
            WeightUnit::Ton => value * Fxp::from_int(2000),
            WeightUnit::Kilogram => value * Fxp::TWO,
            WeightUnit::Gram => value / Fxp::from_int(500),
        }
    }

    /// Convert a value in pounds to these units.
    pub fn from_pounds(self, pounds: Fxp) -> Fxp {
        match self {
            WeightUnit::Pound => pounds,
            WeightUnit::Ounce => pounds * Fxp::from_int(16),
            WeightUnit::Ton => pounds / Fxp::from_int(2000),
            WeightUnit::Kilogram => pounds / Fxp::TWO,
            WeightUnit::Gram => pounds * Fxp::from_int(500),
        }
    }
}

impl FromStr for WeightUnit {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lb" | "#" => Ok(WeightUnit::Pound),
            "oz" => Ok(WeightUnit::Ounce),
            "tn" => Ok(WeightUnit::Ton),
            "kg" => Ok(WeightUnit::Kilogram),
            "g" => Ok(WeightUnit::Gram),
            _ => Err(RuleError::UnknownWeightUnit(s.to_string())),
        }
    }
}

impl Serialize for WeightUnit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for WeightUnit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A weight, held internally in pounds.
///
/// Written to documents as `"<value> <unit>"`, e.g. `"5 lb"` or `"2.5 kg"`.
///
/// # Examples
///
/// ```rust
/// use rulecore::{Fxp, Weight, WeightUnit};
///
/// let w = Weight::from_units(Fxp::from_int(2), WeightUnit::Kilogram);
/// assert_eq!(w.pounds(), Fxp::from_int(4));
/// assert_eq!(w.format(WeightUnit::Kilogram), "2 kg");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Weight(Fxp);

impl Weight {
    /// Zero weight.
    pub const ZERO: Weight = Weight(Fxp::ZERO);

    /// Create a weight from a value in pounds.
    pub fn from_pounds(pounds: Fxp) -> Self {
        Self(pounds)
    }

    /// Create a weight from a value in the given units.
    pub fn from_units(value: Fxp, units: WeightUnit) -> Self {
        Self(units.to_pounds(value))
    }

    /// The weight in pounds.
    pub fn pounds(self) -> Fxp {
        self.0
    }

    /// Format the weight in the given units.
    pub fn format(self, units: WeightUnit) -> String {
        format!("{} {}", units.from_pounds(self.0), units.key())
    }
}

impl std::ops::Add for Weight {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl std::ops::Sub for Weight {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl std::ops::Mul<Fxp> for Weight {
    type Output = Self;

    fn mul(self, factor: Fxp) -> Self {
        Self(self.0 * factor)
    }
}

impl std::iter::Sum for Weight {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Weight::ZERO, |acc, w| acc + w)
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(WeightUnit::Pound))
    }
}

impl FromStr for Weight {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);
        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| RuleError::UnknownValue("weight", s.to_string()))?;
        let units = if unit.trim().is_empty() {
            WeightUnit::Pound
        } else {
            unit.parse()?
        };
        Ok(Self::from_units(Fxp::from_f64(value), units))
    }
}

impl Serialize for Weight {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Weight {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
