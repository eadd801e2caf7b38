//! Fixed-point numbers for rule values.
//!
//! Levels, modifiers, amounts and weights are all exact decimals with four
//! places. Using a fixed scale keeps every calculation deterministic, so the
//! same character always produces the same derived statistics and the same
//! content hashes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

const SCALE: i64 = 10_000;

/// Fixed-point number with four decimal places.
///
/// The raw `i64` holds the value multiplied by 10,000. [`Fxp::MIN`] is
/// reserved as the "undefined" sentinel for levels that cannot be computed,
/// such as a default that refers to a skill the character does not have.
///
/// # Examples
///
/// ```rust
/// use rulecore::Fxp;
///
/// let a = Fxp::from_int(12);
/// let b = Fxp::from_f64(1.5);
/// assert_eq!((a + b).to_string(), "13.5");
/// assert_eq!((a / Fxp::from_int(2)).trunc(), Fxp::from_int(6));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fxp(i64);

impl Fxp {
    /// Zero.
    pub const ZERO: Fxp = Fxp(0);
    /// One.
    pub const ONE: Fxp = Fxp(SCALE);
    /// Two.
    pub const TWO: Fxp = Fxp(2 * SCALE);
    /// Three.
    pub const THREE: Fxp = Fxp(3 * SCALE);
    /// Five.
    pub const FIVE: Fxp = Fxp(5 * SCALE);
    /// Twenty.
    pub const TWENTY: Fxp = Fxp(20 * SCALE);
    /// The "undefined" sentinel. Compares lower than every other value.
    pub const MIN: Fxp = Fxp(i64::MIN);
    /// The largest representable value.
    pub const MAX: Fxp = Fxp(i64::MAX);

    /// Create a value from an integer.
    pub const fn from_int(i: i64) -> Self {
        Self(i * SCALE)
    }

    /// Create a value from an `f64`, rounding to four decimal places.
    pub fn from_f64(f: f64) -> Self {
        Self((f * SCALE as f64).round() as i64)
    }

    /// Create a value from its raw scaled representation.
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw scaled representation.
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Convert to `f64`.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// The integer part, truncated toward zero.
    pub const fn as_int(self) -> i64 {
        self.0 / SCALE
    }

    /// Drop the fractional part, truncating toward zero.
    pub const fn trunc(self) -> Self {
        Self(self.0 / SCALE * SCALE)
    }

    /// Round up to the next whole number.
    pub fn ceil(self) -> Self {
        let t = self.trunc();
        if self.0 > 0 && t != self {
            t + Self::ONE
        } else {
            t
        }
    }

    /// Whether this is the [`Fxp::MIN`] sentinel.
    pub fn is_undefined(self) -> bool {
        self == Self::MIN
    }

    /// Format with an explicit leading `+` for non-negative values.
    ///
    /// ```rust
    /// use rulecore::Fxp;
    ///
    /// assert_eq!(Fxp::from_int(2).string_with_sign(), "+2");
    /// assert_eq!(Fxp::from_int(-2).string_with_sign(), "-2");
    /// assert_eq!(Fxp::ZERO.string_with_sign(), "+0");
    /// ```
    pub fn string_with_sign(self) -> String {
        if self.0 < 0 {
            self.to_string()
        } else {
            format!("+{}", self)
        }
    }
}

impl From<i64> for Fxp {
    fn from(i: i64) -> Self {
        Self::from_int(i)
    }
}

impl Add for Fxp {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Fxp {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Fxp {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Fxp {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Mul for Fxp {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        let result = (self.0 as i128 * other.0 as i128) / SCALE as i128;
        Self(result.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }
}

impl Div for Fxp {
    type Output = Self;

    /// Division by zero yields zero.
    fn div(self, other: Self) -> Self {
        if other.0 == 0 {
            return Self::ZERO;
        }
        let result = (self.0 as i128 * SCALE as i128) / other.0 as i128;
        Self(result.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }
}

impl Neg for Fxp {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl Sum for Fxp {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, v| acc + v)
    }
}

impl fmt::Display for Fxp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.unsigned_abs();
        let whole = abs / SCALE as u64;
        let frac = abs % SCALE as u64;
        if self.0 < 0 {
            write!(f, "-")?;
        }
        if frac == 0 {
            write!(f, "{}", whole)
        } else {
            let digits = format!("{:04}", frac);
            write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
        }
    }
}

impl Serialize for Fxp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.0 % SCALE == 0 {
            serializer.serialize_i64(self.as_int())
        } else {
            serializer.serialize_f64(self.to_f64())
        }
    }
}

impl<'de> Deserialize<'de> for Fxp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let f = f64::deserialize(deserializer)?;
        Ok(Fxp::from_f64(f))
    }
}
