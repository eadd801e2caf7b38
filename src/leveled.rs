//! Leveled amounts.

use crate::fxp::Fxp;
use serde::{Deserialize, Serialize};

/// A bonus magnitude that may scale with the owner's level.
///
/// `level` is the effective level of the owning item and is set while bonuses
/// are gathered; it is never persisted.
///
/// # Examples
///
/// ```rust
/// use rulecore::{Fxp, LeveledAmount};
///
/// let mut amount = LeveledAmount::per_level(Fxp::from_int(2));
/// amount.level = Fxp::from_int(3);
/// assert_eq!(amount.adjusted_amount(), Fxp::from_int(6));
/// assert_eq!(amount.format_with_level(false), "+6 (+2 per level)");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeveledAmount {
    #[serde(skip)]
    pub level: Fxp,
    #[serde(default)]
    pub amount: Fxp,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub per_level: bool,
}

impl Default for LeveledAmount {
    fn default() -> Self {
        Self::flat(Fxp::ONE)
    }
}

impl LeveledAmount {
    /// A fixed amount.
    pub fn flat(amount: Fxp) -> Self {
        Self {
            level: Fxp::ZERO,
            amount,
            per_level: false,
        }
    }

    /// An amount applied once per level.
    pub fn per_level(amount: Fxp) -> Self {
        Self {
            level: Fxp::ZERO,
            amount,
            per_level: true,
        }
    }

    /// The amount after level scaling. Negative levels contribute nothing.
    pub fn adjusted_amount(&self) -> Fxp {
        if !self.per_level {
            return self.amount;
        }
        if self.level < Fxp::ZERO {
            Fxp::ZERO
        } else {
            self.amount * self.level
        }
    }

    /// Format the amount, naming the unit it scales by as `what`.
    pub fn format(&self, as_percentage: bool, what: &str) -> String {
        let mut amount = self.amount.string_with_sign();
        let mut adjusted = self.adjusted_amount().string_with_sign();
        if as_percentage {
            amount.push('%');
            adjusted.push('%');
        }
        if self.per_level {
            format!("{} ({} per {})", adjusted, amount, what)
        } else {
            amount
        }
    }

    /// Format the amount, scaling per level.
    pub fn format_with_level(&self, as_percentage: bool) -> String {
        self.format(as_percentage, "level")
    }
}
