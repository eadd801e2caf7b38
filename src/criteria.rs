//! Criteria matchers.
//!
//! A criterion pairs a comparison operator with a stored qualifier and
//! answers whether a candidate value matches. Features use them to select
//! their targets and prereqs use them to express their conditions. Each
//! criterion also describes itself in words for tooltips.

use crate::error::RuleError;
use crate::fxp::Fxp;
use crate::keyed::keyed_enum;
use crate::weight::{Weight, WeightUnit};
use serde::{Deserialize, Serialize};
use std::fmt;

keyed_enum! {
    /// Comparison operators for string criteria.
    #[derive(Default)]
    pub enum StringCompare(RuleError::UnknownCompare) {
        /// Matches anything, whatever the qualifier holds.
        #[default]
        Any => "any",
        Is => "is",
        IsNot => "is_not",
        Contains => "contains",
        DoesNotContain => "does_not_contain",
        StartsWith => "starts_with",
        DoesNotStartWith => "does_not_start_with",
        EndsWith => "ends_with",
        DoesNotEndWith => "does_not_end_with",
    }
}

impl StringCompare {
    /// Whether this operator is a negation, which changes how lists match.
    pub fn is_negated(self) -> bool {
        matches!(
            self,
            StringCompare::IsNot
                | StringCompare::DoesNotContain
                | StringCompare::DoesNotStartWith
                | StringCompare::DoesNotEndWith
        )
    }

    fn phrase(self) -> &'static str {
        match self {
            StringCompare::Any => "is anything",
            StringCompare::Is => "is",
            StringCompare::IsNot => "is not",
            StringCompare::Contains => "contains",
            StringCompare::DoesNotContain => "does not contain",
            StringCompare::StartsWith => "starts with",
            StringCompare::DoesNotStartWith => "does not start with",
            StringCompare::EndsWith => "ends with",
            StringCompare::DoesNotEndWith => "does not end with",
        }
    }
}

keyed_enum! {
    /// Comparison operators for numeric and weight criteria.
    #[derive(Default)]
    pub enum NumericCompare(RuleError::UnknownCompare) {
        /// Matches anything, whatever the qualifier holds.
        #[default]
        Any => "any",
        Equals => "is",
        NotEquals => "is_not",
        AtLeast => "at_least",
        AtMost => "at_most",
    }
}

impl NumericCompare {
    fn matches(self, value: Fxp, qualifier: Fxp) -> bool {
        match self {
            NumericCompare::Any => true,
            NumericCompare::Equals => value == qualifier,
            NumericCompare::NotEquals => value != qualifier,
            NumericCompare::AtLeast => value >= qualifier,
            NumericCompare::AtMost => value <= qualifier,
        }
    }

    fn phrase(self) -> &'static str {
        match self {
            NumericCompare::Any => "is anything",
            NumericCompare::Equals => "is",
            NumericCompare::NotEquals => "is not",
            NumericCompare::AtLeast => "at least",
            NumericCompare::AtMost => "at most",
        }
    }
}

/// A string comparison against a stored qualifier. Case-insensitive.
///
/// # Examples
///
/// ```rust
/// use rulecore::criteria::{StringCompare, StringCriteria};
///
/// let c = StringCriteria::new(StringCompare::StartsWith, "Broad");
/// assert!(c.matches("broadsword"));
/// assert_eq!(c.to_string(), "starts with \"Broad\"");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StringCriteria {
    pub compare: StringCompare,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub qualifier: String,
}

impl StringCriteria {
    /// Create a new criterion.
    pub fn new(compare: StringCompare, qualifier: impl Into<String>) -> Self {
        Self {
            compare,
            qualifier: qualifier.into(),
        }
    }

    /// A criterion matching exactly `qualifier`.
    pub fn is(qualifier: impl Into<String>) -> Self {
        Self::new(StringCompare::Is, qualifier)
    }

    /// A criterion matching anything.
    pub fn any() -> Self {
        Self::default()
    }

    /// Whether this criterion matches anything.
    pub fn is_any(&self) -> bool {
        self.compare == StringCompare::Any
    }

    /// Whether `value` satisfies this criterion.
    pub fn matches(&self, value: &str) -> bool {
        if self.compare == StringCompare::Any {
            return true;
        }
        let value = value.to_lowercase();
        let qualifier = self.qualifier.to_lowercase();
        match self.compare {
            StringCompare::Any => true,
            StringCompare::Is => value == qualifier,
            StringCompare::IsNot => value != qualifier,
            StringCompare::Contains => value.contains(&qualifier),
            StringCompare::DoesNotContain => !value.contains(&qualifier),
            StringCompare::StartsWith => value.starts_with(&qualifier),
            StringCompare::DoesNotStartWith => !value.starts_with(&qualifier),
            StringCompare::EndsWith => value.ends_with(&qualifier),
            StringCompare::DoesNotEndWith => !value.ends_with(&qualifier),
        }
    }

    /// Whether a list of values satisfies this criterion.
    ///
    /// Positive operators need one matching entry; negated operators need
    /// every entry to match. An empty list is tested as a single empty string.
    pub fn matches_list<S: AsRef<str>>(&self, values: &[S]) -> bool {
        if values.is_empty() {
            return self.matches("");
        }
        let count = values.iter().filter(|v| self.matches(v.as_ref())).count();
        if self.compare.is_negated() {
            count == values.len()
        } else {
            count > 0
        }
    }
}

impl fmt::Display for StringCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.compare == StringCompare::Any {
            f.write_str(self.compare.phrase())
        } else {
            write!(f, "{} \"{}\"", self.compare.phrase(), self.qualifier)
        }
    }
}

/// A numeric comparison against a stored qualifier.
///
/// # Examples
///
/// ```rust
/// use rulecore::criteria::{NumericCompare, NumericCriteria};
/// use rulecore::Fxp;
///
/// let c = NumericCriteria::new(NumericCompare::AtLeast, Fxp::from_int(12));
/// assert!(c.matches(Fxp::from_int(14)));
/// assert!(!c.matches(Fxp::from_int(11)));
/// assert_eq!(c.to_string(), "at least 12");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericCriteria {
    pub compare: NumericCompare,
    #[serde(skip_serializing_if = "is_zero")]
    pub qualifier: Fxp,
}

fn is_zero(v: &Fxp) -> bool {
    *v == Fxp::ZERO
}

impl NumericCriteria {
    /// Create a new criterion.
    pub fn new(compare: NumericCompare, qualifier: Fxp) -> Self {
        Self { compare, qualifier }
    }

    /// A criterion matching anything.
    pub fn any() -> Self {
        Self::default()
    }

    /// Whether this criterion matches anything.
    pub fn is_any(&self) -> bool {
        self.compare == NumericCompare::Any
    }

    /// Whether `value` satisfies this criterion.
    pub fn matches(&self, value: Fxp) -> bool {
        self.compare.matches(value, self.qualifier)
    }
}

impl fmt::Display for NumericCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.compare == NumericCompare::Any {
            f.write_str(self.compare.phrase())
        } else {
            write!(f, "{} {}", self.compare.phrase(), self.qualifier)
        }
    }
}

/// A weight comparison against a stored qualifier.
///
/// # Examples
///
/// ```rust
/// use rulecore::criteria::{NumericCompare, WeightCriteria};
/// use rulecore::{Fxp, Weight, WeightUnit};
///
/// let c = WeightCriteria::new(NumericCompare::AtLeast, Weight::from_pounds(Fxp::from_int(5)));
/// assert!(c.matches(Weight::from_pounds(Fxp::from_int(6))));
/// assert_eq!(c.to_string(), "at least 5 lb");
/// assert_eq!(c.describe(WeightUnit::Ounce), "at least 80 oz");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightCriteria {
    pub compare: NumericCompare,
    #[serde(skip_serializing_if = "is_zero_weight")]
    pub qualifier: Weight,
}

fn is_zero_weight(w: &Weight) -> bool {
    *w == Weight::ZERO
}

impl WeightCriteria {
    /// Create a new criterion.
    pub fn new(compare: NumericCompare, qualifier: Weight) -> Self {
        Self { compare, qualifier }
    }

    /// Whether `value` satisfies this criterion.
    pub fn matches(&self, value: Weight) -> bool {
        self.compare
            .matches(value.pounds(), self.qualifier.pounds())
    }

    /// Describe this criterion with the qualifier in the given units.
    pub fn describe(&self, units: WeightUnit) -> String {
        if self.compare == NumericCompare::Any {
            self.compare.phrase().to_string()
        } else {
            format!("{} {}", self.compare.phrase(), self.qualifier.format(units))
        }
    }
}

impl fmt::Display for WeightCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(WeightUnit::Pound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_matches_without_qualifier() {
        let c = StringCriteria::any();
        assert!(c.matches("anything"));
        assert!(c.matches(""));
        assert!(NumericCriteria::any().matches(Fxp::MIN));
    }

    #[test]
    fn test_string_compares() {
        let value = "Broadsword";
        let cases = [
            (StringCompare::Is, "broadsword", true),
            (StringCompare::IsNot, "broadsword", false),
            (StringCompare::Contains, "OAD", true),
            (StringCompare::DoesNotContain, "axe", true),
            (StringCompare::StartsWith, "broad", true),
            (StringCompare::DoesNotStartWith, "broad", false),
            (StringCompare::EndsWith, "sword", true),
            (StringCompare::DoesNotEndWith, "sword", false),
        ];
        for (compare, qualifier, expected) in cases {
            let c = StringCriteria::new(compare, qualifier);
            assert_eq!(c.matches(value), expected, "{:?}", compare);
        }
    }

    #[test]
    fn test_numeric_compares() {
        let five = Fxp::from_int(5);
        assert!(NumericCriteria::new(NumericCompare::Equals, five).matches(five));
        assert!(!NumericCriteria::new(NumericCompare::NotEquals, five).matches(five));
        assert!(NumericCriteria::new(NumericCompare::AtLeast, five).matches(five));
        assert!(NumericCriteria::new(NumericCompare::AtMost, five).matches(Fxp::from_int(4)));
        assert!(!NumericCriteria::new(NumericCompare::AtMost, five).matches(Fxp::from_int(6)));
    }

    #[test]
    fn test_matches_list() {
        let tags = ["Melee", "Sword"];
        assert!(StringCriteria::is("sword").matches_list(&tags));
        assert!(!StringCriteria::new(StringCompare::IsNot, "sword").matches_list(&tags));
        assert!(StringCriteria::new(StringCompare::IsNot, "axe").matches_list(&tags));
        let empty: [&str; 0] = [];
        assert!(!StringCriteria::is("sword").matches_list(&empty));
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(StringCriteria::any().to_string(), "is anything");
        assert_eq!(StringCriteria::is("Guns").to_string(), "is \"Guns\"");
        assert_eq!(
            NumericCriteria::new(NumericCompare::AtMost, Fxp::from_int(3)).to_string(),
            "at most 3"
        );
    }

    #[test]
    fn test_unknown_compare_is_recoverable() {
        let result: Result<StringCriteria, _> =
            serde_json::from_str(r#"{"compare":"sounds_like","qualifier":"x"}"#);
        assert!(result.is_err());
        assert!(matches!(
            "sounds_like".parse::<StringCompare>(),
            Err(RuleError::UnknownCompare(_))
        ));
    }

    #[test]
    fn test_serde_omits_empty_qualifier() {
        let json = serde_json::to_string(&StringCriteria::any()).unwrap();
        assert_eq!(json, r#"{"compare":"any"}"#);
    }
}
