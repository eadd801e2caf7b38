//! Nameable placeholder substitution.
//!
//! Rule authors parameterize text with tokens wrapped in `@` markers, e.g. a
//! skill default on `@Weapon@ Art` that becomes `Broadsword Art` once a
//! character picks a weapon. [`extract`] collects the tokens found in a
//! piece of text and [`apply`] substitutes chosen values back in.
//!
//! Replacement values that themselves contain `@` are not escaped. A second
//! pass over such text may substitute again; callers must avoid feeding
//! marker characters through as values if they need idempotence.

use crate::criteria::StringCriteria;
use std::collections::BTreeMap;

/// The character that delimits a nameable token.
pub const MARKER: char = '@';

/// Mapping of nameable key to replacement text.
///
/// Ordered so that substitution across several keys is deterministic.
pub type Replacements = BTreeMap<String, String>;

/// Types that carry nameable text.
///
/// Every rule object that holds author-written text implements this so a
/// whole item tree can be scanned and substituted in one pass.
pub trait Nameables {
    /// Add every nameable key found in this object to `m`.
    ///
    /// Values are copied from `existing` when present, otherwise the key
    /// maps to itself.
    fn fill_with_nameable_keys(&self, m: &mut Replacements, existing: &Replacements);

    /// Substitute the values in `m` into this object's text.
    fn apply_nameable_keys(&mut self, m: &Replacements);
}

impl<T: Nameables> Nameables for Vec<T> {
    fn fill_with_nameable_keys(&self, m: &mut Replacements, existing: &Replacements) {
        for one in self {
            one.fill_with_nameable_keys(m, existing);
        }
    }

    fn apply_nameable_keys(&mut self, m: &Replacements) {
        for one in self {
            one.apply_nameable_keys(m);
        }
    }
}

impl<T: Nameables> Nameables for Option<T> {
    fn fill_with_nameable_keys(&self, m: &mut Replacements, existing: &Replacements) {
        if let Some(one) = self {
            one.fill_with_nameable_keys(m, existing);
        }
    }

    fn apply_nameable_keys(&mut self, m: &Replacements) {
        if let Some(one) = self {
            one.apply_nameable_keys(m);
        }
    }
}

impl Nameables for StringCriteria {
    fn fill_with_nameable_keys(&self, m: &mut Replacements, existing: &Replacements) {
        extract(&self.qualifier, m, existing);
    }

    fn apply_nameable_keys(&mut self, m: &Replacements) {
        self.qualifier = apply(&self.qualifier, m);
    }
}

/// Extract the nameable keys in `text` into `m`.
///
/// Text with fewer than two markers holds no tokens. Otherwise the text is
/// split on the marker and every odd segment before the final marker is a
/// key.
///
/// # Examples
///
/// ```rust
/// use rulecore::nameables::{extract, Replacements};
///
/// let mut m = Replacements::new();
/// extract("@ST@ is strong", &mut m, &Replacements::new());
/// assert_eq!(m.get("ST").map(String::as_str), Some("ST"));
///
/// let mut none = Replacements::new();
/// extract("no tokens here", &mut none, &Replacements::new());
/// assert!(none.is_empty());
/// ```
pub fn extract(text: &str, m: &mut Replacements, existing: &Replacements) {
    let count = text.matches(MARKER).count();
    if count < 2 {
        return;
    }
    for (i, part) in text.split(MARKER).enumerate() {
        if i % 2 == 1 && i < count {
            let value = existing
                .get(part)
                .cloned()
                .unwrap_or_else(|| part.to_string());
            m.insert(part.to_string(), value);
        }
    }
}

/// Replace every `@key@` in `text` with its value from `m`.
///
/// Text with fewer than two markers is returned unchanged.
///
/// # Examples
///
/// ```rust
/// use rulecore::nameables::{apply, Replacements};
///
/// let mut m = Replacements::new();
/// m.insert("ST".into(), "14".into());
/// assert_eq!(apply("@ST@ is strong", &m), "14 is strong");
/// ```
pub fn apply(text: &str, m: &Replacements) -> String {
    if text.matches(MARKER).count() < 2 {
        return text.to_string();
    }
    let mut result = text.to_string();
    for (key, value) in m {
        let token = format!("{MARKER}{key}{MARKER}");
        result = result.replace(&token, value);
    }
    result
}

/// Extract the nameable keys of every entry in `list` into `m`.
pub fn extract_from_list(list: &[String], m: &mut Replacements, existing: &Replacements) {
    for one in list {
        extract(one, m, existing);
    }
}

/// Apply [`apply`] to each entry, preserving order and length.
///
/// An empty input yields an empty output.
pub fn apply_to_list(list: &[String], m: &Replacements) -> Vec<String> {
    list.iter().map(|one| apply(one, m)).collect()
}

/// Keep only the replacements whose key is in `needed`.
pub fn retain_needed(needed: &Replacements, replacements: &Replacements) -> Replacements {
    replacements
        .iter()
        .filter(|(k, _)| needed.contains_key(*k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Collect the replacements `item` needs, as done when a library item is
/// copied onto a character.
///
/// Values come from `chosen` where present; any other key the item uses maps
/// to itself. Keys in `chosen` that the item does not use are dropped.
pub fn collect<T: Nameables + ?Sized>(item: &T, chosen: &Replacements) -> Replacements {
    let mut needed = Replacements::new();
    item.fill_with_nameable_keys(&mut needed, chosen);
    needed
}
