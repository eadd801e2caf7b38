//! Error types for rule documents and entity lookups.
//!
//! Rule evaluation itself never fails: cycles, missing skills and unknown
//! attributes resolve to [`Fxp::MIN`](crate::fxp::Fxp::MIN). The errors here
//! cover data that cannot be represented at all, such as an enumeration value
//! written by a newer version of the document format.

use crate::entity::ItemId;
use thiserror::Error;

/// Errors that can occur while loading or addressing rule data.
///
/// # Examples
///
/// ```rust
/// use rulecore::RuleError;
///
/// let err = RuleError::UnknownSelectionType("weapons_with_color".into());
/// assert_eq!(err.to_string(), "Unknown selection type: weapons_with_color");
/// ```
#[derive(Debug, Error)]
pub enum RuleError {
    /// A weapon or skill selection type that this version does not know.
    #[error("Unknown selection type: {0}")]
    UnknownSelectionType(String),

    /// A spell match type that this version does not know.
    #[error("Unknown spell match type: {0}")]
    UnknownSpellMatchType(String),

    /// A criteria comparison operator that this version does not know.
    #[error("Unknown comparison: {0}")]
    UnknownCompare(String),

    /// A weight unit abbreviation that this version does not know.
    #[error("Unknown weight unit: {0}")]
    UnknownWeightUnit(String),

    /// Some other closed enumeration received a value it does not know.
    ///
    /// Contains the enumeration name and the offending value.
    #[error("Unknown {0}: {1}")]
    UnknownValue(&'static str, String),

    /// An item id that does not resolve within the entity.
    #[error("Unknown item: {0}")]
    UnknownItem(ItemId),

    /// The document could not be parsed.
    ///
    /// Unknown enumeration values inside a document also surface here, with
    /// the message of the more specific error embedded.
    #[error("Invalid document: {0}")]
    Document(#[from] serde_json::Error),
}
