//! # rulecore - Deterministic Rules Core for Tabletop Character Sheets
//!
//! Evaluates the rules attached to the items on a character sheet:
//! - **Nameables**: `@token@` placeholders in rule text, filled with values
//!   chosen when an item is copied onto a character
//! - **Criteria**: string, numeric and weight comparisons used by every rule
//!   condition
//! - **Features and bonuses**: items granting modifiers to attributes, skills,
//!   spells, weapons, DR and reactions
//! - **Prerequisites**: boolean condition trees with readable explanations
//! - **Skill defaults**: a skill's level derived from another skill or an
//!   attribute, safe against cyclic references
//! - **Content hashing**: detects when a character's copy of a library item
//!   has drifted from the original
//!
//! ## Recalculation
//!
//! ```text
//! [items] → [BonusMap] → [skill levels] → [prerequisites]
//! ```
//!
//! 1. Every active item's features become bonuses filed by map key
//! 2. Each skill takes the better of its trained level and its defaults,
//!    plus skill bonuses
//! 3. Prerequisite trees are checked against the result
//!
//! ## Example
//!
//! ```rust
//! use rulecore::entity::{Difficulty, DifficultyLevel, Entity, Skill, Trait};
//! use rulecore::feature::{Feature, SkillBonus};
//! use rulecore::Fxp;
//!
//! let mut entity = Entity::default();
//! entity.set_attribute("dx", "Dexterity", Fxp::from_int(12));
//!
//! let mut stealth = Skill::new("Stealth", Difficulty::new("dx", DifficultyLevel::Average));
//! stealth.points = Fxp::from_int(4);
//! let stealth = entity.add_skill(stealth);
//!
//! let mut shadow = Trait::new("Shadow Form");
//! shadow.features.push(Feature::SkillBonus(SkillBonus::new("Stealth")));
//! entity.add_trait(shadow);
//!
//! entity.recalculate();
//! // 12 (DX) + 1 (Average, 4 points) + 1 (bonus)
//! assert_eq!(entity.skill(stealth).unwrap().level.level, Fxp::from_int(14));
//! ```
//!
//! ## Modules
//!
//! - [`fxp`] - Fixed-point numbers
//! - [`weight`] - Weights and units
//! - [`criteria`] - Criteria matchers
//! - [`nameables`] - Placeholder substitution
//! - [`leveled`] - Leveled bonus amounts
//! - [`feature`] - Features and their map keys
//! - [`bonus`] - Bonuses and the bonus map
//! - [`prereq`] - Prerequisites
//! - [`skill_default`] - Skill defaults
//! - [`entity`] - The character the rules evaluate against
//! - [`default_graph`] - Default cycle diagnostics
//! - [`hashing`] - Content hashing
//! - [`library`] - Libraries, templates and drift detection
//! - [`error`] - Error types

mod keyed;

pub mod bonus;
pub mod criteria;
pub mod default_graph;
pub mod entity;
pub mod error;
pub mod feature;
pub mod fxp;
pub mod hashing;
pub mod leveled;
pub mod library;
pub mod nameables;
pub mod prereq;
pub mod skill_default;
pub mod weight;

// Re-export main types for convenience
pub use bonus::{Bonus, BonusMap};
pub use entity::{Entity, ItemId, SheetSettings};
pub use error::RuleError;
pub use feature::Feature;
pub use prereq::{Prereq, PrereqList};
pub use skill_default::SkillDefault;

// Re-export numeric types
pub use fxp::Fxp;
pub use leveled::LeveledAmount;
pub use weight::{Weight, WeightUnit};

pub use hashing::{content_hash, ContentHash};
