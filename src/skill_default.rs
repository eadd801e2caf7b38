//! Skill defaults.
//!
//! A [`SkillDefault`] lets a skill (or a derived value such as a weapon's
//! parry) be used at a penalty off some other skill or attribute when the
//! character has no direct training. Defaults to skills may chain, and
//! rule authors regularly write chains that loop back on themselves, so
//! every resolution threads an [`Excludes`] set of the skills currently
//! being computed. A skill in that set is never visited again, which is what
//! makes `A -> B -> A` and `A -> A` terminate.
//!
//! Two resolution speeds exist:
//! - [`SkillDefault::skill_level`] recomputes every candidate skill's level
//! - [`SkillDefault::skill_level_fast`] trusts the level each candidate
//!   cached during the last recompute pass
//!
//! With no edits between the last recompute and the call, both give the
//! same answer.

use crate::entity::{Entity, ItemId};
use crate::fxp::Fxp;
use crate::hashing::ContentHash;
use crate::keyed::is_default;
use crate::nameables::{self, Nameables, Replacements};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use std::collections::HashSet;
use std::fmt;

/// Default type id for defaults to another skill.
pub const SKILL_ID: &str = "skill";
/// Default type id for defaults to a skill's parry.
pub const PARRY_ID: &str = "parry";
/// Default type id for defaults to a skill's block.
pub const BLOCK_ID: &str = "block";
/// Default type id for defaults to the character's dodge.
pub const DODGE_ID: &str = "dodge";

/// What a default refers to.
///
/// Anything other than the four fixed ids names an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DefaultType {
    Skill,
    Parry,
    Block,
    Dodge,
    Attribute(String),
}

impl DefaultType {
    /// Parse a default type id. Ids are trimmed and lowercased.
    ///
    /// ```rust
    /// use rulecore::skill_default::DefaultType;
    ///
    /// assert_eq!(DefaultType::parse(" Parry "), DefaultType::Parry);
    /// assert_eq!(DefaultType::parse("DX"), DefaultType::Attribute("dx".into()));
    /// ```
    pub fn parse(id: &str) -> Self {
        let id = id.trim().to_lowercase();
        match id.as_str() {
            SKILL_ID => DefaultType::Skill,
            PARRY_ID => DefaultType::Parry,
            BLOCK_ID => DefaultType::Block,
            DODGE_ID => DefaultType::Dodge,
            _ => DefaultType::Attribute(id),
        }
    }

    /// The id written to documents.
    pub fn id(&self) -> &str {
        match self {
            DefaultType::Skill => SKILL_ID,
            DefaultType::Parry => PARRY_ID,
            DefaultType::Block => BLOCK_ID,
            DefaultType::Dodge => DODGE_ID,
            DefaultType::Attribute(id) => id,
        }
    }

    /// Whether this type resolves through other skills.
    pub fn is_skill_based(&self) -> bool {
        matches!(
            self,
            DefaultType::Skill | DefaultType::Parry | DefaultType::Block
        )
    }
}

impl fmt::Display for DefaultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl Serialize for DefaultType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.id())
    }
}

impl<'de> Deserialize<'de> for DefaultType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(DefaultType::parse(&s))
    }
}

/// The skills currently being resolved.
///
/// Skill level calculation inserts the skill before looking at its defaults
/// and removes it afterwards, so the set always holds exactly the chain of
/// skills on the current resolution path.
#[derive(Debug, Clone, Default)]
pub struct Excludes {
    in_flight: HashSet<ItemId>,
}

impl Excludes {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` is on the current resolution path.
    pub fn contains(&self, id: ItemId) -> bool {
        self.in_flight.contains(&id)
    }

    /// Add `id`. Returns `false` if it was already present.
    pub fn insert(&mut self, id: ItemId) -> bool {
        self.in_flight.insert(id)
    }

    /// Remove `id`.
    pub fn remove(&mut self, id: ItemId) {
        self.in_flight.remove(&id);
    }

    /// Number of skills on the path.
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether no skill is on the path.
    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

/// A default from one skill or value to another skill or attribute.
///
/// `level`, `adjusted_level` and `points` are filled in per computation and
/// never take part in equality of meaning ([`SkillDefault::equivalent`]) or
/// in the content hash.
///
/// # Examples
///
/// ```rust
/// use rulecore::skill_default::SkillDefault;
/// use rulecore::Fxp;
///
/// let def = SkillDefault::skill("Broadsword", Fxp::from_int(-2));
/// assert!(def.is_skill_based());
/// assert_eq!(def.modifier_as_string(), "-2");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDefault {
    #[serde(rename = "type")]
    pub default_type: DefaultType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub specialization: String,
    #[serde(default, skip_serializing_if = "is_default")]
    pub modifier: Fxp,
    #[serde(default, skip_serializing_if = "is_default")]
    pub level: Fxp,
    #[serde(default, rename = "adjusted_level", skip_serializing_if = "is_default")]
    pub adj_level: Fxp,
    #[serde(default, skip_serializing_if = "is_default")]
    pub points: Fxp,
}

impl SkillDefault {
    /// A default of the given type.
    pub fn new(default_type: DefaultType, modifier: Fxp) -> Self {
        Self {
            default_type,
            name: String::new(),
            specialization: String::new(),
            modifier,
            level: Fxp::ZERO,
            adj_level: Fxp::ZERO,
            points: Fxp::ZERO,
        }
    }

    /// A default to the skill named `name`.
    pub fn skill(name: impl Into<String>, modifier: Fxp) -> Self {
        Self {
            name: name.into(),
            ..Self::new(DefaultType::Skill, modifier)
        }
    }

    /// A default to the attribute `id`.
    pub fn attribute(id: &str, modifier: Fxp) -> Self {
        Self::new(DefaultType::parse(id), modifier)
    }

    /// Set the specialization.
    pub fn with_specialization(mut self, specialization: impl Into<String>) -> Self {
        self.specialization = specialization.into();
        self
    }

    /// Whether this default resolves through other skills.
    pub fn is_skill_based(&self) -> bool {
        self.default_type.is_skill_based()
    }

    /// A copy with the per-computation fields reset.
    pub fn clone_without_level_or_points(&self) -> Self {
        Self {
            level: Fxp::ZERO,
            adj_level: Fxp::ZERO,
            points: Fxp::ZERO,
            ..self.clone()
        }
    }

    /// Whether `other` refers to the same thing at the same modifier once
    /// `replacements` are applied to both.
    pub fn equivalent(&self, replacements: &Replacements, other: &SkillDefault) -> bool {
        self.default_type == other.default_type
            && self.modifier == other.modifier
            && self.name_with_replacements(replacements)
                == other.name_with_replacements(replacements)
            && self.specialization_with_replacements(replacements)
                == other.specialization_with_replacements(replacements)
    }

    /// The name with nameable keys replaced.
    pub fn name_with_replacements(&self, replacements: &Replacements) -> String {
        nameables::apply(&self.name, replacements)
    }

    /// The specialization with nameable keys replaced.
    pub fn specialization_with_replacements(&self, replacements: &Replacements) -> String {
        nameables::apply(&self.specialization, replacements)
    }

    /// The name of what this default refers to, for display.
    pub fn full_name(&self, entity: &Entity, replacements: &Replacements) -> String {
        match &self.default_type {
            DefaultType::Attribute(id) => entity.resolve_attribute_name(id),
            DefaultType::Dodge => "Dodge".to_string(),
            other => {
                let mut buffer = self.name_with_replacements(replacements);
                if !self.specialization.is_empty() {
                    buffer.push_str(" (");
                    buffer.push_str(&self.specialization_with_replacements(replacements));
                    buffer.push(')');
                }
                match other {
                    DefaultType::Parry => buffer.push_str(" Parry"),
                    DefaultType::Block => buffer.push_str(" Block"),
                    _ => {}
                }
                buffer
            }
        }
    }

    /// The modifier with its sign, or an empty string when zero.
    pub fn modifier_as_string(&self) -> String {
        if self.modifier == Fxp::ZERO {
            String::new()
        } else {
            self.modifier.string_with_sign()
        }
    }

    /// Resolve the level this default provides, recomputing every candidate
    /// skill.
    ///
    /// Returns [`Fxp::MIN`] when nothing suitable exists.
    pub fn skill_level(
        &self,
        entity: &Entity,
        replacements: &Replacements,
        require_points: bool,
        excludes: &mut Excludes,
        rule_of_20: bool,
    ) -> Fxp {
        match self.default_type {
            DefaultType::Skill => {
                self.final_level(self.best(entity, replacements, require_points, excludes))
            }
            DefaultType::Parry => {
                let best = self.best(entity, replacements, require_points, excludes);
                self.final_level(derived_defense(best, entity.parry_bonus))
            }
            DefaultType::Block => {
                let best = self.best(entity, replacements, require_points, excludes);
                self.final_level(derived_defense(best, entity.block_bonus))
            }
            _ => self.skill_level_fast(entity, replacements, require_points, excludes, rule_of_20),
        }
    }

    /// Resolve the level this default provides from cached skill levels.
    ///
    /// Returns [`Fxp::MIN`] when nothing suitable exists.
    pub fn skill_level_fast(
        &self,
        entity: &Entity,
        replacements: &Replacements,
        require_points: bool,
        excludes: &mut Excludes,
        rule_of_20: bool,
    ) -> Fxp {
        match &self.default_type {
            DefaultType::Dodge => {
                let mut level = entity.dodge(entity.encumbrance);
                if rule_of_20 && level > Fxp::TWENTY {
                    level = Fxp::TWENTY;
                }
                self.final_level(level)
            }
            DefaultType::Parry => {
                let best = self.best_fast(entity, replacements, require_points, excludes);
                self.final_level(derived_defense(best, entity.parry_bonus))
            }
            DefaultType::Block => {
                let best = self.best_fast(entity, replacements, require_points, excludes);
                self.final_level(derived_defense(best, entity.block_bonus))
            }
            DefaultType::Skill => {
                self.final_level(self.best_fast(entity, replacements, require_points, excludes))
            }
            DefaultType::Attribute(id) => {
                let mut level = entity.resolve_attribute_current(id);
                if level.is_undefined() {
                    return level;
                }
                if rule_of_20 {
                    level = level.min(Fxp::TWENTY);
                }
                if entity.settings.use_half_stat_defaults {
                    level = (level / Fxp::TWO).trunc() + Fxp::FIVE;
                }
                self.final_level(level)
            }
        }
    }

    fn best(
        &self,
        entity: &Entity,
        replacements: &Replacements,
        require_points: bool,
        excludes: &mut Excludes,
    ) -> Fxp {
        let name = self.name_with_replacements(replacements);
        let specialization = self.specialization_with_replacements(replacements);
        let mut best = Fxp::MIN;
        for sk in entity.skill_named(&name, &specialization, require_points, excludes) {
            let level = entity.calculate_skill_level(sk, excludes).level;
            if best < level {
                best = level;
            }
        }
        best
    }

    fn best_fast(
        &self,
        entity: &Entity,
        replacements: &Replacements,
        require_points: bool,
        excludes: &Excludes,
    ) -> Fxp {
        let name = self.name_with_replacements(replacements);
        let specialization = self.specialization_with_replacements(replacements);
        entity
            .skill_named(&name, &specialization, require_points, excludes)
            .iter()
            .map(|sk| sk.level.level)
            .max()
            .unwrap_or(Fxp::MIN)
    }

    fn final_level(&self, level: Fxp) -> Fxp {
        if level.is_undefined() {
            level
        } else {
            level + self.modifier
        }
    }
}

/// Half the skill level, truncated, plus three and the bonus. An undefined
/// skill level stays undefined.
fn derived_defense(best: Fxp, bonus: Fxp) -> Fxp {
    if best.is_undefined() {
        best
    } else {
        (best / Fxp::TWO).trunc() + Fxp::THREE + bonus
    }
}

impl Nameables for SkillDefault {
    fn fill_with_nameable_keys(&self, m: &mut Replacements, existing: &Replacements) {
        nameables::extract(&self.name, m, existing);
        nameables::extract(&self.specialization, m, existing);
    }

    fn apply_nameable_keys(&mut self, m: &Replacements) {
        self.name = nameables::apply(&self.name, m);
        self.specialization = nameables::apply(&self.specialization, m);
    }
}

impl ContentHash for SkillDefault {
    fn hash_source(&self, h: &mut Sha256) {
        self.default_type.id().hash_source(h);
        self.name.hash_source(h);
        self.specialization.hash_source(h);
        self.modifier.hash_source(h);
    }
}
