//! Prerequisites.
//!
//! A [`PrereqList`] is a tree of conditions an item needs before it counts
//! as valid. Leaves check one thing about the entity; lists combine their
//! children with all-of or any-of semantics and may be limited to certain
//! tech levels.
//!
//! Every leaf carries a `has` flag. The leaf first decides whether its
//! condition holds, then `has = false` inverts that. When the final answer is
//! "unsatisfied" and a tooltip buffer was given, the leaf appends a line of
//! the form `prefix + "has"/"does not have" + description`. The wording
//! follows `has`, not the outcome.

use crate::criteria::{NumericCriteria, StringCriteria, WeightCriteria};
use crate::entity::{Entity, ItemId};
use crate::error::RuleError;
use crate::fxp::Fxp;
use crate::hashing::ContentHash;
use crate::keyed::{is_default, keyed_enum};
use crate::nameables::{Nameables, Replacements};
use crate::weight::Weight;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeSet;
use tracing::warn;

fn yes() -> bool {
    true
}

/// The phrase for a `has` flag.
pub fn has_text(has: bool) -> &'static str {
    if has {
        "has"
    } else {
        "does not have"
    }
}

fn apply_has(has: bool, satisfied: bool) -> bool {
    if has {
        satisfied
    } else {
        !satisfied
    }
}

/// A list of prerequisites combined with all-of or any-of semantics.
///
/// # Examples
///
/// ```rust
/// use rulecore::entity::Entity;
/// use rulecore::prereq::{PrereqList, Prereq, TraitPrereq};
///
/// let mut list = PrereqList::new(true);
/// list.prereqs.push(Prereq::Trait(TraitPrereq::new("Magery")));
///
/// let entity = Entity::default();
/// let mut tooltip = String::new();
/// assert!(!list.satisfied(&entity, None, Some(&mut tooltip), "\n- "));
/// assert_eq!(tooltip, "\n- Requires all of:\n  - has a trait whose name is \"Magery\"");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrereqList {
    #[serde(default = "yes")]
    pub all: bool,
    #[serde(default, skip_serializing_if = "is_default")]
    pub when_tl: NumericCriteria,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prereqs: Vec<Prereq>,
}

impl Default for PrereqList {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PrereqList {
    /// An empty list.
    pub fn new(all: bool) -> Self {
        Self {
            all,
            when_tl: NumericCriteria::any(),
            prereqs: Vec::new(),
        }
    }

    /// Parse a prerequisite list from its JSON document form.
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        serde_json::from_str(json).map_err(|err| {
            warn!("unable to load prerequisites: {}", err);
            RuleError::from(err)
        })
    }

    /// Whether the list is satisfied.
    ///
    /// Every child is evaluated, so the tooltip collects the explanation of
    /// each unsatisfied child, indented under a header line. A list whose
    /// tech level condition does not match the entity is satisfied. An empty
    /// list is satisfied.
    ///
    /// The header line starts with `prefix`. Each child line starts on a new
    /// line, indented two spaces further, followed by `prefix` without its
    /// leading newlines.
    pub fn satisfied(
        &self,
        entity: &Entity,
        exclude: Option<ItemId>,
        tooltip: Option<&mut String>,
        prefix: &str,
    ) -> bool {
        if !self.when_tl.is_any() && !self.when_tl.matches(entity.tech_level_value()) {
            return true;
        }
        let mut local = tooltip.as_ref().map(|_| String::new());
        let child_prefix = format!("\n  {}", prefix.trim_start_matches('\n'));
        let mut count = 0;
        for one in &self.prereqs {
            if one.satisfied(entity, exclude, local.as_mut(), &child_prefix) {
                count += 1;
            }
        }
        let satisfied = count == self.prereqs.len() || (!self.all && count > 0);
        if !satisfied {
            if let (Some(tooltip), Some(local)) = (tooltip, local) {
                tooltip.push_str(prefix);
                tooltip.push_str(if self.all {
                    "Requires all of:"
                } else {
                    "Requires at least one of:"
                });
                tooltip.push_str(&local);
            }
        }
        satisfied
    }
}

impl Nameables for PrereqList {
    fn fill_with_nameable_keys(&self, m: &mut Replacements, existing: &Replacements) {
        self.prereqs.fill_with_nameable_keys(m, existing);
    }

    fn apply_nameable_keys(&mut self, m: &Replacements) {
        self.prereqs.apply_nameable_keys(m);
    }
}

impl ContentHash for PrereqList {
    fn hash_source(&self, h: &mut Sha256) {
        "prereq_list".hash_source(h);
        self.all.hash_source(h);
        self.when_tl.hash_source(h);
        self.prereqs.hash_source(h);
    }
}

/// Requires a trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitPrereq {
    #[serde(default = "yes")]
    pub has: bool,
    #[serde(default, skip_serializing_if = "is_default")]
    pub name: StringCriteria,
    #[serde(default, skip_serializing_if = "is_default")]
    pub level: NumericCriteria,
    #[serde(default, skip_serializing_if = "is_default")]
    pub notes: StringCriteria,
}

impl TraitPrereq {
    /// Requires a trait named exactly `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            has: true,
            name: StringCriteria::is(name),
            level: NumericCriteria::any(),
            notes: StringCriteria::any(),
        }
    }

    fn satisfied(&self, entity: &Entity, exclude: Option<ItemId>) -> bool {
        entity.traits.iter().any(|t| {
            Some(t.id) != exclude
                && !t.disabled
                && self.name.matches(&t.name_with_replacements())
                && self.notes.matches(&t.notes_with_replacements())
                && self.level.matches(t.current_level())
        })
    }

    fn describe(&self, buffer: &mut String) {
        buffer.push_str(&format!(" a trait whose name {}", self.name));
        if !self.notes.is_any() {
            buffer.push_str(&format!(", notes {}", self.notes));
        }
        if !self.level.is_any() {
            buffer.push_str(&format!(", and level {}", self.level));
        }
    }
}

/// Requires an attribute value, optionally combined with a second attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributePrereq {
    #[serde(default = "yes")]
    pub has: bool,
    pub which: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined_with: Option<String>,
    #[serde(default, skip_serializing_if = "is_default")]
    pub qualifier: NumericCriteria,
}

impl AttributePrereq {
    /// Requires `which` to satisfy `qualifier`.
    pub fn new(which: impl Into<String>, qualifier: NumericCriteria) -> Self {
        Self {
            has: true,
            which: which.into(),
            combined_with: None,
            qualifier,
        }
    }

    fn satisfied(&self, entity: &Entity) -> bool {
        let mut value = entity.resolve_attribute_current(&self.which);
        if value.is_undefined() {
            return false;
        }
        if let Some(other) = &self.combined_with {
            let other = entity.resolve_attribute_current(other);
            if other.is_undefined() {
                return false;
            }
            value += other;
        }
        self.qualifier.matches(value)
    }

    fn describe(&self, entity: &Entity, buffer: &mut String) {
        buffer.push(' ');
        buffer.push_str(&entity.resolve_attribute_name(&self.which));
        if let Some(other) = &self.combined_with {
            buffer.push_str(" combined with ");
            buffer.push_str(&entity.resolve_attribute_name(other));
        }
        buffer.push_str(&format!(" which {}", self.qualifier));
    }
}

/// Requires the equipment being checked to contain a quantity of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainedQuantityPrereq {
    #[serde(default = "yes")]
    pub has: bool,
    #[serde(default, skip_serializing_if = "is_default")]
    pub qualifier: NumericCriteria,
}

impl ContainedQuantityPrereq {
    fn satisfied(&self, entity: &Entity, exclude: Option<ItemId>) -> bool {
        match exclude.and_then(|id| entity.equipment_item(id)) {
            Some(eqp) if eqp.is_container() => {
                let quantity: Fxp = eqp.children.iter().map(|child| child.quantity).sum();
                self.qualifier.matches(quantity)
            }
            Some(_) => true,
            None => false,
        }
    }
}

/// Requires the equipment being checked to contain a weight of items.
///
/// # Examples
///
/// ```rust
/// use rulecore::criteria::{NumericCompare, WeightCriteria};
/// use rulecore::entity::{Entity, Equipment};
/// use rulecore::prereq::{ContainedWeightPrereq, Prereq};
/// use rulecore::{Fxp, Weight};
///
/// let lbs = |n| Weight::from_pounds(Fxp::from_int(n));
/// let mut bag = Equipment::new("Bag", lbs(1));
/// bag.children.push(Equipment::new("Rock", lbs(4)));
///
/// let mut entity = Entity::default();
/// let bag = entity.add_equipment(bag);
///
/// let prereq = Prereq::ContainedWeight(ContainedWeightPrereq::new(
///     WeightCriteria::new(NumericCompare::AtMost, lbs(5)),
/// ));
/// assert!(prereq.satisfied(&entity, Some(bag), None, ""));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainedWeightPrereq {
    #[serde(default = "yes")]
    pub has: bool,
    #[serde(default, skip_serializing_if = "is_default")]
    pub qualifier: WeightCriteria,
}

impl ContainedWeightPrereq {
    /// Requires a contained weight satisfying `qualifier`.
    pub fn new(qualifier: WeightCriteria) -> Self {
        Self {
            has: true,
            qualifier,
        }
    }

    /// Non-container equipment passes before `has` is applied; with no
    /// equipment to check the condition fails before `has` is applied.
    fn satisfied(&self, entity: &Entity, exclude: Option<ItemId>) -> bool {
        match exclude.and_then(|id| entity.equipment_item(id)) {
            Some(eqp) if eqp.is_container() => {
                let contained: Weight = eqp.extended_weight() - eqp.adjusted_weight();
                self.qualifier.matches(contained)
            }
            Some(_) => true,
            None => false,
        }
    }
}

/// Requires a skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillPrereq {
    #[serde(default = "yes")]
    pub has: bool,
    #[serde(default, skip_serializing_if = "is_default")]
    pub name: StringCriteria,
    #[serde(default, skip_serializing_if = "is_default")]
    pub level: NumericCriteria,
    #[serde(default, skip_serializing_if = "is_default")]
    pub specialization: StringCriteria,
}

impl SkillPrereq {
    /// Requires a skill named exactly `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            has: true,
            name: StringCriteria::is(name),
            level: NumericCriteria::any(),
            specialization: StringCriteria::any(),
        }
    }

    fn satisfied(&self, entity: &Entity, exclude: Option<ItemId>) -> bool {
        entity.skills.iter().any(|sk| {
            Some(sk.id) != exclude
                && self.name.matches(&sk.name_with_replacements())
                && self
                    .specialization
                    .matches(&sk.specialization_with_replacements())
                && self.level.matches(sk.level.level)
        })
    }

    fn describe(&self, buffer: &mut String) {
        buffer.push_str(&format!(" a skill whose name {}", self.name));
        if !self.specialization.is_any() {
            buffer.push_str(&format!(", specialization {}", self.specialization));
        }
        if !self.level.is_any() {
            buffer.push_str(&format!(", and level {}", self.level));
        }
    }
}

keyed_enum! {
    /// What a spell prerequisite counts.
    #[derive(Default)]
    pub enum SpellComparisonType(|s| RuleError::UnknownValue("spell comparison", s)) {
        #[default]
        Name => "name",
        Tag => "tag",
        College => "college",
        CollegeCount => "college_count",
        Any => "any",
    }
}

/// Requires a number of spells, or of distinct spell colleges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellPrereq {
    #[serde(default = "yes")]
    pub has: bool,
    #[serde(default)]
    pub sub_type: SpellComparisonType,
    #[serde(default, skip_serializing_if = "is_default")]
    pub qualifier: StringCriteria,
    #[serde(default, skip_serializing_if = "is_default")]
    pub quantity: NumericCriteria,
}

impl SpellPrereq {
    fn satisfied(&self, entity: &Entity, exclude: Option<ItemId>) -> bool {
        let spells = entity.spells.iter().filter(|sp| Some(sp.id) != exclude);
        let count = match self.sub_type {
            SpellComparisonType::Name => spells
                .filter(|sp| self.qualifier.matches(&sp.name_with_replacements()))
                .count(),
            SpellComparisonType::Tag => spells
                .filter(|sp| self.qualifier.matches_list(&sp.tags))
                .count(),
            SpellComparisonType::College => spells
                .filter(|sp| self.qualifier.matches_list(&sp.college_with_replacements()))
                .count(),
            SpellComparisonType::CollegeCount => spells
                .flat_map(|sp| sp.college_with_replacements())
                .collect::<BTreeSet<_>>()
                .len(),
            SpellComparisonType::Any => spells.count(),
        };
        self.quantity.matches(Fxp::from_int(count as i64))
    }

    fn describe(&self, buffer: &mut String) {
        match self.sub_type {
            SpellComparisonType::CollegeCount => {
                buffer.push_str(&format!(" a college count which {}", self.quantity));
            }
            SpellComparisonType::Any => {
                buffer.push_str(&format!(" spells of any kind whose count {}", self.quantity));
            }
            other => {
                buffer.push_str(&format!(
                    " spells whose {} {} and whose count {}",
                    other, self.qualifier, self.quantity
                ));
            }
        }
    }
}

/// Requires a piece of equipment to be equipped. Has no `has` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquippedEquipmentPrereq {
    #[serde(default, skip_serializing_if = "is_default")]
    pub name: StringCriteria,
    #[serde(default, skip_serializing_if = "is_default")]
    pub tags: StringCriteria,
}

impl EquippedEquipmentPrereq {
    fn satisfied(&self, entity: &Entity, exclude: Option<ItemId>) -> bool {
        let mut found = false;
        entity.for_each_equipment(|eqp| {
            if !found
                && Some(eqp.id) != exclude
                && eqp.equipped
                && self.name.matches(&eqp.name_with_replacements())
                && self.tags.matches_list(&eqp.tags)
            {
                found = true;
            }
        });
        found
    }
}

/// A prerequisite: a list or a single check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Prereq {
    #[serde(rename = "prereq_list")]
    List(PrereqList),
    #[serde(rename = "trait_prereq")]
    Trait(TraitPrereq),
    #[serde(rename = "attribute_prereq")]
    Attribute(AttributePrereq),
    #[serde(rename = "contained_quantity_prereq")]
    ContainedQuantity(ContainedQuantityPrereq),
    #[serde(rename = "contained_weight_prereq")]
    ContainedWeight(ContainedWeightPrereq),
    #[serde(rename = "skill_prereq")]
    Skill(SkillPrereq),
    #[serde(rename = "spell_prereq")]
    Spell(SpellPrereq),
    #[serde(rename = "equipped_equipment")]
    EquippedEquipment(EquippedEquipmentPrereq),
}

impl Prereq {
    /// The `type` key this prerequisite is persisted under.
    pub fn type_key(&self) -> &'static str {
        match self {
            Prereq::List(_) => "prereq_list",
            Prereq::Trait(_) => "trait_prereq",
            Prereq::Attribute(_) => "attribute_prereq",
            Prereq::ContainedQuantity(_) => "contained_quantity_prereq",
            Prereq::ContainedWeight(_) => "contained_weight_prereq",
            Prereq::Skill(_) => "skill_prereq",
            Prereq::Spell(_) => "spell_prereq",
            Prereq::EquippedEquipment(_) => "equipped_equipment",
        }
    }

    /// The `has` flag, or `true` for kinds without one.
    pub fn has(&self) -> bool {
        match self {
            Prereq::List(_) | Prereq::EquippedEquipment(_) => true,
            Prereq::Trait(p) => p.has,
            Prereq::Attribute(p) => p.has,
            Prereq::ContainedQuantity(p) => p.has,
            Prereq::ContainedWeight(p) => p.has,
            Prereq::Skill(p) => p.has,
            Prereq::Spell(p) => p.has,
        }
    }

    /// Whether this prerequisite is satisfied.
    ///
    /// `exclude` is the item the prerequisite belongs to; it never counts
    /// toward its own requirements, and the contained-item checks inspect
    /// it. When unsatisfied, an explanation is appended to `tooltip`.
    pub fn satisfied(
        &self,
        entity: &Entity,
        exclude: Option<ItemId>,
        tooltip: Option<&mut String>,
        prefix: &str,
    ) -> bool {
        let condition = match self {
            Prereq::List(list) => return list.satisfied(entity, exclude, tooltip, prefix),
            Prereq::EquippedEquipment(p) => {
                let satisfied = p.satisfied(entity, exclude);
                if !satisfied {
                    if let Some(tooltip) = tooltip {
                        tooltip.push_str(prefix);
                        tooltip.push_str(&format!(
                            "Requires equipment whose name {}",
                            p.name
                        ));
                        if !p.tags.is_any() {
                            tooltip.push_str(&format!(", and tags {}", p.tags));
                        }
                        tooltip.push_str(" to be equipped");
                    }
                }
                return satisfied;
            }
            Prereq::Trait(p) => p.satisfied(entity, exclude),
            Prereq::Attribute(p) => p.satisfied(entity),
            Prereq::ContainedQuantity(p) => p.satisfied(entity, exclude),
            Prereq::ContainedWeight(p) => p.satisfied(entity, exclude),
            Prereq::Skill(p) => p.satisfied(entity, exclude),
            Prereq::Spell(p) => p.satisfied(entity, exclude),
        };
        let has = self.has();
        let satisfied = apply_has(has, condition);
        if !satisfied {
            if let Some(tooltip) = tooltip {
                tooltip.push_str(prefix);
                tooltip.push_str(has_text(has));
                self.describe(entity, tooltip);
            }
        }
        satisfied
    }

    fn describe(&self, entity: &Entity, buffer: &mut String) {
        match self {
            Prereq::List(_) | Prereq::EquippedEquipment(_) => {}
            Prereq::Trait(p) => p.describe(buffer),
            Prereq::Attribute(p) => p.describe(entity, buffer),
            Prereq::ContainedQuantity(p) => {
                buffer.push_str(&format!(" a contained quantity which {}", p.qualifier));
            }
            Prereq::ContainedWeight(p) => {
                buffer.push_str(" a contained weight which ");
                buffer.push_str(&p.qualifier.describe(entity.settings.default_weight_units));
            }
            Prereq::Skill(p) => p.describe(buffer),
            Prereq::Spell(p) => p.describe(buffer),
        }
    }
}

impl Nameables for Prereq {
    fn fill_with_nameable_keys(&self, m: &mut Replacements, existing: &Replacements) {
        match self {
            Prereq::List(list) => list.fill_with_nameable_keys(m, existing),
            Prereq::Trait(p) => {
                p.name.fill_with_nameable_keys(m, existing);
                p.notes.fill_with_nameable_keys(m, existing);
            }
            Prereq::Skill(p) => {
                p.name.fill_with_nameable_keys(m, existing);
                p.specialization.fill_with_nameable_keys(m, existing);
            }
            Prereq::Spell(p) => p.qualifier.fill_with_nameable_keys(m, existing),
            Prereq::EquippedEquipment(p) => {
                p.name.fill_with_nameable_keys(m, existing);
                p.tags.fill_with_nameable_keys(m, existing);
            }
            Prereq::Attribute(_) | Prereq::ContainedQuantity(_) | Prereq::ContainedWeight(_) => {}
        }
    }

    fn apply_nameable_keys(&mut self, m: &Replacements) {
        match self {
            Prereq::List(list) => list.apply_nameable_keys(m),
            Prereq::Trait(p) => {
                p.name.apply_nameable_keys(m);
                p.notes.apply_nameable_keys(m);
            }
            Prereq::Skill(p) => {
                p.name.apply_nameable_keys(m);
                p.specialization.apply_nameable_keys(m);
            }
            Prereq::Spell(p) => p.qualifier.apply_nameable_keys(m),
            Prereq::EquippedEquipment(p) => {
                p.name.apply_nameable_keys(m);
                p.tags.apply_nameable_keys(m);
            }
            Prereq::Attribute(_) | Prereq::ContainedQuantity(_) | Prereq::ContainedWeight(_) => {}
        }
    }
}

impl ContentHash for Prereq {
    fn hash_source(&self, h: &mut Sha256) {
        if let Prereq::List(list) = self {
            list.hash_source(h);
            return;
        }
        self.type_key().hash_source(h);
        self.has().hash_source(h);
        match self {
            Prereq::List(_) => {}
            Prereq::Trait(p) => {
                p.name.hash_source(h);
                p.level.hash_source(h);
                p.notes.hash_source(h);
            }
            Prereq::Attribute(p) => {
                p.which.hash_source(h);
                p.combined_with.hash_source(h);
                p.qualifier.hash_source(h);
            }
            Prereq::ContainedQuantity(p) => p.qualifier.hash_source(h),
            Prereq::ContainedWeight(p) => p.qualifier.hash_source(h),
            Prereq::Skill(p) => {
                p.name.hash_source(h);
                p.level.hash_source(h);
                p.specialization.hash_source(h);
            }
            Prereq::Spell(p) => {
                p.sub_type.key().hash_source(h);
                p.qualifier.hash_source(h);
                p.quantity.hash_source(h);
            }
            Prereq::EquippedEquipment(p) => {
                p.name.hash_source(h);
                p.tags.hash_source(h);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::NumericCompare;
    use crate::entity::{Equipment, Trait};

    fn lbs(n: i64) -> Weight {
        Weight::from_pounds(Fxp::from_int(n))
    }

    fn entity_with_magery() -> Entity {
        let mut entity = Entity::default();
        entity.add_trait(Trait::new("Magery"));
        entity
    }

    #[test]
    fn test_has_truth_table() {
        let entity = entity_with_magery();
        for (has, name, expected) in [
            (true, "Magery", true),
            (true, "Luck", false),
            (false, "Magery", false),
            (false, "Luck", true),
        ] {
            let prereq = Prereq::Trait(TraitPrereq {
                has,
                ..TraitPrereq::new(name)
            });
            let mut tooltip = String::new();
            let result = prereq.satisfied(&entity, None, Some(&mut tooltip), "|");
            assert_eq!(result, expected, "has={} name={}", has, name);
            assert_eq!(tooltip.is_empty(), result);
            if !result {
                assert!(tooltip.starts_with(&format!("|{}", has_text(has))));
            }
        }
    }

    #[test]
    fn test_item_excludes_itself() {
        let mut entity = Entity::default();
        let id = entity.add_trait(Trait::new("Magery"));
        let prereq = Prereq::Trait(TraitPrereq::new("Magery"));
        assert!(prereq.satisfied(&entity, None, None, ""));
        assert!(!prereq.satisfied(&entity, Some(id), None, ""));
    }

    #[test]
    fn test_any_of_list() {
        let entity = entity_with_magery();
        let mut list = PrereqList::new(false);
        list.prereqs.push(Prereq::Trait(TraitPrereq::new("Luck")));
        list.prereqs.push(Prereq::Trait(TraitPrereq::new("Magery")));
        let mut tooltip = String::new();
        assert!(list.satisfied(&entity, None, Some(&mut tooltip), "\n"));
        assert!(tooltip.is_empty());

        list.prereqs.remove(1);
        assert!(!list.satisfied(&entity, None, Some(&mut tooltip), "\n"));
        assert!(tooltip.starts_with("\nRequires at least one of:"));
    }

    #[test]
    fn test_list_reports_every_failed_child() {
        let entity = Entity::default();
        let mut list = PrereqList::new(true);
        list.prereqs.push(Prereq::Trait(TraitPrereq::new("Luck")));
        list.prereqs.push(Prereq::Skill(SkillPrereq::new("Stealth")));
        let mut tooltip = String::new();
        assert!(!list.satisfied(&entity, None, Some(&mut tooltip), "\n"));
        assert!(tooltip.contains("\n  has a trait whose name is \"Luck\""));
        assert!(tooltip.contains("\n  has a skill whose name is \"Stealth\""));
    }

    #[test]
    fn test_children_indent_without_newline_prefix() {
        let entity = Entity::default();
        let mut inner = PrereqList::new(false);
        inner.prereqs.push(Prereq::Skill(SkillPrereq::new("Stealth")));
        let mut list = PrereqList::new(true);
        list.prereqs.push(Prereq::Trait(TraitPrereq::new("Luck")));
        list.prereqs.push(Prereq::List(inner));
        let mut tooltip = String::new();
        assert!(!list.satisfied(&entity, None, Some(&mut tooltip), "| "));
        assert_eq!(
            tooltip,
            "| Requires all of:\
             \n  | has a trait whose name is \"Luck\"\
             \n  | Requires at least one of:\
             \n    | has a skill whose name is \"Stealth\""
        );
    }

    #[test]
    fn test_empty_list_is_satisfied() {
        let entity = Entity::default();
        assert!(PrereqList::new(true).satisfied(&entity, None, None, ""));
        assert!(PrereqList::new(false).satisfied(&entity, None, None, ""));
    }

    #[test]
    fn test_when_tl_gates_list() {
        let mut entity = Entity::default();
        entity.tech_level = "3".into();
        let mut list = PrereqList::new(true);
        list.when_tl = NumericCriteria::new(NumericCompare::AtLeast, Fxp::from_int(5));
        list.prereqs.push(Prereq::Trait(TraitPrereq::new("Luck")));
        assert!(list.satisfied(&entity, None, None, ""));
        entity.tech_level = "8".into();
        assert!(!list.satisfied(&entity, None, None, ""));
    }

    #[test]
    fn test_contained_weight() {
        let mut bag = Equipment::new("Bag", lbs(1));
        bag.children.push(Equipment::new("Rock", lbs(6)));
        let mut entity = Entity::default();
        let bag = entity.add_equipment(bag);
        let knife = entity.add_equipment(Equipment::new("Knife", lbs(1)));

        let at_most_5 = ContainedWeightPrereq::new(WeightCriteria::new(NumericCompare::AtMost, lbs(5)));
        let prereq = Prereq::ContainedWeight(at_most_5.clone());
        let mut tooltip = String::new();
        assert!(!prereq.satisfied(&entity, Some(bag), Some(&mut tooltip), "\n"));
        assert_eq!(tooltip, "\nhas a contained weight which at most 5 lb");

        // non-containers pass, missing equipment fails, both before `has`
        assert!(prereq.satisfied(&entity, Some(knife), None, ""));
        assert!(!prereq.satisfied(&entity, None, None, ""));
        let inverted = Prereq::ContainedWeight(ContainedWeightPrereq {
            has: false,
            ..at_most_5
        });
        assert!(!inverted.satisfied(&entity, Some(knife), None, ""));
        assert!(inverted.satisfied(&entity, None, None, ""));
        assert!(inverted.satisfied(&entity, Some(bag), None, ""));
    }

    #[test]
    fn test_contained_quantity() {
        let mut quiver = Equipment::new("Quiver", lbs(1));
        let mut arrows = Equipment::new("Arrow", lbs(0));
        arrows.quantity = Fxp::from_int(12);
        quiver.children.push(arrows);
        let mut entity = Entity::default();
        let quiver = entity.add_equipment(quiver);

        let prereq = Prereq::ContainedQuantity(ContainedQuantityPrereq {
            has: true,
            qualifier: NumericCriteria::new(NumericCompare::AtLeast, Fxp::from_int(10)),
        });
        assert!(prereq.satisfied(&entity, Some(quiver), None, ""));
    }

    #[test]
    fn test_attribute_combined_with() {
        let mut entity = Entity::default();
        entity.set_attribute("st", "Strength", Fxp::from_int(10));
        entity.set_attribute("dx", "Dexterity", Fxp::from_int(12));
        let mut p = AttributePrereq::new(
            "st",
            NumericCriteria::new(NumericCompare::AtLeast, Fxp::from_int(21)),
        );
        p.combined_with = Some("dx".into());
        let prereq = Prereq::Attribute(p);
        assert!(prereq.satisfied(&entity, None, None, ""));

        entity.set_attribute("dx", "Dexterity", Fxp::from_int(10));
        let mut tooltip = String::new();
        assert!(!prereq.satisfied(&entity, None, Some(&mut tooltip), "\n"));
        assert_eq!(tooltip, "\nhas Strength combined with Dexterity which at least 21");
    }

    #[test]
    fn test_serde_and_nameables() {
        let json = r#"{
            "all": false,
            "prereqs": [
                {"type": "skill_prereq", "has": true, "name": {"compare": "is", "qualifier": "@Weapon@"}},
                {"type": "prereq_list", "all": true, "when_tl": {"compare": "at_least", "qualifier": 4}}
            ]
        }"#;
        let mut list = PrereqList::from_json(json).unwrap();
        assert!(!list.all);
        assert!(matches!(list.prereqs[1], Prereq::List(_)));

        let mut m = Replacements::new();
        list.fill_with_nameable_keys(&mut m, &Replacements::new());
        assert!(m.contains_key("Weapon"));
        m.insert("Weapon".into(), "Rapier".into());
        list.apply_nameable_keys(&m);
        match &list.prereqs[0] {
            Prereq::Skill(p) => assert_eq!(p.name.qualifier, "Rapier"),
            other => panic!("unexpected {:?}", other),
        }

        let clone = list.clone();
        assert_eq!(clone, list);
        assert!(PrereqList::from_json(r#"{"prereqs":[{"type":"magic_prereq"}]}"#).is_err());
    }
}
