//! Characters and the rule items they own.
//!
//! An [`Entity`] holds attributes, a handful of derived-value bonuses and
//! four collections of rule items: traits, skills, spells and (nested)
//! equipment. [`Entity::recalculate`] runs one full pass:
//!
//! 1. gather every active feature into the [`BonusMap`]
//! 2. resolve each skill and spell level, following skill defaults
//! 3. evaluate every item's prerequisites
//!
//! Items are addressed by [`ItemId`], assigned when an item is added. Bonuses
//! and the skill-default resolver only ever hold ids, never references into
//! the item collections.

use crate::bonus::BonusMap;
use crate::default_graph::DefaultGraph;
use crate::error::RuleError;
use crate::feature::{AttributeLimitation, Feature};
use crate::fxp::Fxp;
use crate::hashing::ContentHash;
use crate::keyed::{is_default, keyed_enum};
use crate::library::SourceRef;
use crate::nameables::{self, Nameables, Replacements};
use crate::prereq::PrereqList;
use crate::skill_default::{Excludes, SkillDefault};
use crate::weight::{Weight, WeightUnit};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Prefix written before each unsatisfied prerequisite line.
pub const PREREQ_PREFIX: &str = "\n\u{2022} ";

/// Attribute id used for dodge calculation.
pub const BASIC_SPEED_ID: &str = "basic_speed";

/// Identity of a rule item within one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ItemId(u32);

impl ItemId {
    /// Wrap a raw id.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw id.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

keyed_enum! {
    /// How heavily loaded the character is.
    #[derive(Default, PartialOrd, Ord)]
    pub enum Encumbrance(|s| RuleError::UnknownValue("encumbrance", s)) {
        #[default]
        None => "none",
        Light => "light",
        Medium => "medium",
        Heavy => "heavy",
        ExtraHeavy => "extra_heavy",
    }
}

impl Encumbrance {
    /// The penalty this level applies to dodge.
    pub fn penalty(self) -> Fxp {
        match self {
            Encumbrance::None => Fxp::ZERO,
            Encumbrance::Light => Fxp::from_int(-1),
            Encumbrance::Medium => Fxp::from_int(-2),
            Encumbrance::Heavy => Fxp::from_int(-3),
            Encumbrance::ExtraHeavy => Fxp::from_int(-4),
        }
    }
}

keyed_enum! {
    /// How hard a skill or spell is to learn.
    pub enum DifficultyLevel(|s| RuleError::UnknownValue("difficulty", s)) {
        Easy => "e",
        Average => "a",
        Hard => "h",
        VeryHard => "vh",
    }
}

impl DifficultyLevel {
    /// Level relative to the controlling attribute for one point spent.
    pub fn base_relative_level(self) -> Fxp {
        match self {
            DifficultyLevel::Easy => Fxp::ZERO,
            DifficultyLevel::Average => Fxp::from_int(-1),
            DifficultyLevel::Hard => Fxp::from_int(-2),
            DifficultyLevel::VeryHard => Fxp::from_int(-3),
        }
    }
}

/// Controlling attribute and difficulty, written as `"dx/a"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Difficulty {
    pub attribute: String,
    pub level: DifficultyLevel,
}

impl Difficulty {
    /// Create a difficulty.
    pub fn new(attribute: &str, level: DifficultyLevel) -> Self {
        Self {
            attribute: attribute.trim().to_lowercase(),
            level,
        }
    }

    /// Level relative to the attribute for `points` spent, or `None` when
    /// less than a full point has been spent.
    ///
    /// ```rust
    /// use rulecore::entity::{Difficulty, DifficultyLevel};
    /// use rulecore::Fxp;
    ///
    /// let d = Difficulty::new("dx", DifficultyLevel::Average);
    /// assert_eq!(d.relative_level(Fxp::from_int(1)), Some(Fxp::from_int(-1)));
    /// assert_eq!(d.relative_level(Fxp::from_int(2)), Some(Fxp::ZERO));
    /// assert_eq!(d.relative_level(Fxp::from_int(8)), Some(Fxp::from_int(2)));
    /// assert_eq!(d.relative_level(Fxp::ZERO), None);
    /// ```
    pub fn relative_level(&self, points: Fxp) -> Option<Fxp> {
        let base = self.level.base_relative_level();
        let four = Fxp::from_int(4);
        if points < Fxp::ONE {
            None
        } else if points == Fxp::ONE {
            Some(base)
        } else if points < four {
            Some(base + Fxp::ONE)
        } else {
            Some(base + Fxp::ONE + (points / four).trunc())
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.attribute, self.level)
    }
}

impl FromStr for Difficulty {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((attribute, level)) => Ok(Self::new(attribute, level.parse()?)),
            None => Err(RuleError::UnknownValue("difficulty", s.to_string())),
        }
    }
}

impl Serialize for Difficulty {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Sheet-wide settings. Read-only for every rule computation.
///
/// # Examples
///
/// ```rust
/// use rulecore::entity::SheetSettings;
/// use rulecore::WeightUnit;
///
/// let settings = SheetSettings::from_json(r#"{"default_weight_units":"kg"}"#).unwrap();
/// assert_eq!(settings.default_weight_units, WeightUnit::Kilogram);
/// assert!(settings.use_rule_of_20);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetSettings {
    #[serde(skip_serializing_if = "is_default")]
    pub default_weight_units: WeightUnit,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub use_half_stat_defaults: bool,
    pub use_rule_of_20: bool,
}

impl Default for SheetSettings {
    fn default() -> Self {
        Self {
            default_weight_units: WeightUnit::Pound,
            use_half_stat_defaults: false,
            use_rule_of_20: true,
        }
    }
}

impl SheetSettings {
    /// Load settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        serde_json::from_str(json).map_err(|err| {
            warn!("unable to load sheet settings: {}", err);
            RuleError::from(err)
        })
    }
}

/// An attribute definition and its base value.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub base: Fxp,
}

/// A resolved level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelData {
    pub level: Fxp,
    pub relative_level: Fxp,
    pub tooltip: String,
}

impl Default for LevelData {
    fn default() -> Self {
        Self {
            level: Fxp::MIN,
            relative_level: Fxp::MIN,
            tooltip: String::new(),
        }
    }
}

/// An advantage, disadvantage, perk or quirk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trait {
    #[serde(skip)]
    pub id: ItemId,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levels: Option<Fxp>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<Feature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prereqs: Option<PrereqList>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub replacements: Replacements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRef>,
    #[serde(skip)]
    pub unsatisfied_reason: Option<String>,
}

impl Trait {
    /// A trait with no levels, features or prereqs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ItemId::default(),
            name: name.into(),
            notes: String::new(),
            tags: Vec::new(),
            levels: None,
            disabled: false,
            features: Vec::new(),
            prereqs: None,
            replacements: Replacements::new(),
            source: None,
            unsatisfied_reason: None,
        }
    }

    /// The name with this trait's replacements applied.
    pub fn name_with_replacements(&self) -> String {
        nameables::apply(&self.name, &self.replacements)
    }

    /// The notes with this trait's replacements applied.
    pub fn notes_with_replacements(&self) -> String {
        nameables::apply(&self.notes, &self.replacements)
    }

    /// The level used to scale this trait's leveled features.
    pub fn current_level(&self) -> Fxp {
        self.levels.unwrap_or(Fxp::ZERO)
    }
}

impl Nameables for Trait {
    fn fill_with_nameable_keys(&self, m: &mut Replacements, existing: &Replacements) {
        nameables::extract(&self.name, m, existing);
        nameables::extract(&self.notes, m, existing);
        self.features.fill_with_nameable_keys(m, existing);
        self.prereqs.fill_with_nameable_keys(m, existing);
    }

    fn apply_nameable_keys(&mut self, m: &Replacements) {
        self.name = nameables::apply(&self.name, m);
        self.notes = nameables::apply(&self.notes, m);
        self.features.apply_nameable_keys(m);
        self.prereqs.apply_nameable_keys(m);
    }
}

impl ContentHash for Trait {
    fn hash_source(&self, h: &mut Sha256) {
        self.name.hash_source(h);
        self.notes.hash_source(h);
        self.tags.hash_source(h);
        self.levels.is_some().hash_source(h);
        self.features.hash_source(h);
        self.prereqs.hash_source(h);
    }
}

/// A skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    #[serde(skip)]
    pub id: ItemId,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub specialization: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "is_default")]
    pub points: Fxp,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defaults: Vec<SkillDefault>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<Feature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prereqs: Option<PrereqList>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub replacements: Replacements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRef>,
    #[serde(skip)]
    pub level: LevelData,
    #[serde(skip)]
    pub unsatisfied_reason: Option<String>,
}

impl Skill {
    /// An untrained skill with no defaults.
    pub fn new(name: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            id: ItemId::default(),
            name: name.into(),
            specialization: String::new(),
            tags: Vec::new(),
            difficulty,
            points: Fxp::ZERO,
            defaults: Vec::new(),
            features: Vec::new(),
            prereqs: None,
            replacements: Replacements::new(),
            source: None,
            level: LevelData::default(),
            unsatisfied_reason: None,
        }
    }

    /// The name with this skill's replacements applied.
    pub fn name_with_replacements(&self) -> String {
        nameables::apply(&self.name, &self.replacements)
    }

    /// The specialization with this skill's replacements applied.
    pub fn specialization_with_replacements(&self) -> String {
        nameables::apply(&self.specialization, &self.replacements)
    }

    /// `Name (Specialization)`, with replacements applied.
    pub fn full_name(&self) -> String {
        let specialization = self.specialization_with_replacements();
        if specialization.is_empty() {
            self.name_with_replacements()
        } else {
            format!("{} ({})", self.name_with_replacements(), specialization)
        }
    }
}

impl Nameables for Skill {
    fn fill_with_nameable_keys(&self, m: &mut Replacements, existing: &Replacements) {
        nameables::extract(&self.name, m, existing);
        nameables::extract(&self.specialization, m, existing);
        self.defaults.fill_with_nameable_keys(m, existing);
        self.features.fill_with_nameable_keys(m, existing);
        self.prereqs.fill_with_nameable_keys(m, existing);
    }

    fn apply_nameable_keys(&mut self, m: &Replacements) {
        self.name = nameables::apply(&self.name, m);
        self.specialization = nameables::apply(&self.specialization, m);
        self.defaults.apply_nameable_keys(m);
        self.features.apply_nameable_keys(m);
        self.prereqs.apply_nameable_keys(m);
    }
}

impl ContentHash for Skill {
    fn hash_source(&self, h: &mut Sha256) {
        self.name.hash_source(h);
        self.specialization.hash_source(h);
        self.tags.hash_source(h);
        self.difficulty.attribute.hash_source(h);
        self.difficulty.level.key().hash_source(h);
        self.defaults.hash_source(h);
        self.features.hash_source(h);
        self.prereqs.hash_source(h);
    }
}

/// A spell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spell {
    #[serde(skip)]
    pub id: ItemId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub college: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub power_source: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "is_default")]
    pub points: Fxp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prereqs: Option<PrereqList>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub replacements: Replacements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRef>,
    #[serde(skip)]
    pub level: LevelData,
    #[serde(skip)]
    pub unsatisfied_reason: Option<String>,
}

impl Spell {
    /// An untrained spell.
    pub fn new(name: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            id: ItemId::default(),
            name: name.into(),
            college: Vec::new(),
            power_source: String::new(),
            tags: Vec::new(),
            difficulty,
            points: Fxp::ZERO,
            prereqs: None,
            replacements: Replacements::new(),
            source: None,
            level: LevelData::default(),
            unsatisfied_reason: None,
        }
    }

    /// The name with this spell's replacements applied.
    pub fn name_with_replacements(&self) -> String {
        nameables::apply(&self.name, &self.replacements)
    }

    /// The colleges with this spell's replacements applied.
    pub fn college_with_replacements(&self) -> Vec<String> {
        nameables::apply_to_list(&self.college, &self.replacements)
    }

    /// The power source with this spell's replacements applied.
    pub fn power_source_with_replacements(&self) -> String {
        nameables::apply(&self.power_source, &self.replacements)
    }
}

impl Nameables for Spell {
    fn fill_with_nameable_keys(&self, m: &mut Replacements, existing: &Replacements) {
        nameables::extract(&self.name, m, existing);
        nameables::extract_from_list(&self.college, m, existing);
        nameables::extract(&self.power_source, m, existing);
        self.prereqs.fill_with_nameable_keys(m, existing);
    }

    fn apply_nameable_keys(&mut self, m: &Replacements) {
        self.name = nameables::apply(&self.name, m);
        self.college = nameables::apply_to_list(&self.college, m);
        self.power_source = nameables::apply(&self.power_source, m);
        self.prereqs.apply_nameable_keys(m);
    }
}

impl ContentHash for Spell {
    fn hash_source(&self, h: &mut Sha256) {
        self.name.hash_source(h);
        self.college.hash_source(h);
        self.power_source.hash_source(h);
        self.tags.hash_source(h);
        self.difficulty.attribute.hash_source(h);
        self.difficulty.level.key().hash_source(h);
        self.prereqs.hash_source(h);
    }
}

fn one() -> Fxp {
    Fxp::ONE
}

fn is_one(value: &Fxp) -> bool {
    *value == Fxp::ONE
}

fn yes() -> bool {
    true
}

/// A piece of equipment, possibly a container of other equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(skip)]
    pub id: ItemId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub quantity: Fxp,
    #[serde(default, skip_serializing_if = "is_default")]
    pub weight: Weight,
    #[serde(default = "yes")]
    pub equipped: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<Feature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prereqs: Option<PrereqList>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Equipment>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub replacements: Replacements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRef>,
    #[serde(skip)]
    pub unsatisfied_reason: Option<String>,
}

impl Equipment {
    /// A single equipped item of the given unit weight.
    pub fn new(name: impl Into<String>, weight: Weight) -> Self {
        Self {
            id: ItemId::default(),
            name: name.into(),
            tags: Vec::new(),
            quantity: Fxp::ONE,
            weight,
            equipped: true,
            features: Vec::new(),
            prereqs: None,
            children: Vec::new(),
            replacements: Replacements::new(),
            source: None,
            unsatisfied_reason: None,
        }
    }

    /// Whether this item holds other items.
    pub fn is_container(&self) -> bool {
        !self.children.is_empty()
    }

    /// The weight of one of this item, contents excluded.
    pub fn adjusted_weight(&self) -> Weight {
        self.weight
    }

    /// The weight of the whole stack plus everything it contains.
    pub fn extended_weight(&self) -> Weight {
        self.weight * self.quantity + self.children.iter().map(Equipment::extended_weight).sum()
    }

    /// The name with this item's replacements applied.
    pub fn name_with_replacements(&self) -> String {
        nameables::apply(&self.name, &self.replacements)
    }

    /// Find `id` in this item or anything it contains.
    pub fn find(&self, id: ItemId) -> Option<&Equipment> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    fn assign_ids(&mut self, next: &mut impl FnMut() -> ItemId) {
        self.id = next();
        for child in &mut self.children {
            child.assign_ids(next);
        }
    }

    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Equipment)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }

    fn visit_mut(&mut self, f: &mut impl FnMut(&mut Equipment)) {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }
}

impl Nameables for Equipment {
    fn fill_with_nameable_keys(&self, m: &mut Replacements, existing: &Replacements) {
        nameables::extract(&self.name, m, existing);
        self.features.fill_with_nameable_keys(m, existing);
        self.prereqs.fill_with_nameable_keys(m, existing);
        self.children.fill_with_nameable_keys(m, existing);
    }

    fn apply_nameable_keys(&mut self, m: &Replacements) {
        self.name = nameables::apply(&self.name, m);
        self.features.apply_nameable_keys(m);
        self.prereqs.apply_nameable_keys(m);
        self.children.apply_nameable_keys(m);
    }
}

impl ContentHash for Equipment {
    fn hash_source(&self, h: &mut Sha256) {
        self.name.hash_source(h);
        self.tags.hash_source(h);
        self.weight.hash_source(h);
        self.features.hash_source(h);
        self.prereqs.hash_source(h);
    }
}

/// A character sheet: attributes, rule items and the bonuses they produce.
///
/// # Examples
///
/// ```rust
/// use rulecore::entity::{Difficulty, DifficultyLevel, Entity, Skill};
/// use rulecore::skill_default::SkillDefault;
/// use rulecore::Fxp;
///
/// let mut entity = Entity::default();
/// entity.set_attribute("dx", "Dexterity", Fxp::from_int(12));
///
/// let mut sword = Skill::new("Broadsword", Difficulty::new("dx", DifficultyLevel::Average));
/// sword.points = Fxp::from_int(2);
/// entity.add_skill(sword);
///
/// let mut parry = Skill::new("Shortsword", Difficulty::new("dx", DifficultyLevel::Average));
/// parry.defaults.push(SkillDefault::skill("Broadsword", Fxp::from_int(-2)));
/// let shortsword = entity.add_skill(parry);
///
/// entity.recalculate();
/// assert_eq!(entity.skill(shortsword).unwrap().level.level, Fxp::from_int(10));
/// ```
#[derive(Debug, Clone)]
pub struct Entity {
    pub settings: SheetSettings,
    pub attributes: BTreeMap<String, Attribute>,
    pub encumbrance: Encumbrance,
    pub parry_bonus: Fxp,
    pub block_bonus: Fxp,
    pub dodge_bonus: Fxp,
    pub tech_level: String,
    pub traits: Vec<Trait>,
    pub skills: Vec<Skill>,
    pub spells: Vec<Spell>,
    pub equipment: Vec<Equipment>,
    bonuses: BonusMap,
    next_id: u32,
}

impl Default for Entity {
    fn default() -> Self {
        Self::new(SheetSettings::default())
    }
}

impl Entity {
    /// An empty entity using `settings`.
    pub fn new(settings: SheetSettings) -> Self {
        Self {
            settings,
            attributes: BTreeMap::new(),
            encumbrance: Encumbrance::None,
            parry_bonus: Fxp::ZERO,
            block_bonus: Fxp::ZERO,
            dodge_bonus: Fxp::ZERO,
            tech_level: String::new(),
            traits: Vec::new(),
            skills: Vec::new(),
            spells: Vec::new(),
            equipment: Vec::new(),
            bonuses: BonusMap::new(),
            next_id: 0,
        }
    }

    fn next_item_id(&mut self) -> ItemId {
        self.next_id += 1;
        ItemId::new(self.next_id)
    }

    /// Define or replace an attribute. Ids are case-insensitive.
    pub fn set_attribute(&mut self, id: &str, name: impl Into<String>, base: Fxp) {
        self.attributes.insert(
            id.trim().to_lowercase(),
            Attribute {
                name: name.into(),
                base,
            },
        );
    }

    /// Add a trait, returning its id.
    pub fn add_trait(&mut self, mut item: Trait) -> ItemId {
        item.id = self.next_item_id();
        let id = item.id;
        self.traits.push(item);
        id
    }

    /// Add a skill, returning its id.
    pub fn add_skill(&mut self, mut item: Skill) -> ItemId {
        item.id = self.next_item_id();
        let id = item.id;
        self.skills.push(item);
        id
    }

    /// Add a spell, returning its id.
    pub fn add_spell(&mut self, mut item: Spell) -> ItemId {
        item.id = self.next_item_id();
        let id = item.id;
        self.spells.push(item);
        id
    }

    /// Add a piece of equipment and its contents, returning the outer id.
    pub fn add_equipment(&mut self, mut item: Equipment) -> ItemId {
        let mut next_id = self.next_id;
        item.assign_ids(&mut || {
            next_id += 1;
            ItemId::new(next_id)
        });
        self.next_id = next_id;
        let id = item.id;
        self.equipment.push(item);
        id
    }

    /// The bonuses gathered by the last [`recalculate`](Self::recalculate).
    pub fn bonuses(&self) -> &BonusMap {
        &self.bonuses
    }

    /// Look up a skill.
    pub fn skill(&self, id: ItemId) -> Option<&Skill> {
        self.skills.iter().find(|sk| sk.id == id)
    }

    /// Look up a trait.
    pub fn trait_item(&self, id: ItemId) -> Option<&Trait> {
        self.traits.iter().find(|t| t.id == id)
    }

    /// Look up a spell.
    pub fn spell(&self, id: ItemId) -> Option<&Spell> {
        self.spells.iter().find(|sp| sp.id == id)
    }

    /// Look up a piece of equipment at any nesting depth.
    pub fn equipment_item(&self, id: ItemId) -> Option<&Equipment> {
        self.equipment.iter().find_map(|eqp| eqp.find(id))
    }

    /// Visit every piece of equipment, containers before their contents.
    pub fn for_each_equipment<'a>(&'a self, mut f: impl FnMut(&'a Equipment)) {
        for eqp in &self.equipment {
            eqp.visit(&mut f);
        }
    }

    /// The display name of an item.
    pub fn item_name(&self, id: ItemId) -> Result<String, RuleError> {
        if let Some(t) = self.trait_item(id) {
            return Ok(t.name_with_replacements());
        }
        if let Some(sk) = self.skill(id) {
            return Ok(sk.full_name());
        }
        if let Some(sp) = self.spell(id) {
            return Ok(sp.name_with_replacements());
        }
        if let Some(eqp) = self.equipment_item(id) {
            return Ok(eqp.name_with_replacements());
        }
        Err(RuleError::UnknownItem(id))
    }

    /// Skills with the given name (and specialization, when not empty).
    ///
    /// Skills on the current resolution path in `excludes` are skipped.
    /// With `require_points`, skills with no points spent are skipped too.
    pub fn skill_named(
        &self,
        name: &str,
        specialization: &str,
        require_points: bool,
        excludes: &Excludes,
    ) -> Vec<&Skill> {
        self.skills
            .iter()
            .filter(|sk| {
                if !sk.name_with_replacements().eq_ignore_ascii_case(name) {
                    return false;
                }
                if excludes.contains(sk.id) {
                    debug!(skill = %sk.full_name(), "skipping skill already being resolved");
                    return false;
                }
                if require_points && sk.points <= Fxp::ZERO {
                    return false;
                }
                specialization.is_empty()
                    || sk
                        .specialization_with_replacements()
                        .eq_ignore_ascii_case(specialization)
            })
            .collect()
    }

    /// The current value of an attribute, bonuses included, or
    /// [`Fxp::MIN`] if the entity has no such attribute.
    pub fn resolve_attribute_current(&self, id: &str) -> Fxp {
        let id = id.trim().to_lowercase();
        match self.attributes.get(&id) {
            Some(attr) => {
                attr.base
                    + self
                        .bonuses
                        .attribute_bonus_for(self, &id, AttributeLimitation::None, None)
            }
            None => Fxp::MIN,
        }
    }

    /// The display name of an attribute, or the id itself if unknown.
    pub fn resolve_attribute_name(&self, id: &str) -> String {
        let key = id.trim().to_lowercase();
        self.attributes
            .get(&key)
            .map(|attr| attr.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Dodge at the given encumbrance: basic speed plus bonuses, truncated,
    /// plus three, reduced by the encumbrance penalty, never below one.
    pub fn dodge(&self, encumbrance: Encumbrance) -> Fxp {
        let speed = self.resolve_attribute_current(BASIC_SPEED_ID).max(Fxp::ZERO);
        let dodge = (speed + self.dodge_bonus).trunc() + Fxp::THREE + encumbrance.penalty();
        dodge.max(Fxp::ONE)
    }

    /// The numeric tech level: the leading number of `tech_level`, or zero.
    pub fn tech_level_value(&self) -> Fxp {
        let digits: String = self
            .tech_level
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        digits
            .parse::<f64>()
            .map(Fxp::from_f64)
            .unwrap_or(Fxp::ZERO)
            .max(Fxp::ZERO)
    }

    /// Compute a skill's level, following its defaults.
    ///
    /// The skill is on the resolution path in `excludes` while its defaults
    /// are evaluated, so a default chain leading back to it finds nothing.
    pub fn calculate_skill_level(&self, skill: &Skill, excludes: &mut Excludes) -> LevelData {
        let inserted = excludes.insert(skill.id);
        let attribute = self.resolve_attribute_current(&skill.difficulty.attribute);
        let mut level = match skill.difficulty.relative_level(skill.points) {
            Some(relative) if !attribute.is_undefined() => attribute + relative,
            _ => Fxp::MIN,
        };
        for def in &skill.defaults {
            let candidate = def.skill_level(
                self,
                &skill.replacements,
                true,
                excludes,
                self.settings.use_rule_of_20,
            );
            if candidate > level {
                level = candidate;
            }
        }
        if inserted {
            excludes.remove(skill.id);
        }

        let mut tooltip = String::new();
        if !level.is_undefined() {
            level += self.bonuses.skill_bonus_for(
                self,
                &skill.name_with_replacements(),
                &skill.specialization_with_replacements(),
                &skill.tags,
                Some(&mut tooltip),
            );
        }
        LevelData {
            level,
            relative_level: relative_to(level, attribute),
            tooltip,
        }
    }

    /// Compute a spell's level.
    pub fn calculate_spell_level(&self, spell: &Spell) -> LevelData {
        let attribute = self.resolve_attribute_current(&spell.difficulty.attribute);
        let mut level = match spell.difficulty.relative_level(spell.points) {
            Some(relative) if !attribute.is_undefined() => attribute + relative,
            _ => Fxp::MIN,
        };
        let mut tooltip = String::new();
        if !level.is_undefined() {
            level += self.bonuses.spell_bonus_for(
                self,
                &spell.name_with_replacements(),
                &spell.college_with_replacements(),
                &spell.power_source_with_replacements(),
                &spell.tags,
                Some(&mut tooltip),
            );
        }
        LevelData {
            level,
            relative_level: relative_to(level, attribute),
            tooltip,
        }
    }

    /// Rebuild bonuses, skill and spell levels, and prerequisite state.
    pub fn recalculate(&mut self) {
        self.bonuses = BonusMap::gather(self);

        let cycles = DefaultGraph::from_entity(self).cycles();
        if !cycles.is_empty() {
            let names: Vec<String> = cycles
                .iter()
                .map(|cycle| {
                    cycle
                        .iter()
                        .map(|id| self.item_name(*id).unwrap_or_else(|_| id.to_string()))
                        .collect::<Vec<_>>()
                        .join(" -> ")
                })
                .collect();
            warn!(cycles = ?names, "skill defaults refer back to themselves");
        }

        let skill_levels: Vec<LevelData> = self
            .skills
            .iter()
            .map(|sk| self.calculate_skill_level(sk, &mut Excludes::new()))
            .collect();
        for (sk, level) in self.skills.iter_mut().zip(skill_levels) {
            sk.level = level;
        }

        let spell_levels: Vec<LevelData> = self
            .spells
            .iter()
            .map(|sp| self.calculate_spell_level(sp))
            .collect();
        for (sp, level) in self.spells.iter_mut().zip(spell_levels) {
            sp.level = level;
        }

        self.update_prereqs();
        debug!(
            skills = self.skills.len(),
            spells = self.spells.len(),
            bonus_keys = self.bonuses.len(),
            "recalculated entity"
        );
    }

    fn unsatisfied_reason(&self, prereqs: Option<&PrereqList>, id: ItemId) -> Option<String> {
        let prereqs = prereqs?;
        let mut tooltip = String::new();
        if prereqs.satisfied(self, Some(id), Some(&mut tooltip), PREREQ_PREFIX) {
            None
        } else {
            Some(tooltip)
        }
    }

    fn update_prereqs(&mut self) {
        let traits: Vec<_> = self
            .traits
            .iter()
            .map(|t| self.unsatisfied_reason(t.prereqs.as_ref(), t.id))
            .collect();
        let skills: Vec<_> = self
            .skills
            .iter()
            .map(|sk| self.unsatisfied_reason(sk.prereqs.as_ref(), sk.id))
            .collect();
        let spells: Vec<_> = self
            .spells
            .iter()
            .map(|sp| self.unsatisfied_reason(sp.prereqs.as_ref(), sp.id))
            .collect();
        let mut equipment = BTreeMap::new();
        self.for_each_equipment(|eqp| {
            equipment.insert(eqp.id, self.unsatisfied_reason(eqp.prereqs.as_ref(), eqp.id));
        });

        for (t, reason) in self.traits.iter_mut().zip(traits) {
            t.unsatisfied_reason = reason;
        }
        for (sk, reason) in self.skills.iter_mut().zip(skills) {
            sk.unsatisfied_reason = reason;
        }
        for (sp, reason) in self.spells.iter_mut().zip(spells) {
            sp.unsatisfied_reason = reason;
        }
        for eqp in &mut self.equipment {
            eqp.visit_mut(&mut |one| {
                one.unsatisfied_reason = equipment.remove(&one.id).flatten();
            });
        }
    }
}

fn relative_to(level: Fxp, attribute: Fxp) -> Fxp {
    if level.is_undefined() || attribute.is_undefined() {
        Fxp::MIN
    } else {
        level - attribute
    }
}
