//! Features: rule elements that grant a bonus to some target.
//!
//! A [`Feature`] lives on a rule item (trait, equipment, ...). When the
//! owning entity recomputes its statistics every active feature is turned
//! into a [`Bonus`](crate::bonus::Bonus) and filed under its
//! [map key](Feature::feature_map_key), so lookups for a given target only
//! have to look at one bucket plus the wildcard buckets.

use crate::criteria::{NumericCompare, NumericCriteria, StringCompare, StringCriteria};
use crate::error::RuleError;
use crate::fxp::Fxp;
use crate::hashing::ContentHash;
use crate::keyed::{is_default, keyed_enum};
use crate::leveled::LeveledAmount;
use crate::nameables::{self, Nameables, Replacements};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::warn;

/// Map key for bonuses that apply to the weapon carrying them.
pub const THIS_WEAPON_ID: &str = "\u{1}";
/// Prefix for keys that select weapons by name.
pub const WEAPON_NAMED_ID_PREFIX: &str = "weapon_named.";
/// Prefix for keys that select skills by name.
pub const SKILL_NAME_ID: &str = "skill.name";
/// Prefix for attribute bonus keys.
pub const ATTRIBUTE_ID_PREFIX: &str = "attr.";
/// Prefix for keys that select spells by name.
pub const SPELL_NAME_ID: &str = "spell.name";
/// Prefix for keys that select spells by college.
pub const SPELL_COLLEGE_ID: &str = "spell.college";
/// Prefix for keys that select spells by power source.
pub const SPELL_POWER_SOURCE_ID: &str = "spell.power_source";
/// Prefix for DR bonus keys.
pub const HIT_LOCATION_ID_PREFIX: &str = "hit_location.";
/// Key for reaction bonuses.
pub const REACTION_ID: &str = "reaction";

keyed_enum! {
    /// How a weapon bonus picks the weapons it applies to.
    pub enum WeaponSelectionType(RuleError::UnknownSelectionType) {
        WithRequiredSkill => "weapons_with_required_skill",
        ThisWeapon => "this_weapon",
        WithName => "weapons_with_name",
    }
}

keyed_enum! {
    /// How a skill bonus picks what it applies to.
    pub enum SkillSelectionType(RuleError::UnknownSelectionType) {
        SkillsWithName => "skills_with_name",
        WeaponsWithName => "weapons_with_name",
        ThisWeapon => "this_weapon",
    }
}

keyed_enum! {
    /// How a spell bonus picks the spells it applies to.
    pub enum SpellMatchType(RuleError::UnknownSpellMatchType) {
        AllColleges => "all_colleges",
        CollegeName => "college_name",
        PowerSourceName => "power_source_name",
        SpellName => "spell_name",
    }
}

keyed_enum! {
    /// Restricts an attribute bonus to one use of the attribute.
    #[derive(Default)]
    pub enum AttributeLimitation(|s| RuleError::UnknownValue("attribute limitation", s)) {
        #[default]
        None => "none",
        StrikingOnly => "striking_only",
        LiftingOnly => "lifting_only",
        ThrowingOnly => "throwing_only",
    }
}

/// `prefix/target` with the target lowercased, matching the case-insensitive
/// comparison the criteria use.
pub fn exact_key(prefix: &str, target: &str) -> String {
    format!("{}/{}", prefix, target.to_lowercase())
}

/// [`exact_key`] when the name criterion is exact and every secondary
/// criterion is a wildcard, `prefix*` otherwise.
fn build_key(
    prefix: &str,
    name: &StringCriteria,
    specialization: &StringCriteria,
    tags: &StringCriteria,
) -> String {
    if name.compare == StringCompare::Is && specialization.is_any() && tags.is_any() {
        exact_key(prefix, &name.qualifier)
    } else {
        format!("{}*", prefix)
    }
}

/// A bonus to an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeBonus {
    pub attribute: String,
    #[serde(default, skip_serializing_if = "is_default")]
    pub limitation: AttributeLimitation,
    #[serde(flatten)]
    pub amount: LeveledAmount,
}

impl AttributeBonus {
    /// A +1 bonus to `attribute`.
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            limitation: AttributeLimitation::None,
            amount: LeveledAmount::default(),
        }
    }
}

/// A bonus to skills, or to weapons by the skill they use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillBonus {
    pub selection_type: SkillSelectionType,
    #[serde(default, skip_serializing_if = "is_default")]
    pub name: StringCriteria,
    #[serde(default, skip_serializing_if = "is_default")]
    pub specialization: StringCriteria,
    #[serde(default, alias = "category", skip_serializing_if = "is_default")]
    pub tags: StringCriteria,
    #[serde(flatten)]
    pub amount: LeveledAmount,
}

impl SkillBonus {
    /// A +1 bonus to skills named exactly `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            selection_type: SkillSelectionType::SkillsWithName,
            name: StringCriteria::is(name),
            specialization: StringCriteria::any(),
            tags: StringCriteria::any(),
            amount: LeveledAmount::default(),
        }
    }

    /// Whether this bonus applies to the given skill.
    pub fn matches_skill(&self, name: &str, specialization: &str, tags: &[String]) -> bool {
        self.name.matches(name) && self.specialization.matches(specialization) && self.tags.matches_list(tags)
    }

    fn feature_map_key(&self) -> String {
        match self.selection_type {
            SkillSelectionType::SkillsWithName => {
                build_key(SKILL_NAME_ID, &self.name, &self.specialization, &self.tags)
            }
            SkillSelectionType::ThisWeapon => THIS_WEAPON_ID.to_string(),
            SkillSelectionType::WeaponsWithName => build_key(
                WEAPON_NAMED_ID_PREFIX,
                &self.name,
                &self.specialization,
                &self.tags,
            ),
        }
    }
}

/// A bonus to spells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellBonus {
    #[serde(rename = "match")]
    pub match_type: SpellMatchType,
    #[serde(default, skip_serializing_if = "is_default")]
    pub name: StringCriteria,
    #[serde(default, alias = "category", skip_serializing_if = "is_default")]
    pub tags: StringCriteria,
    #[serde(flatten)]
    pub amount: LeveledAmount,
}

impl SpellBonus {
    /// A +1 bonus to every spell.
    pub fn new() -> Self {
        Self {
            match_type: SpellMatchType::AllColleges,
            name: StringCriteria::is(""),
            tags: StringCriteria::any(),
            amount: LeveledAmount::default(),
        }
    }

    /// Whether this bonus applies to a spell with the given attributes.
    pub fn matches_spell(
        &self,
        name: &str,
        colleges: &[String],
        power_source: &str,
        tags: &[String],
    ) -> bool {
        if !self.tags.matches_list(tags) {
            return false;
        }
        match self.match_type {
            SpellMatchType::AllColleges => true,
            SpellMatchType::CollegeName => self.name.matches_list(colleges),
            SpellMatchType::PowerSourceName => self.name.matches(power_source),
            SpellMatchType::SpellName => self.name.matches(name),
        }
    }

    fn feature_map_key(&self) -> String {
        if !self.tags.is_any() {
            return format!("{}*", SPELL_NAME_ID);
        }
        let any = StringCriteria::any();
        match self.match_type {
            SpellMatchType::AllColleges => SPELL_COLLEGE_ID.to_string(),
            SpellMatchType::CollegeName => build_key(SPELL_COLLEGE_ID, &self.name, &any, &any),
            SpellMatchType::PowerSourceName => {
                build_key(SPELL_POWER_SOURCE_ID, &self.name, &any, &any)
            }
            SpellMatchType::SpellName => build_key(SPELL_NAME_ID, &self.name, &any, &any),
        }
    }
}

impl Default for SpellBonus {
    fn default() -> Self {
        Self::new()
    }
}

/// A bonus to weapon damage or to a weapon's DR divisor.
///
/// The same record backs both [`Feature::WeaponBonus`] and
/// [`Feature::WeaponDrDivisorBonus`]; only the tooltip wording differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponBonus {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub percent: bool,
    pub selection_type: WeaponSelectionType,
    #[serde(default, skip_serializing_if = "is_default")]
    pub name: StringCriteria,
    #[serde(default, skip_serializing_if = "is_default")]
    pub specialization: StringCriteria,
    #[serde(default, skip_serializing_if = "is_default")]
    pub level: NumericCriteria,
    #[serde(default, alias = "category", skip_serializing_if = "is_default")]
    pub tags: StringCriteria,
    #[serde(flatten)]
    pub amount: LeveledAmount,
}

impl WeaponBonus {
    /// A +1 bonus to weapons using the skill named exactly `skill_name`.
    pub fn new(skill_name: impl Into<String>) -> Self {
        Self {
            percent: false,
            selection_type: WeaponSelectionType::WithRequiredSkill,
            name: StringCriteria::is(skill_name),
            specialization: StringCriteria::any(),
            level: NumericCriteria::new(NumericCompare::AtLeast, Fxp::ZERO),
            tags: StringCriteria::any(),
            amount: LeveledAmount::default(),
        }
    }

    /// Whether this bonus applies to a weapon whose required skill has the
    /// given name, specialization and relative level.
    pub fn matches_weapon_skill(
        &self,
        skill_name: &str,
        specialization: &str,
        relative_level: Fxp,
        tags: &[String],
    ) -> bool {
        self.name.matches(skill_name)
            && self.specialization.matches(specialization)
            && self.level.matches(relative_level)
            && self.tags.matches_list(tags)
    }

    /// Whether this bonus applies to a weapon with the given name and usage.
    pub fn matches_weapon_name(&self, name: &str, usage: &str, tags: &[String]) -> bool {
        self.name.matches(name) && self.specialization.matches(usage) && self.tags.matches_list(tags)
    }

    fn feature_map_key(&self) -> String {
        match self.selection_type {
            WeaponSelectionType::WithRequiredSkill => {
                build_key(SKILL_NAME_ID, &self.name, &self.specialization, &self.tags)
            }
            WeaponSelectionType::ThisWeapon => THIS_WEAPON_ID.to_string(),
            WeaponSelectionType::WithName => build_key(
                WEAPON_NAMED_ID_PREFIX,
                &self.name,
                &self.specialization,
                &self.tags,
            ),
        }
    }
}

/// A bonus to damage resistance at a hit location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrBonus {
    pub location: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub specialization: String,
    #[serde(flatten)]
    pub amount: LeveledAmount,
}

/// A bonus to reaction rolls in some situation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionBonus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub situation: String,
    #[serde(flatten)]
    pub amount: LeveledAmount,
}

/// Every kind of feature a rule item can carry.
///
/// # Examples
///
/// ```rust
/// use rulecore::feature::{Feature, WeaponBonus};
///
/// let bonus = Feature::WeaponBonus(WeaponBonus::new("Broadsword"));
/// assert_eq!(bonus.feature_map_key(), "skill.name/broadsword");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Feature {
    #[serde(rename = "attribute_bonus")]
    AttributeBonus(AttributeBonus),
    #[serde(rename = "skill_bonus")]
    SkillBonus(SkillBonus),
    #[serde(rename = "spell_bonus")]
    SpellBonus(SpellBonus),
    #[serde(rename = "weapon_bonus")]
    WeaponBonus(WeaponBonus),
    #[serde(rename = "weapon_dr_divisor_bonus")]
    WeaponDrDivisorBonus(WeaponBonus),
    #[serde(rename = "dr_bonus")]
    DrBonus(DrBonus),
    #[serde(rename = "reaction_bonus")]
    ReactionBonus(ReactionBonus),
}

impl Feature {
    /// Parse a feature from its JSON document form.
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        serde_json::from_str(json).map_err(|err| {
            warn!("unable to load feature: {}", err);
            RuleError::from(err)
        })
    }

    /// The `type` key this feature is persisted under.
    pub fn type_key(&self) -> &'static str {
        match self {
            Feature::AttributeBonus(_) => "attribute_bonus",
            Feature::SkillBonus(_) => "skill_bonus",
            Feature::SpellBonus(_) => "spell_bonus",
            Feature::WeaponBonus(_) => "weapon_bonus",
            Feature::WeaponDrDivisorBonus(_) => "weapon_dr_divisor_bonus",
            Feature::DrBonus(_) => "dr_bonus",
            Feature::ReactionBonus(_) => "reaction_bonus",
        }
    }

    /// The key under which bonuses from this feature are filed.
    pub fn feature_map_key(&self) -> String {
        match self {
            Feature::AttributeBonus(a) => {
                let attribute = a.attribute.trim().to_lowercase();
                match a.limitation {
                    AttributeLimitation::None => format!("{}{}", ATTRIBUTE_ID_PREFIX, attribute),
                    limitation => format!("{}{}.{}", ATTRIBUTE_ID_PREFIX, attribute, limitation),
                }
            }
            Feature::SkillBonus(s) => s.feature_map_key(),
            Feature::SpellBonus(s) => s.feature_map_key(),
            Feature::WeaponBonus(w) | Feature::WeaponDrDivisorBonus(w) => w.feature_map_key(),
            Feature::DrBonus(d) => {
                format!("{}{}", HIT_LOCATION_ID_PREFIX, d.location.trim().to_lowercase())
            }
            Feature::ReactionBonus(_) => REACTION_ID.to_string(),
        }
    }

    /// The amount this feature grants.
    pub fn leveled_amount(&self) -> &LeveledAmount {
        match self {
            Feature::AttributeBonus(a) => &a.amount,
            Feature::SkillBonus(s) => &s.amount,
            Feature::SpellBonus(s) => &s.amount,
            Feature::WeaponBonus(w) | Feature::WeaponDrDivisorBonus(w) => &w.amount,
            Feature::DrBonus(d) => &d.amount,
            Feature::ReactionBonus(r) => &r.amount,
        }
    }

    /// Mutable access to the amount this feature grants.
    pub fn leveled_amount_mut(&mut self) -> &mut LeveledAmount {
        match self {
            Feature::AttributeBonus(a) => &mut a.amount,
            Feature::SkillBonus(s) => &mut s.amount,
            Feature::SpellBonus(s) => &mut s.amount,
            Feature::WeaponBonus(w) | Feature::WeaponDrDivisorBonus(w) => &mut w.amount,
            Feature::DrBonus(d) => &mut d.amount,
            Feature::ReactionBonus(r) => &mut r.amount,
        }
    }

    /// Append a line describing this feature, granted by `owner_name`.
    ///
    /// A `None` buffer is accepted and ignored.
    pub fn add_to_tooltip(&self, owner_name: &str, buffer: Option<&mut String>) {
        let Some(buffer) = buffer else {
            return;
        };
        buffer.push('\n');
        buffer.push_str(owner_name);
        buffer.push_str(" [");
        match self {
            Feature::WeaponBonus(w) => {
                buffer.push_str(&w.amount.format(w.percent, "die"));
                buffer.push_str(" to damage");
            }
            Feature::WeaponDrDivisorBonus(w) => {
                buffer.push_str(&w.amount.format_with_level(w.percent));
                buffer.push_str(" to DR divisor");
            }
            other => buffer.push_str(&other.leveled_amount().format_with_level(false)),
        }
        buffer.push(']');
    }
}

impl Nameables for Feature {
    fn fill_with_nameable_keys(&self, m: &mut Replacements, existing: &Replacements) {
        match self {
            Feature::AttributeBonus(_) | Feature::DrBonus(_) => {}
            Feature::SkillBonus(s) => {
                s.specialization.fill_with_nameable_keys(m, existing);
                if s.selection_type != SkillSelectionType::ThisWeapon {
                    s.name.fill_with_nameable_keys(m, existing);
                    s.tags.fill_with_nameable_keys(m, existing);
                }
            }
            Feature::SpellBonus(s) => {
                s.name.fill_with_nameable_keys(m, existing);
                s.tags.fill_with_nameable_keys(m, existing);
            }
            Feature::WeaponBonus(w) | Feature::WeaponDrDivisorBonus(w) => {
                w.specialization.fill_with_nameable_keys(m, existing);
                if w.selection_type != WeaponSelectionType::ThisWeapon {
                    w.name.fill_with_nameable_keys(m, existing);
                    w.tags.fill_with_nameable_keys(m, existing);
                }
            }
            Feature::ReactionBonus(r) => nameables::extract(&r.situation, m, existing),
        }
    }

    fn apply_nameable_keys(&mut self, m: &Replacements) {
        match self {
            Feature::AttributeBonus(_) | Feature::DrBonus(_) => {}
            Feature::SkillBonus(s) => {
                s.specialization.apply_nameable_keys(m);
                if s.selection_type != SkillSelectionType::ThisWeapon {
                    s.name.apply_nameable_keys(m);
                    s.tags.apply_nameable_keys(m);
                }
            }
            Feature::SpellBonus(s) => {
                s.name.apply_nameable_keys(m);
                s.tags.apply_nameable_keys(m);
            }
            Feature::WeaponBonus(w) | Feature::WeaponDrDivisorBonus(w) => {
                w.specialization.apply_nameable_keys(m);
                if w.selection_type != WeaponSelectionType::ThisWeapon {
                    w.name.apply_nameable_keys(m);
                    w.tags.apply_nameable_keys(m);
                }
            }
            Feature::ReactionBonus(r) => r.situation = nameables::apply(&r.situation, m),
        }
    }
}

impl ContentHash for Feature {
    fn hash_source(&self, h: &mut Sha256) {
        self.type_key().hash_source(h);
        match self {
            Feature::AttributeBonus(a) => {
                a.attribute.hash_source(h);
                a.limitation.key().hash_source(h);
            }
            Feature::SkillBonus(s) => {
                s.selection_type.key().hash_source(h);
                s.name.hash_source(h);
                s.specialization.hash_source(h);
                s.tags.hash_source(h);
            }
            Feature::SpellBonus(s) => {
                s.match_type.key().hash_source(h);
                s.name.hash_source(h);
                s.tags.hash_source(h);
            }
            Feature::WeaponBonus(w) | Feature::WeaponDrDivisorBonus(w) => {
                w.percent.hash_source(h);
                w.selection_type.key().hash_source(h);
                w.name.hash_source(h);
                w.specialization.hash_source(h);
                w.level.hash_source(h);
                w.tags.hash_source(h);
            }
            Feature::DrBonus(d) => {
                d.location.hash_source(h);
                d.specialization.hash_source(h);
            }
            Feature::ReactionBonus(r) => r.situation.hash_source(h),
        }
        self.leveled_amount().hash_source(h);
    }
}
