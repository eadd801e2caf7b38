//! Bonuses and the bonus map.
//!
//! A [`Bonus`] is a [`Feature`] once it has been attached to the item that
//! grants it. Bonuses are rebuilt on every recompute pass and filed in a
//! [`BonusMap`] under their feature's map key, so each query only looks at
//! the exact-key bucket for its target plus the matching wildcard buckets.
//!
//! A bonus refers to its owner by [`ItemId`] only. The owner's display name
//! is looked up through the entity when a tooltip is built.

use crate::entity::{Entity, ItemId};
use crate::feature::{
    exact_key, AttributeLimitation, Feature, SkillSelectionType, WeaponBonus, WeaponSelectionType,
    ATTRIBUTE_ID_PREFIX, HIT_LOCATION_ID_PREFIX, REACTION_ID, SKILL_NAME_ID, SPELL_COLLEGE_ID,
    SPELL_NAME_ID, SPELL_POWER_SOURCE_ID, THIS_WEAPON_ID, WEAPON_NAMED_ID_PREFIX,
};
use crate::fxp::Fxp;
use crate::nameables::{Nameables, Replacements};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// A feature attached to the item that grants it.
#[derive(Debug, Clone, PartialEq)]
pub struct Bonus {
    owner: ItemId,
    feature: Feature,
}

impl Bonus {
    /// Attach `feature` to `owner` at the owner's effective `level`.
    pub fn new(owner: ItemId, mut feature: Feature, level: Fxp) -> Self {
        feature.leveled_amount_mut().level = level;
        Self { owner, feature }
    }

    /// The granting item.
    pub fn owner(&self) -> ItemId {
        self.owner
    }

    /// The granted feature.
    pub fn feature(&self) -> &Feature {
        &self.feature
    }

    /// The effective level used for per-level scaling.
    pub fn level(&self) -> Fxp {
        self.feature.leveled_amount().level
    }

    /// Change the effective level.
    pub fn set_level(&mut self, level: Fxp) {
        self.feature.leveled_amount_mut().level = level;
    }

    /// The amount after level scaling.
    pub fn adjusted_amount(&self) -> Fxp {
        self.feature.leveled_amount().adjusted_amount()
    }

    /// Append this bonus's tooltip line, naming the owner as `entity` knows it.
    pub fn add_to_tooltip(&self, entity: &Entity, buffer: Option<&mut String>) {
        let Some(buffer) = buffer else {
            return;
        };
        let name = entity.item_name(self.owner).unwrap_or_default();
        self.feature.add_to_tooltip(&name, Some(buffer));
    }
}

/// Which weapon statistic a weapon bonus query is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponBonusKind {
    Damage,
    DrDivisor,
}

impl WeaponBonusKind {
    fn select(self, feature: &Feature) -> Option<&WeaponBonus> {
        match (self, feature) {
            (WeaponBonusKind::Damage, Feature::WeaponBonus(w)) => Some(w),
            (WeaponBonusKind::DrDivisor, Feature::WeaponDrDivisorBonus(w)) => Some(w),
            _ => None,
        }
    }
}

/// The weapon a weapon bonus query is about.
#[derive(Debug, Clone, Copy)]
pub struct WeaponQuery<'a> {
    /// The item the weapon belongs to.
    pub owner: ItemId,
    pub name: &'a str,
    pub usage: &'a str,
    pub tags: &'a [String],
    /// Name of the skill used with the weapon.
    pub skill_name: &'a str,
    pub skill_specialization: &'a str,
    /// Level of that skill relative to its attribute.
    pub relative_level: Fxp,
}

/// Bonuses grouped by feature map key.
///
/// # Examples
///
/// ```rust
/// use rulecore::bonus::{Bonus, BonusMap};
/// use rulecore::entity::{Entity, ItemId};
/// use rulecore::feature::{AttributeBonus, AttributeLimitation, Feature};
/// use rulecore::Fxp;
///
/// let mut map = BonusMap::new();
/// map.insert(Bonus::new(ItemId::new(1), Feature::AttributeBonus(AttributeBonus::new("st")), Fxp::ZERO));
///
/// let entity = Entity::default();
/// assert_eq!(map.attribute_bonus_for(&entity, "st", AttributeLimitation::None, None), Fxp::ONE);
/// assert_eq!(map.attribute_bonus_for(&entity, "dx", AttributeLimitation::None, None), Fxp::ZERO);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BonusMap {
    by_key: BTreeMap<String, Vec<Bonus>>,
}

impl BonusMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gather the bonuses of every active item in `entity`.
    ///
    /// Disabled traits and unequipped equipment (with everything inside it)
    /// contribute nothing. Each item's replacements are applied to a copy of
    /// its features before the map key is computed.
    pub fn gather(entity: &Entity) -> Self {
        let mut map = Self::new();
        for t in entity.traits.iter().filter(|t| !t.disabled) {
            map.add_features(t.id, &t.features, t.current_level(), &t.replacements);
        }
        for sk in &entity.skills {
            map.add_features(sk.id, &sk.features, Fxp::ZERO, &sk.replacements);
        }
        let mut pending: Vec<_> = entity.equipment.iter().collect();
        while let Some(eqp) = pending.pop() {
            if !eqp.equipped {
                continue;
            }
            map.add_features(eqp.id, &eqp.features, Fxp::ZERO, &eqp.replacements);
            pending.extend(eqp.children.iter());
        }
        map
    }

    fn add_features(
        &mut self,
        owner: ItemId,
        features: &[Feature],
        level: Fxp,
        replacements: &Replacements,
    ) {
        for feature in features {
            let mut feature = feature.clone();
            feature.apply_nameable_keys(replacements);
            self.insert(Bonus::new(owner, feature, level));
        }
    }

    /// File a bonus under its feature's map key.
    pub fn insert(&mut self, bonus: Bonus) {
        let key = bonus.feature.feature_map_key();
        trace!(key = %key.escape_debug(), owner = %bonus.owner, "adding bonus");
        self.by_key.entry(key).or_default().push(bonus);
    }

    /// The bonuses filed under exactly `key`.
    pub fn get(&self, key: &str) -> &[Bonus] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every key with at least one bonus.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.by_key.keys().map(String::as_str)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Whether the map holds no bonuses.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    fn buckets<'a, 'k>(&'a self, keys: &'k [String]) -> impl Iterator<Item = &'a Bonus> + 'k
    where
        'a: 'k,
    {
        keys.iter().flat_map(move |key| self.get(key).iter())
    }

    fn total<'a>(
        entity: &Entity,
        bonuses: impl Iterator<Item = &'a Bonus>,
        mut tooltip: Option<&mut String>,
    ) -> Fxp {
        let mut total = Fxp::ZERO;
        for bonus in bonuses {
            total += bonus.adjusted_amount();
            bonus.add_to_tooltip(entity, tooltip.as_mut().map(|b| &mut **b));
        }
        total
    }

    /// Total bonus to an attribute, for one limitation.
    pub fn attribute_bonus_for(
        &self,
        entity: &Entity,
        attribute: &str,
        limitation: AttributeLimitation,
        tooltip: Option<&mut String>,
    ) -> Fxp {
        let attribute = attribute.trim().to_lowercase();
        let key = match limitation {
            AttributeLimitation::None => format!("{}{}", ATTRIBUTE_ID_PREFIX, attribute),
            other => format!("{}{}.{}", ATTRIBUTE_ID_PREFIX, attribute, other),
        };
        let matching = self
            .get(&key)
            .iter()
            .filter(|b| matches!(b.feature, Feature::AttributeBonus(_)));
        Self::total(entity, matching, tooltip)
    }

    /// Total bonus to a skill.
    pub fn skill_bonus_for(
        &self,
        entity: &Entity,
        name: &str,
        specialization: &str,
        tags: &[String],
        tooltip: Option<&mut String>,
    ) -> Fxp {
        let keys = [
            exact_key(SKILL_NAME_ID, name),
            format!("{}*", SKILL_NAME_ID),
        ];
        let matching = self.buckets(&keys).filter(|b| match &b.feature {
            Feature::SkillBonus(s) => {
                s.selection_type == SkillSelectionType::SkillsWithName
                    && s.matches_skill(name, specialization, tags)
            }
            _ => false,
        });
        Self::total(entity, matching, tooltip)
    }

    /// Total bonus to a spell.
    pub fn spell_bonus_for(
        &self,
        entity: &Entity,
        name: &str,
        colleges: &[String],
        power_source: &str,
        tags: &[String],
        tooltip: Option<&mut String>,
    ) -> Fxp {
        let mut keys = BTreeSet::new();
        keys.insert(SPELL_COLLEGE_ID.to_string());
        keys.insert(format!("{}*", SPELL_COLLEGE_ID));
        for college in colleges {
            keys.insert(exact_key(SPELL_COLLEGE_ID, college));
        }
        keys.insert(exact_key(SPELL_POWER_SOURCE_ID, power_source));
        keys.insert(format!("{}*", SPELL_POWER_SOURCE_ID));
        keys.insert(exact_key(SPELL_NAME_ID, name));
        keys.insert(format!("{}*", SPELL_NAME_ID));
        let keys: Vec<String> = keys.into_iter().collect();

        let matching = self.buckets(&keys).filter(|b| match &b.feature {
            Feature::SpellBonus(s) => s.matches_spell(name, colleges, power_source, tags),
            _ => false,
        });
        Self::total(entity, matching, tooltip)
    }

    /// Weapon bonuses of the given kind that apply to a weapon.
    ///
    /// Callers sum these themselves because flat and percentage bonuses
    /// combine differently.
    pub fn weapon_bonuses_for(&self, kind: WeaponBonusKind, query: &WeaponQuery<'_>) -> Vec<&Bonus> {
        let mut result = Vec::new();
        for bonus in self.get(THIS_WEAPON_ID) {
            if let Some(w) = kind.select(&bonus.feature) {
                if w.selection_type == WeaponSelectionType::ThisWeapon
                    && bonus.owner == query.owner
                    && w.specialization.matches(query.usage)
                {
                    result.push(bonus);
                }
            }
        }
        let by_skill = [
            exact_key(SKILL_NAME_ID, query.skill_name),
            format!("{}*", SKILL_NAME_ID),
        ];
        for bonus in self.buckets(&by_skill) {
            if let Some(w) = kind.select(&bonus.feature) {
                if w.selection_type == WeaponSelectionType::WithRequiredSkill
                    && w.matches_weapon_skill(
                        query.skill_name,
                        query.skill_specialization,
                        query.relative_level,
                        query.tags,
                    )
                {
                    result.push(bonus);
                }
            }
        }
        let by_name = [
            exact_key(WEAPON_NAMED_ID_PREFIX, query.name),
            format!("{}*", WEAPON_NAMED_ID_PREFIX),
        ];
        for bonus in self.buckets(&by_name) {
            if let Some(w) = kind.select(&bonus.feature) {
                if w.selection_type == WeaponSelectionType::WithName
                    && w.matches_weapon_name(query.name, query.usage, query.tags)
                {
                    result.push(bonus);
                }
            }
        }
        result
    }

    /// Total skill bonus to a weapon's skill level, from skill bonuses that
    /// select weapons by name or apply to the weapon carrying them.
    pub fn weapon_skill_bonus_for(
        &self,
        entity: &Entity,
        query: &WeaponQuery<'_>,
        tooltip: Option<&mut String>,
    ) -> Fxp {
        let this_weapon = self.get(THIS_WEAPON_ID).iter().filter(|b| match &b.feature {
            Feature::SkillBonus(s) => {
                s.selection_type == SkillSelectionType::ThisWeapon
                    && b.owner == query.owner
                    && s.specialization.matches(query.usage)
            }
            _ => false,
        });
        let by_name = [
            exact_key(WEAPON_NAMED_ID_PREFIX, query.name),
            format!("{}*", WEAPON_NAMED_ID_PREFIX),
        ];
        let named = self.buckets(&by_name).filter(|b| match &b.feature {
            Feature::SkillBonus(s) => {
                s.selection_type == SkillSelectionType::WeaponsWithName
                    && s.matches_skill(query.name, query.usage, query.tags)
            }
            _ => false,
        });
        Self::total(entity, this_weapon.chain(named), tooltip)
    }

    /// Total DR bonus at a hit location.
    pub fn dr_bonus_for(&self, entity: &Entity, location: &str, tooltip: Option<&mut String>) -> Fxp {
        let key = format!("{}{}", HIT_LOCATION_ID_PREFIX, location.trim().to_lowercase());
        let matching = self
            .get(&key)
            .iter()
            .filter(|b| matches!(b.feature, Feature::DrBonus(_)));
        Self::total(entity, matching, tooltip)
    }

    /// Reaction modifiers, totalled per situation.
    pub fn reaction_bonuses(&self) -> BTreeMap<String, Fxp> {
        let mut result = BTreeMap::new();
        for bonus in self.get(REACTION_ID) {
            if let Feature::ReactionBonus(r) = &bonus.feature {
                *result.entry(r.situation.clone()).or_insert(Fxp::ZERO) += bonus.adjusted_amount();
            }
        }
        result
    }
}
