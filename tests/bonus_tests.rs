//! Tests for the feature and bonus system.
//!
//! These tests verify:
//! - Map key determinism and wildcard fallback
//! - Gathering from active items only
//! - Replacements applied before keys are computed
//! - Weapon bonus queries and tooltips

use rulecore::bonus::{WeaponBonusKind, WeaponQuery};
use rulecore::criteria::{NumericCompare, NumericCriteria, StringCompare, StringCriteria};
use rulecore::entity::{Difficulty, DifficultyLevel, Equipment, Skill, Spell, Trait};
use rulecore::feature::{
    AttributeBonus, DrBonus, SkillBonus, SkillSelectionType, SpellBonus, SpellMatchType,
    WeaponBonus, WeaponSelectionType, THIS_WEAPON_ID,
};
use rulecore::*;

fn sword_bonus() -> WeaponBonus {
    WeaponBonus {
        selection_type: WeaponSelectionType::WithRequiredSkill,
        ..WeaponBonus::new("Broadsword")
    }
}

fn flat(n: i64) -> LeveledAmount {
    LeveledAmount::flat(Fxp::from_int(n))
}

// ============================================================================
// Map keys
// ============================================================================

#[test]
fn test_weapon_key_determinism() {
    let a = Feature::WeaponBonus(sword_bonus());
    let b = Feature::WeaponBonus(sword_bonus());
    assert_eq!(a.feature_map_key(), b.feature_map_key());
    assert_eq!(a.feature_map_key(), "skill.name/broadsword");

    let mut specialized = sword_bonus();
    specialized.specialization = StringCriteria::new(StringCompare::StartsWith, "Two");
    assert_eq!(Feature::WeaponBonus(specialized).feature_map_key(), "skill.name*");
}

#[test]
fn test_feature_documents_keep_field_names() {
    let json = r#"{
        "type": "weapon_bonus",
        "selection_type": "weapons_with_required_skill",
        "name": {"compare": "is", "qualifier": "Broadsword"},
        "level": {"compare": "at_least", "qualifier": 2},
        "category": {"compare": "contains", "qualifier": "Melee"},
        "amount": 1,
        "per_level": true
    }"#;
    let feature = Feature::from_json(json).unwrap();
    let value = serde_json::to_value(&feature).unwrap();
    assert_eq!(value["tags"]["qualifier"], "Melee");
    assert!(value.get("category").is_none());
    assert!(value.get("percent").is_none());
    assert_eq!(value["per_level"], true);
    assert_eq!(Feature::from_json(&value.to_string()).unwrap(), feature);
}

// ============================================================================
// Gathering
// ============================================================================

#[test]
fn test_gather_skips_inactive_items() {
    let mut entity = Entity::default();
    entity.set_attribute("st", "Strength", Fxp::from_int(10));

    let mut strong = Trait::new("Lifting ST");
    strong.features.push(Feature::AttributeBonus(AttributeBonus {
        amount: flat(3),
        ..AttributeBonus::new("st")
    }));
    entity.add_trait(strong.clone());
    strong.disabled = true;
    entity.add_trait(strong);

    let mut belt = Equipment::new("Power Belt", Weight::from_pounds(Fxp::ONE));
    let mut gem = Equipment::new("Gem", Weight::ZERO);
    gem.features.push(Feature::AttributeBonus(AttributeBonus {
        amount: flat(5),
        ..AttributeBonus::new("ST")
    }));
    belt.children.push(gem);
    belt.equipped = false;
    entity.add_equipment(belt);

    entity.recalculate();
    assert_eq!(entity.resolve_attribute_current("st"), Fxp::from_int(13));

    entity.equipment[0].equipped = true;
    entity.recalculate();
    assert_eq!(entity.resolve_attribute_current("st"), Fxp::from_int(18));
}

#[test]
fn test_leveled_trait_bonus() {
    let mut entity = Entity::default();
    entity.set_attribute("dx", "Dexterity", Fxp::from_int(10));
    let mut t = Trait::new("Enhanced Dexterity");
    t.levels = Some(Fxp::from_int(3));
    t.features.push(Feature::AttributeBonus(AttributeBonus {
        amount: LeveledAmount::per_level(Fxp::ONE),
        ..AttributeBonus::new("dx")
    }));
    entity.add_trait(t);
    entity.recalculate();
    assert_eq!(entity.resolve_attribute_current("dx"), Fxp::from_int(13));
}

#[test]
fn test_replacements_applied_before_keys() {
    let mut entity = Entity::default();
    let mut t = Trait::new("Weapon Bond (@Weapon@)");
    t.features.push(Feature::SkillBonus(SkillBonus::new("@Weapon@")));
    t.replacements.insert("Weapon".into(), "Rapier".into());
    entity.add_trait(t);
    entity.recalculate();

    let keys: Vec<&str> = entity.bonuses().keys().collect();
    assert_eq!(keys, vec!["skill.name/rapier"]);
    // the item itself keeps its tokens
    assert_eq!(entity.traits[0].name, "Weapon Bond (@Weapon@)");
}

#[test]
fn test_skill_bonus_tooltip_names_owner() {
    let mut entity = Entity::default();
    let mut t = Trait::new("Talent");
    t.features.push(Feature::SkillBonus(SkillBonus {
        amount: flat(2),
        ..SkillBonus::new("Stealth")
    }));
    entity.add_trait(t);
    entity.recalculate();

    let mut tooltip = String::new();
    let total = entity
        .bonuses()
        .skill_bonus_for(&entity, "Stealth", "", &[], Some(&mut tooltip));
    assert_eq!(total, Fxp::from_int(2));
    assert_eq!(tooltip, "\nTalent [+2]");
    assert_eq!(entity.bonuses().skill_bonus_for(&entity, "Climbing", "", &[], None), Fxp::ZERO);
}

#[test]
fn test_exact_keys_ignore_case() {
    let mut entity = Entity::default();
    entity.set_attribute("dx", "Dexterity", Fxp::from_int(12));
    let mut t = Trait::new("Sneaky");
    t.features.push(Feature::SkillBonus(SkillBonus::new("stealth")));
    entity.add_trait(t);
    let mut stealth = Skill::new("Stealth", Difficulty::new("dx", DifficultyLevel::Average));
    stealth.points = Fxp::from_int(2);
    let stealth = entity.add_skill(stealth);

    let mut helm = Equipment::new("Helm", Weight::from_pounds(Fxp::FIVE));
    helm.features.push(Feature::DrBonus(DrBonus {
        location: "Skull".into(),
        specialization: String::new(),
        amount: flat(2),
    }));
    entity.add_equipment(helm);
    entity.recalculate();

    assert_eq!(entity.skill(stealth).unwrap().level.level, Fxp::from_int(13));
    assert_eq!(entity.bonuses().dr_bonus_for(&entity, "skull", None), Fxp::TWO);
}

// ============================================================================
// Spells
// ============================================================================

fn spell_bonus(match_type: SpellMatchType, name: &str, amount: i64) -> Feature {
    Feature::SpellBonus(SpellBonus {
        match_type,
        name: StringCriteria::is(name),
        amount: flat(amount),
        ..SpellBonus::new()
    })
}

#[test]
fn test_spell_level_collects_spell_bonuses() {
    let mut entity = Entity::default();
    entity.set_attribute("iq", "Intelligence", Fxp::from_int(12));

    let mut magery = Trait::new("Magery");
    magery.features.push(spell_bonus(SpellMatchType::AllColleges, "", 1));
    magery.features.push(spell_bonus(SpellMatchType::CollegeName, "fire", 2));
    magery.features.push(spell_bonus(SpellMatchType::CollegeName, "water", 5));
    magery.features.push(spell_bonus(SpellMatchType::PowerSourceName, "arcane", 1));
    let mut missiles = SpellBonus {
        tags: StringCriteria::is("Missile"),
        ..SpellBonus::new()
    };
    missiles.amount = flat(3);
    magery.features.push(Feature::SpellBonus(missiles));
    let mut areas = SpellBonus {
        tags: StringCriteria::is("Area"),
        ..SpellBonus::new()
    };
    areas.amount = flat(4);
    magery.features.push(Feature::SpellBonus(areas));
    entity.add_trait(magery);

    let mut fireball = Spell::new("Fireball", Difficulty::new("iq", DifficultyLevel::Hard));
    fireball.college.push("Fire".into());
    fireball.power_source = "Arcane".into();
    fireball.tags.push("Missile".into());
    fireball.points = Fxp::ONE;
    let fireball = entity.add_spell(fireball);
    entity.recalculate();

    assert_eq!(entity.bonuses().get("spell.name*").len(), 2);
    // IQ 12, Hard, 1 point: 10, then +1 +2 +1 +3
    let level = &entity.spell(fireball).unwrap().level;
    assert_eq!(level.level, Fxp::from_int(17));
    assert!(level.tooltip.contains("Magery"));
}

// ============================================================================
// Weapons and DR
// ============================================================================

#[test]
fn test_weapon_skill_bonus_queries() {
    let mut entity = Entity::default();
    let mut master = Trait::new("Weapon Master");
    master.features.push(Feature::SkillBonus(SkillBonus {
        selection_type: SkillSelectionType::WeaponsWithName,
        ..SkillBonus::new("broadsword")
    }));
    entity.add_trait(master);

    let mut sword = Equipment::new("Broadsword", Weight::from_pounds(Fxp::THREE));
    sword.features.push(Feature::SkillBonus(SkillBonus {
        selection_type: SkillSelectionType::ThisWeapon,
        specialization: StringCriteria::is("Swung"),
        amount: flat(2),
        ..SkillBonus::new("")
    }));
    let sword = entity.add_equipment(sword);
    let other = entity.add_equipment(Equipment::new("Broadsword", Weight::from_pounds(Fxp::THREE)));
    entity.recalculate();

    let query = WeaponQuery {
        owner: sword,
        name: "Broadsword",
        usage: "Swung",
        tags: &[],
        skill_name: "Broadsword",
        skill_specialization: "",
        relative_level: Fxp::ZERO,
    };
    let mut tooltip = String::new();
    let total = entity
        .bonuses()
        .weapon_skill_bonus_for(&entity, &query, Some(&mut tooltip));
    assert_eq!(total, Fxp::THREE);
    assert!(tooltip.contains("Weapon Master"));

    let thrust = WeaponQuery {
        usage: "Thrust",
        ..query
    };
    assert_eq!(entity.bonuses().weapon_skill_bonus_for(&entity, &thrust, None), Fxp::ONE);
    let spare = WeaponQuery {
        owner: other,
        ..query
    };
    assert_eq!(entity.bonuses().weapon_skill_bonus_for(&entity, &spare, None), Fxp::ONE);
    let dagger = WeaponQuery {
        name: "Dagger",
        ..thrust
    };
    assert_eq!(entity.bonuses().weapon_skill_bonus_for(&entity, &dagger, None), Fxp::ZERO);
}

#[test]
fn test_weapon_bonus_queries() {
    let mut entity = Entity::default();
    let mut t = Trait::new("Weapon Master");
    let mut by_level = sword_bonus();
    by_level.level = NumericCriteria::new(NumericCompare::AtLeast, Fxp::from_int(2));
    t.features.push(Feature::WeaponBonus(by_level));
    t.features.push(Feature::WeaponDrDivisorBonus(sword_bonus()));
    entity.add_trait(t);

    let mut sword = Equipment::new("Broadsword", Weight::from_pounds(Fxp::THREE));
    sword.features.push(Feature::WeaponBonus(WeaponBonus {
        selection_type: WeaponSelectionType::ThisWeapon,
        amount: flat(2),
        ..WeaponBonus::new("")
    }));
    let sword = entity.add_equipment(sword);
    entity.recalculate();
    assert_eq!(entity.bonuses().get(THIS_WEAPON_ID).len(), 1);

    let tags = vec!["Melee".to_string()];
    let query = WeaponQuery {
        owner: sword,
        name: "Broadsword",
        usage: "Swung",
        tags: &tags,
        skill_name: "Broadsword",
        skill_specialization: "",
        relative_level: Fxp::from_int(2),
    };
    let damage = entity.bonuses().weapon_bonuses_for(WeaponBonusKind::Damage, &query);
    assert_eq!(damage.len(), 2);
    let total: Fxp = damage.iter().map(|b| b.adjusted_amount()).sum();
    assert_eq!(total, Fxp::THREE);

    let divisor = entity.bonuses().weapon_bonuses_for(WeaponBonusKind::DrDivisor, &query);
    assert_eq!(divisor.len(), 1);

    let unskilled = WeaponQuery {
        relative_level: Fxp::ONE,
        ..query
    };
    assert_eq!(
        entity.bonuses().weapon_bonuses_for(WeaponBonusKind::Damage, &unskilled).len(),
        1
    );
}

#[test]
fn test_dr_bonus_by_location() {
    let mut entity = Entity::default();
    let mut helm = Equipment::new("Helm", Weight::from_pounds(Fxp::FIVE));
    helm.features.push(Feature::DrBonus(DrBonus {
        location: "skull".into(),
        specialization: String::new(),
        amount: flat(4),
    }));
    entity.add_equipment(helm);
    entity.recalculate();

    assert_eq!(entity.bonuses().dr_bonus_for(&entity, "skull", None), Fxp::from_int(4));
    assert_eq!(entity.bonuses().dr_bonus_for(&entity, "torso", None), Fxp::ZERO);
}
