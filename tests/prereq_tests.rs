//! Tests for prerequisite evaluation against a recalculated entity.

use rulecore::criteria::{NumericCompare, NumericCriteria, StringCompare, StringCriteria};
use rulecore::entity::{Difficulty, DifficultyLevel, Entity, Equipment, Skill, Spell, Trait, PREREQ_PREFIX};
use rulecore::prereq::{
    EquippedEquipmentPrereq, SkillPrereq, SpellComparisonType, SpellPrereq, TraitPrereq,
};
use rulecore::*;

fn mage() -> Entity {
    let mut entity = Entity::default();
    entity.set_attribute("iq", "Intelligence", Fxp::from_int(14));
    entity.add_trait(Trait::new("Magery"));
    for (name, college) in [("Fireball", "Fire"), ("Create Fire", "Fire"), ("Light", "Light")] {
        let mut spell = Spell::new(name, Difficulty::new("iq", DifficultyLevel::Hard));
        spell.college.push(college.into());
        spell.points = Fxp::ONE;
        entity.add_spell(spell);
    }
    entity
}

fn count(compare: NumericCompare, n: i64) -> NumericCriteria {
    NumericCriteria::new(compare, Fxp::from_int(n))
}

#[test]
fn test_truth_table_over_documents() {
    let entity = mage();
    for has in [true, false] {
        for (name, exists) in [("Magery", true), ("Luck", false)] {
            let json = format!(
                r#"{{"prereqs":[{{"type":"trait_prereq","has":{},"name":{{"compare":"is","qualifier":"{}"}}}}]}}"#,
                has, name
            );
            let list = PrereqList::from_json(&json).unwrap();
            let mut tooltip = String::new();
            let satisfied = list.satisfied(&entity, None, Some(&mut tooltip), PREREQ_PREFIX);
            assert_eq!(satisfied, exists == has, "has={} name={}", has, name);
            assert_eq!(tooltip.is_empty(), satisfied);
        }
    }
}

#[test]
fn test_spell_counts() {
    let entity = mage();
    let colleges = Prereq::Spell(SpellPrereq {
        has: true,
        sub_type: SpellComparisonType::CollegeCount,
        qualifier: StringCriteria::any(),
        quantity: count(NumericCompare::AtLeast, 2),
    });
    assert!(colleges.satisfied(&entity, None, None, ""));

    let fire = Prereq::Spell(SpellPrereq {
        has: true,
        sub_type: SpellComparisonType::College,
        qualifier: StringCriteria::is("fire"),
        quantity: count(NumericCompare::AtLeast, 3),
    });
    let mut tooltip = String::new();
    assert!(!fire.satisfied(&entity, None, Some(&mut tooltip), "\n"));
    assert_eq!(
        tooltip,
        "\nhas spells whose college is \"fire\" and whose count at least 3"
    );
}

#[test]
fn test_spell_does_not_count_itself() {
    let mut entity = mage();
    let mut spell = Spell::new("Flame Jet", Difficulty::new("iq", DifficultyLevel::Hard));
    spell.college.push("Fire".into());
    let mut list = PrereqList::new(true);
    list.prereqs.push(Prereq::Spell(SpellPrereq {
        has: true,
        sub_type: SpellComparisonType::College,
        qualifier: StringCriteria::is("Fire"),
        quantity: count(NumericCompare::AtLeast, 3),
    }));
    spell.prereqs = Some(list);
    let id = entity.add_spell(spell);

    entity.recalculate();
    let reason = entity.spell(id).unwrap().unsatisfied_reason.clone().unwrap();
    assert!(reason.starts_with(PREREQ_PREFIX));
    assert!(reason.contains("Requires all of:"));
}

#[test]
fn test_recalculate_records_unsatisfied_reasons() {
    let mut entity = mage();
    let mut sk = Skill::new("Thaumatology", Difficulty::new("iq", DifficultyLevel::VeryHard));
    sk.points = Fxp::from_int(2);
    let mut list = PrereqList::new(false);
    list.prereqs.push(Prereq::Trait(TraitPrereq::new("Magery")));
    list.prereqs.push(Prereq::Skill(SkillPrereq::new("Occultism")));
    sk.prereqs = Some(list);
    let thaum = entity.add_skill(sk);

    let mut sk = Skill::new("Alchemy", Difficulty::new("iq", DifficultyLevel::VeryHard));
    let mut list = PrereqList::new(true);
    list.prereqs.push(Prereq::Skill(SkillPrereq {
        level: count(NumericCompare::AtLeast, 14),
        ..SkillPrereq::new("Thaumatology")
    }));
    sk.prereqs = Some(list);
    let alchemy = entity.add_skill(sk);

    entity.recalculate();
    assert!(entity.skill(thaum).unwrap().unsatisfied_reason.is_none());
    // Thaumatology is 14 - 3 + 1 = 12
    let reason = entity.skill(alchemy).unwrap().unsatisfied_reason.clone().unwrap();
    assert!(reason.contains("has a skill whose name is \"Thaumatology\", and level at least 14"));
}

#[test]
fn test_equipped_equipment() {
    let mut entity = mage();
    let mut staff = Equipment::new("Wizard's Staff", Weight::from_pounds(Fxp::from_int(4)));
    staff.tags.push("Focus".into());
    staff.equipped = false;
    entity.add_equipment(staff);

    let prereq = Prereq::EquippedEquipment(EquippedEquipmentPrereq {
        name: StringCriteria::new(StringCompare::Contains, "staff"),
        tags: StringCriteria::is("focus"),
    });
    let mut tooltip = String::new();
    assert!(!prereq.satisfied(&entity, None, Some(&mut tooltip), "\n"));
    assert_eq!(
        tooltip,
        "\nRequires equipment whose name contains \"staff\", and tags is \"focus\" to be equipped"
    );

    entity.equipment[0].equipped = true;
    assert!(prereq.satisfied(&entity, None, None, ""));
}

#[test]
fn test_nested_lists_indent_further() {
    let entity = Entity::default();
    let mut inner = PrereqList::new(false);
    inner.prereqs.push(Prereq::Trait(TraitPrereq::new("Luck")));
    let mut outer = PrereqList::new(true);
    outer.prereqs.push(Prereq::List(inner));

    let mut tooltip = String::new();
    assert!(!outer.satisfied(&entity, None, Some(&mut tooltip), "\n"));
    assert_eq!(
        tooltip,
        "\nRequires all of:\n  Requires at least one of:\n    has a trait whose name is \"Luck\""
    );
}

#[test]
fn test_unknown_prereq_type_is_recoverable() {
    let err = PrereqList::from_json(r#"{"prereqs":[{"type":"psionic_prereq"}]}"#).unwrap_err();
    assert!(matches!(err, RuleError::Document(_)));
}
