//! Tests for nameable extraction and substitution across whole items.

use rulecore::criteria::StringCriteria;
use rulecore::entity::{Difficulty, DifficultyLevel, Skill, Trait};
use rulecore::feature::{Feature, SkillBonus};
use rulecore::nameables::{self, apply, extract, Nameables, Replacements};
use rulecore::prereq::SkillPrereq;
use rulecore::skill_default::SkillDefault;
use rulecore::*;

fn map(pairs: &[(&str, &str)]) -> Replacements {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_documented_examples() {
    let mut m = Replacements::new();
    extract("@ST@ is strong", &mut m, &Replacements::new());
    assert_eq!(m, map(&[("ST", "ST")]));
    assert_eq!(apply("@ST@ is strong", &map(&[("ST", "14")])), "14 is strong");

    let mut none = Replacements::new();
    extract("no tokens here", &mut none, &Replacements::new());
    assert!(none.is_empty());
}

#[test]
fn test_item_tree_keys() {
    let mut sk = Skill::new("@Weapon@ Art", Difficulty::new("dx", DifficultyLevel::Hard));
    sk.specialization = "@Style@".into();
    sk.defaults.push(SkillDefault::skill("@Weapon@", Fxp::from_int(-3)));
    sk.features.push(Feature::SkillBonus(SkillBonus::new("@Bonus Skill@")));
    let mut list = PrereqList::new(true);
    list.prereqs.push(Prereq::Skill(SkillPrereq::new("@Prereq Skill@")));
    sk.prereqs = Some(list);

    let keys = nameables::collect(&sk, &map(&[("Weapon", "Rapier")]));
    assert_eq!(
        keys,
        map(&[
            ("Bonus Skill", "Bonus Skill"),
            ("Prereq Skill", "Prereq Skill"),
            ("Style", "Style"),
            ("Weapon", "Rapier"),
        ])
    );
}

#[test]
fn test_apply_across_item_tree() {
    let mut t = Trait::new("Weapon Bond (@Weapon@)");
    t.notes = "Bonded to a @Weapon@".into();
    t.features.push(Feature::SkillBonus(SkillBonus::new("@Weapon@")));

    t.apply_nameable_keys(&map(&[("Weapon", "Katana")]));
    assert_eq!(t.name, "Weapon Bond (Katana)");
    assert_eq!(t.notes, "Bonded to a Katana");
    match &t.features[0] {
        Feature::SkillBonus(s) => assert_eq!(s.name, StringCriteria::is("Katana")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_marker_boundaries() {
    let m = map(&[("A", "x")]);
    assert_eq!(apply("@A@ and @C@", &m), "x and @C@");
    assert_eq!(apply("mail@A", &m), "mail@A");

    let mut keys = Replacements::new();
    extract("a@b", &mut keys, &Replacements::new());
    assert!(keys.is_empty());
    // odd trailing marker is not a key
    extract("@A@ and @B", &mut keys, &Replacements::new());
    assert_eq!(keys, map(&[("A", "A")]));
}

#[test]
fn test_marker_inside_value_is_not_escaped() {
    // keys are applied in order, so a later key sees an earlier value
    let m = map(&[("A", "@B@"), ("B", "x")]);
    assert_eq!(apply("@A@", &m), "x");
    let m = map(&[("A", "x"), ("B", "@A@")]);
    assert_eq!(apply("@B@", &m), "@A@");
}
