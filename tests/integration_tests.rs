use rulecore::default_graph::DefaultGraph;
use rulecore::entity::{Skill, Trait};
use rulecore::library::{Library, SourceMatcher, SourceRef, SourceStatus, Template};
use rulecore::nameables::Replacements;
use rulecore::*;

const LIBRARY: &str = r#"{
    "name": "Basic Set",
    "traits": {
        "talent": {
            "name": "@Field@ Talent",
            "levels": 2,
            "features": [{
                "type": "skill_bonus",
                "selection_type": "skills_with_name",
                "name": {"compare": "is", "qualifier": "@Field@"},
                "amount": 1,
                "per_level": true
            }]
        },
        "ninja": {
            "name": "Ninja Training",
            "prereqs": {
                "all": true,
                "prereqs": [{
                    "type": "skill_prereq",
                    "has": true,
                    "name": {"compare": "is", "qualifier": "Stealth"},
                    "level": {"compare": "at_least", "qualifier": 15}
                }]
            }
        }
    },
    "skills": {
        "stealth": {
            "name": "Stealth",
            "difficulty": "dx/a",
            "defaults": [{"type": "dx", "modifier": -5}]
        },
        "shadowing": {
            "name": "Shadowing",
            "difficulty": "iq/a",
            "defaults": [
                {"type": "iq", "modifier": -4},
                {"type": "skill", "name": "Stealth", "modifier": -4}
            ]
        }
    }
}"#;

fn chosen(pairs: &[(&str, &str)]) -> Replacements {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn build(library: &Library) -> Entity {
    let settings = SheetSettings::from_json(r#"{"use_rule_of_20": true}"#).unwrap();
    let mut entity = Entity::new(settings);
    entity.set_attribute("dx", "Dexterity", Fxp::from_int(12));
    entity.set_attribute("iq", "Intelligence", Fxp::from_int(12));

    let talent: Trait = library
        .copy("talent", &chosen(&[("Field", "Stealth")]))
        .unwrap();
    entity.add_trait(talent);
    entity.add_trait(library.copy("ninja", &Replacements::new()).unwrap());

    let mut stealth: Skill = library.copy("stealth", &Replacements::new()).unwrap();
    stealth.points = Fxp::from_int(2);
    entity.add_skill(stealth);
    entity.add_skill(library.copy("shadowing", &Replacements::new()).unwrap());
    entity
}

/// Library items copied onto a character resolve levels, bonuses and
/// prerequisites together.
#[test]
fn test_character_pipeline() {
    let library = Library::from_json(LIBRARY).unwrap();
    let mut entity = build(&library);
    entity.recalculate();

    let stealth = &entity.skills[0];
    let shadowing = &entity.skills[1];
    // DX 12, Average, 2 points, plus two talent levels
    assert_eq!(stealth.level.level, Fxp::from_int(14));
    assert!(stealth.level.tooltip.contains("Stealth Talent"));
    // Stealth-4 beats IQ-4
    assert_eq!(shadowing.level.level, Fxp::from_int(10));
    assert_eq!(shadowing.level.relative_level, Fxp::from_int(-2));

    let ninja = &entity.traits[1];
    let reason = ninja.unsatisfied_reason.as_deref().unwrap();
    assert!(reason.contains("has a skill whose name is \"Stealth\", and level at least 15"));

    entity.skills[0].points = Fxp::from_int(4);
    entity.recalculate();
    assert_eq!(entity.skills[0].level.level, Fxp::from_int(15));
    assert!(entity.traits[1].unsatisfied_reason.is_none());
}

#[test]
fn test_defaults_graph_of_character() {
    let library = Library::from_json(LIBRARY).unwrap();
    let entity = build(&library);
    let graph = DefaultGraph::from_entity(&entity);
    let stealth = entity.skills[0].id;
    let shadowing = entity.skills[1].id;
    assert_eq!(graph.defaults_of(shadowing), vec![stealth]);
    assert!(graph.defaults_of(stealth).is_empty());
    assert!(graph.cycles().is_empty());
}

/// Points spent and levels computed never make an item drift from its
/// library source; edits to its rules do.
#[test]
fn test_library_sync_report() {
    let library = Library::from_json(LIBRARY).unwrap();
    let mut matcher = SourceMatcher::new();
    matcher.prepare(&library);
    assert_eq!(matcher.len(), 4);

    let mut entity = build(&library);
    entity.recalculate();
    let report = matcher.report(&entity);
    assert_eq!(report.len(), 4);
    assert!(report.iter().all(|(_, status)| *status == SourceStatus::Matched));

    entity.traits[1].notes = "Trained by the Order".into();
    let moved = Skill {
        source: Some(SourceRef::new("Martial Arts", "stealth")),
        ..entity.skills[0].clone()
    };
    let stealth = entity.add_skill(moved);
    let report = matcher.report(&entity);
    assert!(report.contains(&(entity.traits[1].id, SourceStatus::Mismatched)));
    assert!(report.contains(&(stealth, SourceStatus::Missing)));
}

#[test]
fn test_template_onto_character() {
    let json = r#"{
        "name": "Scout",
        "traits": [{"name": "Sense of Duty (@Group@)"}],
        "skills": [{"name": "Tracking", "difficulty": "per/a", "points": 2}]
    }"#;
    let template = Template::from_json(json).unwrap();
    assert_eq!(template.nameable_keys(), chosen(&[("Group", "Group")]));

    let mut entity = Entity::default();
    entity.set_attribute("per", "Perception", Fxp::from_int(13));
    let ids = template.apply_to(&mut entity, &chosen(&[("Group", "Rangers")]));
    entity.recalculate();

    assert_eq!(entity.item_name(ids[0]).unwrap(), "Sense of Duty (Rangers)");
    assert_eq!(entity.skill(ids[1]).unwrap().level.level, Fxp::from_int(13));
}
