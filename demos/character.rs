//! Character example: building a sheet from a library and recalculating it
//!
//! This example demonstrates:
//! - Loading a library document and copying items with nameable replacements
//! - Skill levels from points, defaults and bonuses
//! - Prerequisite tooltips
//! - Checking copied items against their library source

use rulecore::default_graph::DefaultGraph;
use rulecore::entity::{Equipment, Skill, Trait};
use rulecore::library::{Library, LibraryItem, SourceMatcher};
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
        "weapon_master": {
            "name": "Weapon Master (@Weapon@)",
            "prereqs": {
                "prereqs": [{
                    "type": "skill_prereq",
                    "has": true,
                    "name": {"compare": "is", "qualifier": "@Weapon@"},
                    "level": {"compare": "at_least", "qualifier": 14}
                }]
            }
        }
    },
    "skills": {
        "broadsword": {
            "name": "Broadsword",
            "difficulty": "dx/a",
            "defaults": [
                {"type": "dx", "modifier": -5},
                {"type": "skill", "name": "Shortsword", "modifier": -2}
            ]
        },
        "shortsword": {
            "name": "Shortsword",
            "difficulty": "dx/a",
            "defaults": [
                {"type": "dx", "modifier": -5},
                {"type": "skill", "name": "Broadsword", "modifier": -2}
            ]
        }
    },
    "equipment": {
        "backpack": {
            "name": "Backpack",
            "weight": "3 lb",
            "children": [{"name": "Rope", "weight": "1.5 lb"}]
        }
    }
}"#;

fn copy<T: LibraryItem>(library: &Library, id: &str, chosen: &Replacements) -> Result<T, RuleError> {
    library
        .copy(id, chosen)
        .ok_or_else(|| RuleError::UnknownValue("library item", id.to_string()))
}

fn main() -> Result<(), RuleError> {
    println!("=== Character Sheet Demo ===\n");

    let library = Library::from_json(LIBRARY)?;
    let mut entity = Entity::default();
    entity.set_attribute("st", "Strength", Fxp::from_int(11));
    entity.set_attribute("dx", "Dexterity", Fxp::from_int(12));
    entity.set_attribute("basic_speed", "Basic Speed", Fxp::from_int(6));

    let mut chosen = Replacements::new();
    chosen.insert("Field".into(), "Broadsword".into());
    chosen.insert("Weapon".into(), "Broadsword".into());

    let talent: Trait = copy(&library, "talent", &chosen)?;
    let master: Trait = copy(&library, "weapon_master", &chosen)?;
    entity.add_trait(talent);
    let master = entity.add_trait(master);

    let mut broadsword: Skill = copy(&library, "broadsword", &chosen)?;
    broadsword.points = Fxp::from_int(2);
    entity.add_skill(broadsword);
    entity.add_skill(copy::<Skill>(&library, "shortsword", &chosen)?);
    entity.add_equipment(copy::<Equipment>(&library, "backpack", &chosen)?);

    // ===== Skill levels =====
    println!("1. Skill levels\n");
    entity.recalculate();
    for sk in &entity.skills {
        println!("  {}: {} (DX{})", sk.full_name(), sk.level.level, sk.level.relative_level.string_with_sign());
        for line in sk.level.tooltip.lines().filter(|l| !l.is_empty()) {
            println!("    {}", line);
        }
    }

    let graph = DefaultGraph::from_entity(&entity);
    for cycle in graph.cycles() {
        let names: Vec<String> = cycle.iter().map(|id| entity.item_name(*id)).collect::<Result<_, _>>()?;
        println!("  defaults loop: {}", names.join(" -> "));
    }

    // ===== Prerequisites =====
    println!("\n2. Prerequisites\n");
    let name = entity.item_name(master)?;
    match &entity.traits[1].unsatisfied_reason {
        Some(reason) => println!("  {} is not satisfied:{}", name, reason),
        None => println!("  {} is satisfied", name),
    }

    entity.skills[0].points = Fxp::from_int(8);
    entity.recalculate();
    println!("  after training Broadsword to {}:", entity.skills[0].level.level);
    match &entity.traits[1].unsatisfied_reason {
        Some(reason) => println!("  {} is not satisfied:{}", name, reason),
        None => println!("  {} is satisfied", name),
    }

    // ===== Library sync =====
    println!("\n3. Library sync\n");
    let mut matcher = SourceMatcher::new();
    matcher.prepare(&library);
    entity.traits[0].notes = "Trained at the academy".into();
    for (id, status) in matcher.report(&entity) {
        println!("  {}: {:?}", entity.item_name(id)?, status);
    }

    let pack = &entity.equipment[0];
    println!(
        "\n  {} carries {}",
        pack.name_with_replacements(),
        pack.extended_weight().format(entity.settings.default_weight_units)
    );
    Ok(())
}
