//! Libraries, templates and drift detection.
//!
//! A [`Library`] is a named collection of rule items addressed by string id.
//! Copying an item onto a character records a [`SourceRef`] so a
//! [`SourceMatcher`] can later tell whether the character's copy still has the
//! same author-controlled content as the library original.
//!
//! Copies keep their `@token@` text and carry the chosen values in their
//! `replacements`, so a copy's content hash lines up with the original no
//! matter which values were chosen.

use crate::entity::{Entity, Equipment, ItemId, Skill, Spell, Trait};
use crate::error::RuleError;
use crate::hashing::{content_hash, ContentDigest, ContentHash};
use crate::nameables::{self, Nameables, Replacements};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Where a character's item was copied from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub library: String,
    pub id: String,
}

impl SourceRef {
    /// A reference to item `id` of `library`.
    pub fn new(library: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            id: id.into(),
        }
    }
}

/// How a character's item compares with its library original.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    /// Same content hash as the library item.
    Matched,
    /// The library item exists but its content differs.
    Mismatched,
    /// The library, or the item within it, is not known.
    Missing,
}

/// Rule items that can live in a library.
pub trait LibraryItem: ContentHash + Nameables + Clone {
    /// Distinguishes item kinds that share an id space in a library.
    const KIND: &'static str;

    /// The items of this kind held by `library`.
    fn items(library: &Library) -> &BTreeMap<String, Self>;

    /// The library item this was copied from, if any.
    fn source(&self) -> Option<&SourceRef>;

    /// Replace the recorded source.
    fn set_source(&mut self, source: Option<SourceRef>);

    /// Record the replacements this item (and anything inside it) needs,
    /// taking values from `chosen`.
    fn set_replacements(&mut self, chosen: &Replacements);
}

impl LibraryItem for Trait {
    const KIND: &'static str = "trait";

    fn items(library: &Library) -> &BTreeMap<String, Self> {
        &library.traits
    }

    fn source(&self) -> Option<&SourceRef> {
        self.source.as_ref()
    }

    fn set_source(&mut self, source: Option<SourceRef>) {
        self.source = source;
    }

    fn set_replacements(&mut self, chosen: &Replacements) {
        self.replacements = nameables::collect(&*self, chosen);
    }
}

impl LibraryItem for Skill {
    const KIND: &'static str = "skill";

    fn items(library: &Library) -> &BTreeMap<String, Self> {
        &library.skills
    }

    fn source(&self) -> Option<&SourceRef> {
        self.source.as_ref()
    }

    fn set_source(&mut self, source: Option<SourceRef>) {
        self.source = source;
    }

    fn set_replacements(&mut self, chosen: &Replacements) {
        self.replacements = nameables::collect(&*self, chosen);
    }
}

impl LibraryItem for Spell {
    const KIND: &'static str = "spell";

    fn items(library: &Library) -> &BTreeMap<String, Self> {
        &library.spells
    }

    fn source(&self) -> Option<&SourceRef> {
        self.source.as_ref()
    }

    fn set_source(&mut self, source: Option<SourceRef>) {
        self.source = source;
    }

    fn set_replacements(&mut self, chosen: &Replacements) {
        self.replacements = nameables::collect(&*self, chosen);
    }
}

impl LibraryItem for Equipment {
    const KIND: &'static str = "equipment";

    fn items(library: &Library) -> &BTreeMap<String, Self> {
        &library.equipment
    }

    fn source(&self) -> Option<&SourceRef> {
        self.source.as_ref()
    }

    fn set_source(&mut self, source: Option<SourceRef>) {
        self.source = source;
    }

    fn set_replacements(&mut self, chosen: &Replacements) {
        self.replacements = nameables::collect(&*self, chosen);
        for child in &mut self.children {
            child.set_replacements(chosen);
        }
    }
}

/// A named collection of rule items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub traits: BTreeMap<String, Trait>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub skills: BTreeMap<String, Skill>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub spells: BTreeMap<String, Spell>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub equipment: BTreeMap<String, Equipment>,
}

impl Library {
    /// An empty library called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse a library from its JSON document form.
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        serde_json::from_str(json).map_err(|err| {
            warn!("unable to load library: {}", err);
            RuleError::from(err)
        })
    }

    /// Copy the item `id` out of this library for use on a character.
    ///
    /// The copy records where it came from and carries the replacements it
    /// needs, with values from `chosen`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rulecore::entity::Trait;
    /// use rulecore::library::{Library, SourceRef};
    /// use rulecore::nameables::Replacements;
    ///
    /// let mut library = Library::new("Basic Set");
    /// library.traits.insert("enemy".into(), Trait::new("Enemy (@Who@)"));
    ///
    /// let mut chosen = Replacements::new();
    /// chosen.insert("Who".into(), "The Syndicate".into());
    /// let copy: Trait = library.copy("enemy", &chosen).unwrap();
    /// assert_eq!(copy.name_with_replacements(), "Enemy (The Syndicate)");
    /// assert_eq!(copy.source, Some(SourceRef::new("Basic Set", "enemy")));
    /// ```
    pub fn copy<T: LibraryItem>(&self, id: &str, chosen: &Replacements) -> Option<T> {
        let mut item = T::items(self).get(id)?.clone();
        item.set_source(Some(SourceRef::new(&self.name, id)));
        item.set_replacements(chosen);
        Some(item)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SourceKey {
    library: String,
    kind: &'static str,
    id: String,
}

/// Compares character items with the library items they were copied from.
///
/// # Examples
///
/// ```rust
/// use rulecore::entity::Trait;
/// use rulecore::library::{Library, SourceMatcher, SourceStatus};
/// use rulecore::nameables::Replacements;
///
/// let mut library = Library::new("Basic Set");
/// library.traits.insert("luck".into(), Trait::new("Luck"));
///
/// let mut matcher = SourceMatcher::new();
/// matcher.prepare(&library);
///
/// let mut copy: Trait = library.copy("luck", &Replacements::new()).unwrap();
/// assert_eq!(matcher.status(&copy), Some(SourceStatus::Matched));
/// copy.notes = "house rule".into();
/// assert_eq!(matcher.status(&copy), Some(SourceStatus::Mismatched));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SourceMatcher {
    hashes: HashMap<SourceKey, ContentDigest>,
}

impl SourceMatcher {
    /// A matcher with no library hashes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash every item in `library`, replacing hashes from an earlier
    /// library of the same name.
    pub fn prepare(&mut self, library: &Library) {
        self.hashes.retain(|key, _| key.library != library.name);
        self.prepare_kind::<Trait>(library);
        self.prepare_kind::<Skill>(library);
        self.prepare_kind::<Spell>(library);
        self.prepare_kind::<Equipment>(library);
        debug!(library = %library.name, items = self.hashes.len(), "prepared source hashes");
    }

    fn prepare_kind<T: LibraryItem>(&mut self, library: &Library) {
        for (id, item) in T::items(library) {
            let key = SourceKey {
                library: library.name.clone(),
                kind: T::KIND,
                id: id.clone(),
            };
            self.hashes.insert(key, content_hash(item));
        }
    }

    /// The number of library items hashed so far.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Whether no library has been prepared.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// How `item` compares with its source, or `None` if it has no source.
    pub fn status<T: LibraryItem>(&self, item: &T) -> Option<SourceStatus> {
        let source = item.source()?;
        let key = SourceKey {
            library: source.library.clone(),
            kind: T::KIND,
            id: source.id.clone(),
        };
        Some(match self.hashes.get(&key) {
            Some(expected) if *expected == content_hash(item) => SourceStatus::Matched,
            Some(_) => SourceStatus::Mismatched,
            None => SourceStatus::Missing,
        })
    }

    /// The status of every sourced item on `entity`, equipment contents
    /// included.
    pub fn report(&self, entity: &Entity) -> Vec<(ItemId, SourceStatus)> {
        let mut report = Vec::new();
        for t in &entity.traits {
            if let Some(status) = self.status(t) {
                report.push((t.id, status));
            }
        }
        for sk in &entity.skills {
            if let Some(status) = self.status(sk) {
                report.push((sk.id, status));
            }
        }
        for sp in &entity.spells {
            if let Some(status) = self.status(sp) {
                report.push((sp.id, status));
            }
        }
        entity.for_each_equipment(|eqp| {
            if let Some(status) = self.status(eqp) {
                report.push((eqp.id, status));
            }
        });
        report
    }
}

/// A bundle of items applied to a character in one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<Trait>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<Skill>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spells: Vec<Spell>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equipment: Vec<Equipment>,
}

impl Template {
    /// Parse a template from its JSON document form.
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        serde_json::from_str(json).map_err(|err| {
            warn!("unable to load template: {}", err);
            RuleError::from(err)
        })
    }

    /// Every nameable key used anywhere in the template, each mapped to
    /// itself. This is the set of values to ask the user for.
    pub fn nameable_keys(&self) -> Replacements {
        let none = Replacements::new();
        let mut keys = Replacements::new();
        self.traits.fill_with_nameable_keys(&mut keys, &none);
        self.skills.fill_with_nameable_keys(&mut keys, &none);
        self.spells.fill_with_nameable_keys(&mut keys, &none);
        self.equipment.fill_with_nameable_keys(&mut keys, &none);
        keys
    }

    /// Add copies of every item to `entity`, returning their ids in
    /// template order (traits, skills, spells, equipment).
    ///
    /// Each copy only keeps the replacements it uses. The entity is not
    /// recalculated.
    pub fn apply_to(&self, entity: &mut Entity, chosen: &Replacements) -> Vec<ItemId> {
        let mut ids = Vec::new();
        for item in &self.traits {
            ids.push(entity.add_trait(prepared(item, chosen)));
        }
        for item in &self.skills {
            ids.push(entity.add_skill(prepared(item, chosen)));
        }
        for item in &self.spells {
            ids.push(entity.add_spell(prepared(item, chosen)));
        }
        for item in &self.equipment {
            ids.push(entity.add_equipment(prepared(item, chosen)));
        }
        debug!(template = %self.name, items = ids.len(), "applied template");
        ids
    }
}

fn prepared<T: LibraryItem>(item: &T, chosen: &Replacements) -> T {
    let mut copy = item.clone();
    copy.set_replacements(chosen);
    copy
}
