//! Skill default graph.
//!
//! Each skill is a node; an edge runs from a skill to every skill one of its
//! skill-based defaults can reach. Level computation never needs this graph
//! (the resolution path in [`Excludes`](crate::skill_default::Excludes)
//! already stops at a loop), but the loops themselves are worth reporting to
//! whoever authored the data.

use crate::entity::{Entity, ItemId};
use crate::skill_default::Excludes;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// Directed graph of skill defaults.
///
/// # Examples
///
/// ```rust
/// use rulecore::default_graph::DefaultGraph;
/// use rulecore::entity::ItemId;
///
/// let mut graph = DefaultGraph::new();
/// let (a, b) = (ItemId::new(1), ItemId::new(2));
/// graph.add_edge(a, b);
/// assert!(graph.cycles().is_empty());
///
/// graph.add_edge(b, a);
/// assert_eq!(graph.cycles().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct DefaultGraph {
    graph: DiGraph<ItemId, ()>,
    node_map: HashMap<ItemId, NodeIndex>,
}

impl DefaultGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph of every skill in `entity`.
    ///
    /// Defaults are matched by name and specialization after the owning
    /// skill's replacements are applied; points are not required.
    pub fn from_entity(entity: &Entity) -> Self {
        let mut graph = Self::new();
        let none = Excludes::new();
        for sk in &entity.skills {
            graph.add_node(sk.id);
            for def in sk.defaults.iter().filter(|def| def.is_skill_based()) {
                let name = def.name_with_replacements(&sk.replacements);
                let specialization = def.specialization_with_replacements(&sk.replacements);
                for target in entity.skill_named(&name, &specialization, false, &none) {
                    graph.add_edge(sk.id, target.id);
                }
            }
        }
        graph
    }

    /// Add a node if it is not already present.
    pub fn add_node(&mut self, id: ItemId) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&id) {
            idx
        } else {
            let idx = self.graph.add_node(id);
            self.node_map.insert(id, idx);
            idx
        }
    }

    /// Record that `from` has a default leading to `to`.
    pub fn add_edge(&mut self, from: ItemId, to: ItemId) {
        let from_idx = self.add_node(from);
        let to_idx = self.add_node(to);
        if self.graph.find_edge(from_idx, to_idx).is_none() {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// Whether `id` is in the graph.
    pub fn contains_node(&self, id: ItemId) -> bool {
        self.node_map.contains_key(&id)
    }

    /// The skills `id` defaults to directly.
    pub fn defaults_of(&self, id: ItemId) -> Vec<ItemId> {
        match self.node_map.get(&id) {
            Some(&idx) => self
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .map(|n| self.graph[n])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Every default loop found by a depth-first walk.
    ///
    /// Each loop is reported once per back edge, as a closed path whose
    /// first and last entries are the same skill. A skill defaulting to
    /// itself yields `[a, a]`.
    pub fn cycles(&self) -> Vec<Vec<ItemId>> {
        let mut visited = HashSet::new();
        let mut on_path = HashSet::new();
        let mut path = Vec::new();
        let mut found = Vec::new();
        for idx in self.graph.node_indices() {
            if !visited.contains(&idx) {
                self.walk(idx, &mut visited, &mut on_path, &mut path, &mut found);
            }
        }
        found
    }

    fn walk(
        &self,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        on_path: &mut HashSet<NodeIndex>,
        path: &mut Vec<NodeIndex>,
        found: &mut Vec<Vec<ItemId>>,
    ) {
        visited.insert(node);
        on_path.insert(node);
        path.push(node);

        for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
            if on_path.contains(&next) {
                if let Some(start) = path.iter().position(|&n| n == next) {
                    let mut cycle: Vec<ItemId> =
                        path[start..].iter().map(|&n| self.graph[n]).collect();
                    cycle.push(self.graph[next]);
                    found.push(cycle);
                }
            } else if !visited.contains(&next) {
                self.walk(next, visited, on_path, path, found);
            }
        }

        on_path.remove(&node);
        path.pop();
    }
}
