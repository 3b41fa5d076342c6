use std::collections::HashMap;

use crate::osm::{Location, Node, Way, WayNode};

/// Node locations seen so far in the stream, keyed by node id.
#[derive(Debug, Default)]
pub struct LocationIndex {
    locations: HashMap<i64, Location>,
}

impl LocationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: &Node) {
        self.locations.insert(node.id, node.location);
    }

    pub fn get(&self, id: i64) -> Location {
        self.locations.get(&id).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Look up every node of `way`. Unknown refs come back with an undefined location; missing
    /// nodes are normal in partial extracts.
    pub fn resolve(&self, way: &Way) -> Vec<WayNode> {
        way.node_refs
            .iter()
            .map(|&id| WayNode {
                id,
                location: self.get(id),
            })
            .collect()
    }
}
