//! Splitting ways at nodes without a location.
//!
//! Extracts cut along a boundary keep ways that leave the area but drop the nodes outside of it.
//! Such ways are exported as one line per stretch of consecutive located nodes.

use std::ops::Range;

use log::debug;

use crate::osm::WayNode;

/// A maximal run of located nodes within a way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Position among the emitted segments of the same way, starting at 0.
    pub part: u32,
    /// Indices into the way's node list.
    pub range: Range<usize>,
}

impl Segment {
    pub fn nodes<'a>(&self, nodes: &'a [WayNode]) -> &'a [WayNode] {
        &nodes[self.range.clone()]
    }
}

/// Partition `nodes` into runs of at least two located nodes.
///
/// Unlocated nodes are skipped. A run of a single located node cannot form a line; it is
/// dropped and does not use up a part number.
pub fn split(nodes: &[WayNode]) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut i = 0;

    while i < nodes.len() {
        if !nodes[i].location.is_valid() {
            i += 1;
            continue;
        }

        let start = i;
        while i + 1 < nodes.len() && nodes[i + 1].location.is_valid() {
            i += 1;
        }
        let end = i + 1;

        if end - start >= 2 {
            segments.push(Segment {
                part: segments.len() as u32,
                range: start..end,
            });
        } else {
            debug!("dropping isolated located node {}", nodes[start].id);
        }
        i = end;
    }

    segments
}
