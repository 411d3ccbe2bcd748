//! Paint precedence and structural containment.
//!
//! Containment is answered from document-order intervals computed once per
//! pass: with pre-order ids, the descendants of `n` are exactly the ids in
//! `n+1 ..= subtree_end[n]`.

use crate::scene::{NodeId, SceneProvider};
use std::cmp::Ordering;
use std::ops::RangeInclusive;

/// `(effective z-index, document order, ancestry depth)` plus the node whose
/// explicit z-index was inherited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackingKey {
    pub z_index: i32,
    pub z_source: Option<NodeId>,
    pub document_order: usize,
    pub depth: usize,
}

impl StackingKey {
    pub fn node(&self) -> NodeId {
        NodeId(self.document_order)
    }
}

impl Ord for StackingKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.z_index
            .cmp(&other.z_index)
            .then(self.document_order.cmp(&other.document_order))
            .then(self.depth.cmp(&other.depth))
    }
}

impl PartialOrd for StackingKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Derives a node's stacking key by walking its ancestors.
pub fn stacking_key_of<P: SceneProvider + ?Sized>(provider: &P, node: NodeId) -> StackingKey {
    let mut z = None;
    let mut depth = 0;
    let mut current = Some(node);
    while let Some(n) = current {
        if z.is_none() {
            z = provider.z_index(n).map(|value| (value, n));
        }
        current = provider.parent(n);
        if current.is_some() {
            depth += 1;
        }
    }
    StackingKey {
        z_index: z.map(|(value, _)| value).unwrap_or(0),
        z_source: z.map(|(_, source)| source),
        document_order: node.0,
        depth,
    }
}

#[derive(Debug, Clone)]
pub struct ContainmentIndex {
    subtree_end: Vec<usize>,
}

impl ContainmentIndex {
    pub fn build<P: SceneProvider + ?Sized>(provider: &P) -> Self {
        let count = provider.node_count();
        let mut subtree_end: Vec<usize> = (0..count).collect();
        for idx in (0..count).rev() {
            if let Some(parent) = provider.parent(NodeId(idx)) {
                subtree_end[parent.0] = subtree_end[parent.0].max(subtree_end[idx]);
            }
        }
        Self { subtree_end }
    }

    /// Strict structural containment: `inner` is a descendant of `outer`.
    pub fn contains(&self, outer: NodeId, inner: NodeId) -> bool {
        outer.0 < inner.0 && inner.0 <= self.subtree_end[outer.0]
    }

    /// Either node is an ancestor of the other (or they are the same node).
    pub fn is_related(&self, a: NodeId, b: NodeId) -> bool {
        a == b || self.contains(a, b) || self.contains(b, a)
    }

    pub fn descendants(&self, node: NodeId) -> RangeInclusive<usize> {
        node.0 + 1..=self.subtree_end[node.0]
    }

    pub fn subtree_end(&self, node: NodeId) -> NodeId {
        NodeId(self.subtree_end[node.0])
    }
}

/// True when `other` paints on top of `reference`.
///
/// Nodes in a containment relationship never occlude each other. A z-index
/// inherited from a common ancestor does not count for either side.
pub fn paints_above(
    other: &StackingKey,
    reference: &StackingKey,
    containment: &ContainmentIndex,
) -> bool {
    if containment.is_related(other.node(), reference.node()) {
        return false;
    }
    let effective = |key: &StackingKey, against: NodeId| match key.z_source {
        Some(source) if containment.contains(source, against) => 0,
        _ => key.z_index,
    };
    let other_z = effective(other, reference.node());
    let reference_z = effective(reference, other.node());
    if other_z != reference_z {
        return other_z > reference_z;
    }
    other.document_order > reference.document_order
}
