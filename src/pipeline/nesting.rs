//! Collapses candidates that represent the same clickable target at several
//! levels of the element tree.
//!
//! Containment here is structural (document tree), answered from the
//! per-pass `ContainmentIndex`.

use super::stacking::ContainmentIndex;
use crate::config::SomConfig;
use crate::scene::{NodeId, SceneProvider};
use std::collections::HashSet;

/// A first-hit candidate under some top element, with the remaining
/// candidates nested inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub top: NodeId,
    pub children: Vec<NodeId>,
}

pub struct NestingConsolidator<'a, P: SceneProvider> {
    provider: &'a P,
    containment: &'a ContainmentIndex,
    config: &'a SomConfig,
}

impl<'a, P: SceneProvider> NestingConsolidator<'a, P> {
    pub fn new(provider: &'a P, containment: &'a ContainmentIndex, config: &'a SomConfig) -> Self {
        Self {
            provider,
            containment,
            config,
        }
    }

    /// Consolidates each maximal candidate against the candidates below it.
    /// Output follows the input order of the top-level candidates.
    pub fn consolidate(&self, candidates: &[NodeId]) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let candidates: Vec<NodeId> = candidates
            .iter()
            .copied()
            .filter(|node| seen.insert(*node))
            .collect();

        let (top, others) = self.split_top_level(&candidates);
        top.into_iter()
            .flat_map(|node| self.compare_with_children(node, &others))
            .collect()
    }

    /// Partitions candidates into those no other candidate contains, and the rest.
    pub fn split_top_level(&self, candidates: &[NodeId]) -> (Vec<NodeId>, Vec<NodeId>) {
        let mut sorted = candidates.to_vec();
        sorted.sort_unstable();
        let mut nested = HashSet::new();
        let mut open_end: Option<usize> = None;
        for node in sorted {
            match open_end {
                Some(end) if node.0 <= end => {
                    nested.insert(node);
                }
                _ => open_end = Some(self.containment.subtree_end(node).0),
            }
        }
        candidates
            .iter()
            .copied()
            .partition(|node| !nested.contains(node))
    }

    fn compare_with_children(&self, top: NodeId, children: &[NodeId]) -> Vec<NodeId> {
        if self.is_priority(top) {
            return vec![top];
        }
        let branches = self.branches(top, children);
        if branches.len() <= 1 {
            return vec![top];
        }

        let rect = self.provider.shape(top).rect;
        let size_threshold = 1.0 - self.config.disjoint_threshold;
        let mut total = Vec::new();
        for branch in branches {
            let hit = self.provider.shape(branch.top).rect;
            if hit.width / rect.width < size_threshold && hit.height / rect.height < size_threshold {
                continue;
            }
            if branch.children.is_empty() {
                total.push(branch.top);
            } else {
                total.extend(self.compare_with_children(branch.top, &branch.children));
            }
        }

        if total.len() > self.config.quantity_threshold {
            return total;
        }
        let mut kept = Vec::with_capacity(total.len() + 1);
        kept.push(top);
        kept.extend(total);
        kept
    }

    /// First hits below `element` among `candidates`, each paired with the
    /// non-first-hit candidates it contains.
    pub fn branches(&self, element: NodeId, candidates: &[NodeId]) -> Vec<Branch> {
        let mut sorted = candidates.to_vec();
        sorted.sort_unstable();
        let set: HashSet<NodeId> = candidates.iter().copied().collect();

        let mut hits = Vec::new();
        self.first_hits(element, &set, &sorted, &mut hits);
        let hit_set: HashSet<NodeId> = hits.iter().copied().collect();

        hits.iter()
            .map(|&hit| Branch {
                top: hit,
                children: candidates
                    .iter()
                    .copied()
                    .filter(|c| !hit_set.contains(c) && self.containment.contains(hit, *c))
                    .collect(),
            })
            .collect()
    }

    // Direct children that are candidates win; only when there are none does
    // the search descend into every child's subtree.
    fn first_hits(
        &self,
        element: NodeId,
        set: &HashSet<NodeId>,
        sorted: &[NodeId],
        out: &mut Vec<NodeId>,
    ) {
        let direct = self.provider.children(element);
        let before = out.len();
        out.extend(direct.iter().copied().filter(|child| set.contains(child)));
        if out.len() > before {
            return;
        }
        for &child in direct {
            if self.subtree_has_candidate(child, sorted) {
                self.first_hits(child, set, sorted, out);
            }
        }
    }

    fn subtree_has_candidate(&self, node: NodeId, sorted: &[NodeId]) -> bool {
        let range = self.containment.descendants(node);
        let start = sorted.partition_point(|n| n.0 < *range.start());
        sorted.get(start).is_some_and(|n| n.0 <= *range.end())
    }

    fn is_priority(&self, node: NodeId) -> bool {
        let element = self.provider.element(node);
        self.config
            .priority_tags
            .iter()
            .any(|tag| element.is_tag(tag))
    }
}
