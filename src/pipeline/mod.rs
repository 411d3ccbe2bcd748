//! One Set-of-Marks pass: select, classify, consolidate, then color and
//! label what survives.

pub mod colors;
pub mod label_placement;
pub mod nesting;
pub mod occlusion;
pub mod selector;
pub mod spatial_index;
pub mod stacking;
pub mod visibility;

use crate::config::SomConfig;
use crate::error::Result;
use crate::geometry::{Rect, Shape};
use crate::scene::{NodeId, SceneProvider};
use crate::theme::Theme;
use colors::{Color, ColorChooser, surrounding_colors};
use label_placement::{LabelPosition, place_labels};
use nesting::NestingConsolidator;
use occlusion::OcclusionRasterizer;
use selector::CandidateSelector;
use serde::Serialize;
use spatial_index::{DEFAULT_NODE_CAPACITY, SpatialIndex};
use stacking::{ContainmentIndex, StackingKey};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use visibility::VisibilityClassifier;

/// An element under consideration during one pass.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub node: NodeId,
    pub shape: Shape,
    pub is_fixed_role: bool,
    pub visible: bool,
}

impl Candidate {
    pub fn new<P: SceneProvider>(provider: &P, node: NodeId, is_fixed_role: bool) -> Self {
        Self {
            node,
            shape: provider.shape(node),
            is_fixed_role,
            visible: false,
        }
    }
}

/// A retained element: its index, box, color and label placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mark {
    pub index: usize,
    pub node: NodeId,
    #[serde(rename = "box")]
    pub rect: Rect,
    pub color: Color,
    pub label_color: Color,
    pub label: LabelPosition,
    pub label_width: f32,
    pub label_height: f32,
    pub editable: bool,
}

impl Mark {
    pub fn label_rect(&self) -> Rect {
        self.label.rect(self.label_width, self.label_height)
    }
}

/// Read-only structures shared by every stage of a pass.
pub struct PassContext<'a, P: SceneProvider> {
    pub provider: &'a P,
    pub config: &'a SomConfig,
    pub viewport: Rect,
    pub index: SpatialIndex,
    pub containment: ContainmentIndex,
    pub stacking: Vec<StackingKey>,
}

impl<'a, P: SceneProvider> PassContext<'a, P> {
    pub fn build(provider: &'a P, config: &'a SomConfig) -> Self {
        let viewport = provider.viewport_bound();
        let index = SpatialIndex::build(
            viewport,
            provider.walk_all_painted_nodes(),
            DEFAULT_NODE_CAPACITY,
        );
        let stacking = (0..provider.node_count())
            .map(|idx| provider.stacking_key(NodeId(idx)))
            .collect();
        Self {
            provider,
            config,
            viewport,
            index,
            containment: ContainmentIndex::build(provider),
            stacking,
        }
    }

    pub fn rasterizer(&self) -> OcclusionRasterizer<'_> {
        OcclusionRasterizer::new(&self.index, &self.containment, &self.stacking, self.viewport)
    }
}

/// Runs a full pass and returns the ordered marks.
///
/// Only configuration errors abort; an empty result is `Ok`.
pub async fn run_pass<P, S, C>(
    provider: &P,
    config: &SomConfig,
    theme: &Theme,
    selector: &S,
    chooser: &C,
) -> Result<Vec<Mark>>
where
    P: SceneProvider,
    S: CandidateSelector,
    C: ColorChooser,
{
    let started = Instant::now();
    let selection = selector.select(provider);
    tracing::debug!(
        total = selection.len(),
        fixed = selection.fixed.len(),
        heuristic = selection.heuristic.len(),
        "before filters"
    );
    if selection.is_empty() {
        tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, marks = 0, "pass complete");
        return Ok(Vec::new());
    }

    let ctx = PassContext::build(provider, config);
    tracing::debug!(indexed = ctx.index.len(), "spatial index built");

    let classifier = VisibilityClassifier::new(&ctx);
    let mut fixed: Vec<Candidate> = selection
        .fixed
        .iter()
        .map(|node| Candidate::new(provider, *node, true))
        .collect();
    let mut heuristic: Vec<Candidate> = selection
        .heuristic
        .iter()
        .map(|node| Candidate::new(provider, *node, false))
        .collect();
    classifier.classify(&mut fixed).await?;
    classifier.classify(&mut heuristic).await?;

    let visible_fixed: Vec<NodeId> = fixed.iter().filter(|c| c.visible).map(|c| c.node).collect();
    let visible_heuristic: Vec<NodeId> = heuristic
        .iter()
        .filter(|c| c.visible)
        .map(|c| c.node)
        .collect();
    tracing::debug!(
        fixed = visible_fixed.len(),
        heuristic = visible_heuristic.len(),
        "after visibility filter"
    );

    let union: Vec<NodeId> = visible_heuristic
        .iter()
        .chain(visible_fixed.iter())
        .copied()
        .collect();
    let consolidated =
        NestingConsolidator::new(provider, &ctx.containment, config).consolidate(&union);
    tracing::debug!(kept = consolidated.len(), "after nesting filter");

    // Fixed-role candidates are never dropped by consolidation.
    let mut seen = HashSet::new();
    let ordered: Vec<NodeId> = visible_fixed
        .iter()
        .chain(consolidated.iter())
        .copied()
        .filter(|node| seen.insert(*node))
        .collect();
    let retained = dedupe_same_origin(provider, selector, &ordered);

    let marks = build_marks(provider, config, theme, selector, chooser, &retained);
    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        marks = marks.len(),
        "pass complete"
    );
    Ok(marks)
}

/// Keeps one element per top-left corner, preferring an editable one.
fn dedupe_same_origin<P: SceneProvider, S: CandidateSelector>(
    provider: &P,
    selector: &S,
    nodes: &[NodeId],
) -> Vec<NodeId> {
    let mut kept: Vec<NodeId> = Vec::with_capacity(nodes.len());
    let mut by_origin: HashMap<(u32, u32), usize> = HashMap::new();
    for &node in nodes {
        let rect = provider.shape(node).rect;
        let key = (rect.x.to_bits(), rect.y.to_bits());
        match by_origin.get(&key) {
            Some(&slot) => {
                let existing_editable = selector.is_editable(provider.element(kept[slot]));
                if !existing_editable && selector.is_editable(provider.element(node)) {
                    kept[slot] = node;
                }
            }
            None => {
                by_origin.insert(key, kept.len());
                kept.push(node);
            }
        }
    }
    kept
}

fn build_marks<P, S, C>(
    provider: &P,
    config: &SomConfig,
    theme: &Theme,
    selector: &S,
    chooser: &C,
    nodes: &[NodeId],
) -> Vec<Mark>
where
    P: SceneProvider,
    S: CandidateSelector,
    C: ColorChooser,
{
    let boxes: Vec<Rect> = nodes.iter().map(|n| provider.shape(*n).rect).collect();

    let mut colored: Vec<(Rect, Color)> = Vec::with_capacity(nodes.len());
    for (index, (node, rect)) in nodes.iter().zip(&boxes).enumerate() {
        let nearby = surrounding_colors(rect, &colored, config.surrounding_radius);
        let color = chooser.choose(provider.element(*node), &nearby, index);
        colored.push((*rect, color));
    }

    let sizes: Vec<(f32, f32)> = (0..nodes.len())
        .map(|index| theme.label_size(&index.to_string()))
        .collect();
    let labels = place_labels(&boxes, &sizes, provider.viewport_bound(), config.grid_size);

    nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let (rect, color) = colored[index];
            let (label_width, label_height) = sizes[index];
            Mark {
                index,
                node: *node,
                rect,
                color,
                label_color: color.label_text_color(),
                label: labels[index],
                label_width,
                label_height,
                editable: selector.is_editable(provider.element(*node)),
            }
        })
        .collect()
}
