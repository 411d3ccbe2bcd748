//! Scene model and the provider contract the pipeline reads from.
//!
//! `Scene` is the built-in provider: a JSON snapshot of an element tree,
//! flattened in document order so that `NodeId` doubles as the document
//! position of a node.

use crate::error::{Result, SomError};
use crate::geometry::{CornerRadii, Rect, Shape, parse_clip_path};
use crate::pipeline::stacking::{StackingKey, stacking_key_of};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Index of a node in document (pre-)order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// A painted shape with a back-reference to its element; spatial index payload.
#[derive(Debug, Clone)]
pub struct PaintedNode {
    pub node: NodeId,
    pub shape: Shape,
}

/// Descriptive element data used by selection, coloring and output.
#[derive(Debug, Clone, Default)]
pub struct ElementInfo {
    pub tag: String,
    pub element_id: Option<String>,
    pub role: Option<String>,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub cursor: Option<String>,
    pub background_color: Option<String>,
}

impl ElementInfo {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }
}

/// Everything the pipeline needs to know about the rendered scene.
///
/// Implementations must assign `NodeId`s in document pre-order, so a node's
/// descendants occupy the id range directly after it.
pub trait SceneProvider {
    fn node_count(&self) -> usize;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> &[NodeId];

    fn element(&self, node: NodeId) -> &ElementInfo;

    fn shape(&self, node: NodeId) -> Shape;

    /// Explicit (non-`auto`) z-index of the node itself.
    fn z_index(&self, node: NodeId) -> Option<i32>;

    /// True if the node or any ancestor is `display: none`, `visibility: hidden`
    /// (or `collapse`) or `pointer-events: none`.
    fn is_style_hidden(&self, node: NodeId) -> bool;

    fn viewport_bound(&self) -> Rect;

    /// All nodes that actually paint, in document order, including nested
    /// rendering contexts. Walked once per pass.
    fn walk_all_painted_nodes(&self) -> impl Iterator<Item = PaintedNode> + '_;

    fn stacking_key(&self, node: NodeId) -> StackingKey {
        stacking_key_of(self, node)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

/// One element of a serialized scene snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeSnapshot {
    pub tag: String,
    pub id: Option<String>,
    pub role: Option<String>,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub rect: Rect,
    pub border_radius: Vec<f32>,
    pub clip_path: Option<String>,
    pub z_index: Option<i32>,
    pub display: Option<String>,
    pub visibility: Option<String>,
    pub pointer_events: Option<String>,
    pub cursor: Option<String>,
    pub background_color: Option<String>,
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    pub fn new(tag: &str, rect: Rect) -> Self {
        Self {
            tag: tag.to_string(),
            rect,
            ..Default::default()
        }
    }

    pub fn child(mut self, child: NodeSnapshot) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn z(mut self, z_index: i32) -> Self {
        self.z_index = Some(z_index);
        self
    }

    pub fn cursor(mut self, cursor: &str) -> Self {
        self.cursor = Some(cursor.to_string());
        self
    }

    pub fn radius(mut self, values: &[f32]) -> Self {
        self.border_radius = values.to_vec();
        self
    }

    pub fn clip(mut self, clip_path: &str) -> Self {
        self.clip_path = Some(clip_path.to_string());
        self
    }

    pub fn background(mut self, color: &str) -> Self {
        self.background_color = Some(color.to_string());
        self
    }

    pub fn display(mut self, display: &str) -> Self {
        self.display = Some(display.to_string());
        self
    }

    fn hides_itself(&self) -> bool {
        let is = |value: &Option<String>, hidden: &[&str]| {
            value
                .as_deref()
                .map(|v| hidden.iter().any(|h| v.trim().eq_ignore_ascii_case(h)))
                .unwrap_or(false)
        };
        is(&self.display, &["none"])
            || is(&self.visibility, &["hidden", "collapse"])
            || is(&self.pointer_events, &["none"])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub viewport: Viewport,
    pub root: NodeSnapshot,
}

#[derive(Debug, Clone)]
struct SceneNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    element: ElementInfo,
    shape: Shape,
    z_index: Option<i32>,
    hidden: bool,
}

/// Flattened, immutable element tree.
#[derive(Debug, Clone)]
pub struct Scene {
    viewport: Rect,
    nodes: Vec<SceneNode>,
}

impl Scene {
    pub fn from_snapshot(snapshot: &SceneSnapshot) -> Result<Self> {
        let Viewport { width, height } = snapshot.viewport;
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(SomError::InvalidScene(format!(
                "viewport must be positive, got {width}x{height}"
            )));
        }

        let mut nodes: Vec<SceneNode> = Vec::new();
        let mut stack: Vec<(&NodeSnapshot, Option<NodeId>)> = vec![(&snapshot.root, None)];
        while let Some((snap, parent)) = stack.pop() {
            let rect = snap.rect;
            if ![rect.x, rect.y, rect.width, rect.height]
                .iter()
                .all(|v| v.is_finite())
            {
                return Err(SomError::InvalidScene(format!(
                    "node <{}> has a non-finite rect",
                    snap.tag
                )));
            }

            let id = NodeId(nodes.len());
            let parent_hidden = parent.map(|p| nodes[p.0].hidden).unwrap_or(false);
            let shape = Shape {
                rect,
                radii: CornerRadii::from_css_values(&snap.border_radius)
                    .clamped_to(rect.width, rect.height),
                clip: snap
                    .clip_path
                    .as_deref()
                    .and_then(|css| parse_clip_path(css, rect.width, rect.height)),
            };
            nodes.push(SceneNode {
                parent,
                children: Vec::new(),
                element: ElementInfo {
                    tag: snap.tag.to_ascii_lowercase(),
                    element_id: snap.id.clone(),
                    role: snap.role.clone(),
                    classes: snap.classes.clone(),
                    attributes: snap.attributes.clone(),
                    cursor: snap.cursor.clone(),
                    background_color: snap.background_color.clone(),
                },
                shape,
                z_index: snap.z_index,
                hidden: parent_hidden || snap.hides_itself(),
            });
            if let Some(parent) = parent {
                nodes[parent.0].children.push(id);
            }
            for child in snap.children.iter().rev() {
                stack.push((child, Some(id)));
            }
        }

        Ok(Self {
            viewport: Rect::new(0.0, 0.0, width, height),
            nodes,
        })
    }

    pub fn from_json(input: &str) -> Result<Self> {
        let snapshot: SceneSnapshot = serde_json::from_str(input)?;
        Self::from_snapshot(&snapshot)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Looks up a node by its `id` attribute.
    pub fn find_by_element_id(&self, element_id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.element.element_id.as_deref() == Some(element_id))
            .map(NodeId)
    }
}

impl SceneProvider for Scene {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    fn element(&self, node: NodeId) -> &ElementInfo {
        &self.nodes[node.0].element
    }

    fn shape(&self, node: NodeId) -> Shape {
        self.nodes[node.0].shape.clone()
    }

    fn z_index(&self, node: NodeId) -> Option<i32> {
        self.nodes[node.0].z_index
    }

    fn is_style_hidden(&self, node: NodeId) -> bool {
        self.nodes[node.0].hidden
    }

    fn viewport_bound(&self) -> Rect {
        self.viewport
    }

    fn walk_all_painted_nodes(&self) -> impl Iterator<Item = PaintedNode> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.hidden)
            .map(|(idx, node)| PaintedNode {
                node: NodeId(idx),
                shape: node.shape.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Scene {
        let root = NodeSnapshot::new("body", Rect::new(0.0, 0.0, 800.0, 600.0))
            .child(
                NodeSnapshot::new("div", Rect::new(0.0, 0.0, 400.0, 300.0))
                    .display("none")
                    .child(NodeSnapshot::new("button", Rect::new(10.0, 10.0, 50.0, 20.0))),
            )
            .child(NodeSnapshot::new("a", Rect::new(500.0, 10.0, 80.0, 20.0)).with_id("link"));
        Scene::from_snapshot(&SceneSnapshot {
            viewport: Viewport {
                width: 800.0,
                height: 600.0,
            },
            root,
        })
        .unwrap()
    }

    #[test]
    fn flattens_in_document_order() {
        let scene = sample();
        assert_eq!(scene.node_count(), 4);
        assert_eq!(scene.children(NodeId(0)), &[NodeId(1), NodeId(3)]);
        assert_eq!(scene.parent(NodeId(2)), Some(NodeId(1)));
        assert_eq!(scene.element(NodeId(2)).tag, "button");
        assert_eq!(scene.find_by_element_id("link"), Some(NodeId(3)));
    }

    #[test]
    fn hidden_style_is_inherited() {
        let scene = sample();
        assert!(scene.is_style_hidden(NodeId(1)));
        assert!(scene.is_style_hidden(NodeId(2)));
        assert!(!scene.is_style_hidden(NodeId(3)));
        let painted: Vec<NodeId> = scene.walk_all_painted_nodes().map(|p| p.node).collect();
        assert_eq!(painted, vec![NodeId(0), NodeId(3)]);
    }

    #[test]
    fn rejects_degenerate_viewport() {
        let json = r#"{"viewport":{"width":0,"height":10},"root":{"tag":"body"}}"#;
        assert!(matches!(
            Scene::from_json(json),
            Err(SomError::InvalidScene(_))
        ));
    }

    #[test]
    fn parses_camel_case_snapshot() {
        let json = r#"{
            "viewport": {"width": 100, "height": 100},
            "root": {"tag": "BODY", "rect": {"x":0,"y":0,"width":100,"height":100},
                     "children": [{"tag":"div","zIndex":3,"pointerEvents":"none",
                                   "rect":{"x":1,"y":1,"width":5,"height":5},
                                   "borderRadius":[2]}]}
        }"#;
        let scene = Scene::from_json(json).unwrap();
        assert_eq!(scene.element(NodeId(0)).tag, "body");
        assert_eq!(scene.z_index(NodeId(1)), Some(3));
        assert!(scene.is_style_hidden(NodeId(1)));
        assert_eq!(scene.shape(NodeId(1)).radii.0, [2.0; 4]);
    }
}
