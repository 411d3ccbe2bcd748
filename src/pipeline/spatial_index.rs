//! Quadtree over every painted shape in the scene.
//!
//! Built once per pass and read-only afterwards. Shapes that fit entirely
//! inside one quadrant are pushed down on overflow; shapes straddling a split
//! line stay at the node that first held them, so a query never misses them.

use crate::geometry::Rect;
use crate::scene::PaintedNode;

pub const DEFAULT_NODE_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;

#[derive(Debug)]
struct QuadNode {
    boundary: Rect,
    depth: usize,
    items: Vec<usize>,
    children: Option<[usize; 4]>,
}

impl QuadNode {
    fn new(boundary: Rect, depth: usize) -> Self {
        Self {
            boundary,
            depth,
            items: Vec::new(),
            children: None,
        }
    }
}

#[derive(Debug)]
pub struct SpatialIndex {
    shapes: Vec<PaintedNode>,
    nodes: Vec<QuadNode>,
    capacity: usize,
}

impl SpatialIndex {
    /// Bulk-loads `shapes` under `bound`; shapes not touching `bound` are dropped.
    pub fn build(bound: Rect, shapes: impl IntoIterator<Item = PaintedNode>, capacity: usize) -> Self {
        let mut index = Self {
            shapes: Vec::new(),
            nodes: vec![QuadNode::new(bound, 0)],
            capacity: capacity.max(1),
        };
        for shape in shapes {
            if !touches(&bound, &shape.shape.rect) {
                continue;
            }
            let idx = index.shapes.len();
            index.shapes.push(shape);
            index.insert(0, idx);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Every indexed shape whose rectangle strictly intersects `range`, in no
    /// particular order.
    pub fn query(&self, range: &Rect) -> Vec<&PaintedNode> {
        let mut found = Vec::new();
        if !touches(&self.nodes[0].boundary, range) {
            return found;
        }
        let mut stack = vec![0usize];
        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx];
            for &item in &node.items {
                let shape = &self.shapes[item];
                if shape.shape.rect.intersects(range) {
                    found.push(shape);
                }
            }
            if let Some(children) = node.children {
                for child in children {
                    if touches(&self.nodes[child].boundary, range) {
                        stack.push(child);
                    }
                }
            }
        }
        found
    }

    fn insert(&mut self, node_idx: usize, item: usize) {
        let rect = self.shapes[item].shape.rect;
        let mut current = node_idx;
        loop {
            match self.nodes[current].children {
                Some(children) => match self.child_containing(children, &rect) {
                    Some(child) => current = child,
                    None => {
                        self.nodes[current].items.push(item);
                        return;
                    }
                },
                None => {
                    self.nodes[current].items.push(item);
                    if self.nodes[current].items.len() > self.capacity
                        && self.nodes[current].depth < MAX_DEPTH
                    {
                        self.subdivide(current);
                    }
                    return;
                }
            }
        }
    }

    fn subdivide(&mut self, node_idx: usize) {
        let Rect {
            x,
            y,
            width,
            height,
        } = self.nodes[node_idx].boundary;
        let depth = self.nodes[node_idx].depth + 1;
        let w = width / 2.0;
        let h = height / 2.0;
        let quadrants = [
            Rect::new(x + w, y, w, h),
            Rect::new(x, y, w, h),
            Rect::new(x + w, y + h, w, h),
            Rect::new(x, y + h, w, h),
        ];
        let base = self.nodes.len();
        for quadrant in quadrants {
            self.nodes.push(QuadNode::new(quadrant, depth));
        }
        let children = [base, base + 1, base + 2, base + 3];
        self.nodes[node_idx].children = Some(children);

        let items = std::mem::take(&mut self.nodes[node_idx].items);
        for item in items {
            let rect = self.shapes[item].shape.rect;
            match self.child_containing(children, &rect) {
                Some(child) => self.nodes[child].items.push(item),
                None => self.nodes[node_idx].items.push(item),
            }
        }
    }

    fn child_containing(&self, children: [usize; 4], rect: &Rect) -> Option<usize> {
        children
            .into_iter()
            .find(|&child| self.nodes[child].boundary.contains(rect))
    }
}

/// Closed-interval overlap, used for pruning so shapes lying on a boundary are
/// still visited.
fn touches(a: &Rect, b: &Rect) -> bool {
    a.x <= b.right() && b.x <= a.right() && a.y <= b.bottom() && b.y <= a.bottom()
}
