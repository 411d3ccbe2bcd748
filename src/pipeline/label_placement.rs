// Label placement for mark indices.
// Each label tries a fixed grid of spots hugging the four edges of its box
// and takes the one overlapping the least with labels already placed and
// with every box.

use crate::geometry::Rect;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GRID_SIZE: usize = 10;

/// Absolute top-left corner of a label.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelPosition {
    pub top: f32,
    pub left: f32,
}

impl LabelPosition {
    pub fn rect(&self, width: f32, height: f32) -> Rect {
        Rect::new(self.left, self.top, width, height)
    }
}

/// Candidate spots in generation order: for each grid step, top edge, bottom
/// edge, left edge, right edge.
pub fn candidate_positions(
    mark_box: &Rect,
    label_w: f32,
    label_h: f32,
    grid_size: usize,
) -> Vec<LabelPosition> {
    let grid = grid_size.max(1) as f32;
    let step_x = mark_box.width / grid;
    let step_y = mark_box.height / grid;
    let mut positions = Vec::with_capacity(4 * (grid_size + 1));
    for i in 0..=grid_size.max(1) {
        let i = i as f32;
        let along_x = mark_box.x + step_x * i - label_w / 2.0;
        let along_y = mark_box.y + step_y * i - label_h / 2.0;
        positions.push(LabelPosition {
            top: mark_box.y - label_h,
            left: along_x,
        });
        positions.push(LabelPosition {
            top: mark_box.bottom(),
            left: along_x,
        });
        positions.push(LabelPosition {
            top: along_y,
            left: mark_box.x - label_w,
        });
        positions.push(LabelPosition {
            top: along_y,
            left: mark_box.right(),
        });
    }
    positions
}

pub struct LabelPlacer<'a> {
    viewport: Rect,
    grid_size: usize,
    boxes: &'a [Rect],
    placed: Vec<Rect>,
}

impl<'a> LabelPlacer<'a> {
    /// `boxes` are every mark box of the pass; they all count as clutter.
    pub fn new(viewport: Rect, grid_size: usize, boxes: &'a [Rect]) -> Self {
        Self {
            viewport,
            grid_size,
            boxes,
            placed: Vec::with_capacity(boxes.len()),
        }
    }

    pub fn placed(&self) -> &[Rect] {
        &self.placed
    }

    /// Overlap score of one spot; `f32::INFINITY` when the label would leave
    /// the viewport.
    pub fn score(&self, mark_box: &Rect, label: &Rect) -> f32 {
        if !self.viewport.contains(label) {
            return f32::INFINITY;
        }
        // A box enclosing this one is exempt; earlier labels never are.
        let boxes = self
            .boxes
            .iter()
            .filter(|existing| !existing.contains(mark_box));
        self.placed
            .iter()
            .chain(boxes)
            .map(|existing| label.overlap_area(existing))
            .sum()
    }

    /// Chooses and records the best spot for `mark_box`'s label. The first
    /// spot wins ties; when every spot is out of bounds the first is used.
    pub fn place(&mut self, mark_box: &Rect, label_w: f32, label_h: f32) -> LabelPosition {
        let positions = candidate_positions(mark_box, label_w, label_h, self.grid_size);
        let mut best = 0;
        let mut best_score = f32::INFINITY;
        for (idx, position) in positions.iter().enumerate() {
            let score = self.score(mark_box, &position.rect(label_w, label_h));
            if score < best_score {
                best = idx;
                best_score = score;
            }
            if best_score == 0.0 {
                break;
            }
        }
        let chosen = positions[best];
        self.placed.push(chosen.rect(label_w, label_h));
        chosen
    }
}

/// Places one label per box, in order. `sizes[i]` is the label size for
/// `boxes[i]`.
pub fn place_labels(
    boxes: &[Rect],
    sizes: &[(f32, f32)],
    viewport: Rect,
    grid_size: usize,
) -> Vec<LabelPosition> {
    let mut placer = LabelPlacer::new(viewport, grid_size, boxes);
    boxes
        .iter()
        .zip(sizes)
        .map(|(mark_box, (w, h))| placer.place(mark_box, *w, *h))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Rect = Rect::new(0.0, 0.0, 800.0, 600.0);

    #[test]
    fn grid_has_four_spots_per_step() {
        let positions = candidate_positions(&Rect::new(100.0, 100.0, 100.0, 50.0), 20.0, 10.0, 10);
        assert_eq!(positions.len(), 44);
        assert_eq!(positions[0], LabelPosition { top: 90.0, left: 90.0 });
        assert_eq!(positions[1], LabelPosition { top: 150.0, left: 90.0 });
        assert_eq!(positions[2], LabelPosition { top: 95.0, left: 80.0 });
        assert_eq!(positions[3], LabelPosition { top: 95.0, left: 200.0 });
    }

    #[test]
    fn first_free_spot_wins() {
        let boxes = [Rect::new(100.0, 100.0, 100.0, 50.0)];
        let labels = place_labels(&boxes, &[(20.0, 10.0)], VIEWPORT, 10);
        assert_eq!(labels[0], LabelPosition { top: 90.0, left: 90.0 });
    }

    #[test]
    fn off_screen_spots_are_avoided() {
        // The top edge is above the viewport, so the label must go elsewhere.
        let boxes = [Rect::new(0.0, 0.0, 100.0, 50.0)];
        let labels = place_labels(&boxes, &[(20.0, 10.0)], VIEWPORT, 10);
        let rect = labels[0].rect(20.0, 10.0);
        assert!(VIEWPORT.contains(&rect));
        assert_eq!(labels[0], LabelPosition { top: 50.0, left: 0.0 });
    }

    #[test]
    fn all_out_of_bounds_falls_back_to_first_spot() {
        let boxes = [Rect::new(0.0, 0.0, 800.0, 600.0)];
        let labels = place_labels(&boxes, &[(20.0, 10.0)], VIEWPORT, 10);
        assert_eq!(labels[0], LabelPosition { top: -10.0, left: -10.0 });
    }

    #[test]
    fn later_labels_avoid_earlier_ones() {
        let boxes = [
            Rect::new(100.0, 100.0, 100.0, 50.0),
            Rect::new(100.0, 100.0, 100.0, 50.0),
        ];
        let sizes = [(20.0, 10.0), (20.0, 10.0)];
        let labels = place_labels(&boxes, &sizes, VIEWPORT, 10);
        let first = labels[0].rect(20.0, 10.0);
        let second = labels[1].rect(20.0, 10.0);
        assert_eq!(first.overlap_area(&second), 0.0);
    }

    #[test]
    fn enclosing_box_is_not_clutter() {
        let boxes = [
            Rect::new(50.0, 50.0, 300.0, 300.0),
            Rect::new(100.0, 100.0, 100.0, 50.0),
        ];
        let mut placer = LabelPlacer::new(VIEWPORT, 10, &boxes);
        let label = Rect::new(90.0, 90.0, 20.0, 10.0);
        assert_eq!(placer.score(&boxes[1], &label), 0.0);
        // From the outer box's point of view the inner box is clutter.
        assert!(placer.score(&boxes[0], &Rect::new(95.0, 95.0, 20.0, 10.0)) > 0.0);
        placer.place(&boxes[0], 20.0, 10.0);
        assert_eq!(placer.placed().len(), 1);
    }

    #[test]
    fn earlier_label_enclosing_the_box_still_counts() {
        let boxes = [Rect::new(100.0, 100.0, 4.0, 4.0)];
        let mut placer = LabelPlacer::new(VIEWPORT, 10, &boxes);
        placer.placed.push(Rect::new(90.0, 90.0, 30.0, 30.0));
        let label = Rect::new(95.0, 95.0, 10.0, 10.0);
        assert_eq!(placer.score(&boxes[0], &label), 100.0);
    }
}
