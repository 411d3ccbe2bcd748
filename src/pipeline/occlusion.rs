//! Pixel-level occlusion test.
//!
//! The candidate's silhouette is painted in a foreground sentinel onto a
//! black buffer covering its on-screen part, every shape painting above it is
//! then painted back in black, and the surviving foreground pixels are
//! counted. Painting is done without anti-aliasing so a pixel is either fully
//! covered or not at all.

use super::spatial_index::SpatialIndex;
use super::stacking::{ContainmentIndex, StackingKey, paints_above};
use crate::error::{Result, SomError};
use crate::geometry::{ClipPolygon, CornerRadii, Rect, Shape};
use crate::scene::{NodeId, PaintedNode};
use resvg::tiny_skia::{self, FillRule, Paint, PathBuilder, Pixmap, Transform};
use std::collections::HashSet;

// Magic number for quarter-circle cubic approximation: 4/3 * tan(pi/8)
const KAPPA: f32 = 0.552_284_8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ink {
    Foreground,
    Background,
}

impl Ink {
    fn paint(self) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.anti_alias = false;
        match self {
            Ink::Foreground => paint.set_color_rgba8(255, 255, 255, 255),
            Ink::Background => paint.set_color_rgba8(0, 0, 0, 255),
        }
        paint
    }
}

/// Measures what fraction of a candidate's silhouette survives the shapes
/// painted over it.
pub struct OcclusionRasterizer<'a> {
    index: &'a SpatialIndex,
    containment: &'a ContainmentIndex,
    stacking: &'a [StackingKey],
    viewport: Rect,
}

impl<'a> OcclusionRasterizer<'a> {
    pub fn new(
        index: &'a SpatialIndex,
        containment: &'a ContainmentIndex,
        stacking: &'a [StackingKey],
        viewport: Rect,
    ) -> Self {
        Self {
            index,
            containment,
            stacking,
            viewport,
        }
    }

    /// Visible ratio in `[0, 1]`; degenerate and off-screen shapes yield 0.
    ///
    /// Fails only when no raster buffer can be allocated.
    pub fn visible_ratio(&self, node: NodeId, shape: &Shape) -> Result<f32> {
        let Some(visible) = shape.rect.intersection(&self.viewport) else {
            return Ok(0.0);
        };
        let origin_x = visible.x.floor();
        let origin_y = visible.y.floor();
        let width = (visible.right().ceil() - origin_x).max(0.0) as u32;
        let height = (visible.bottom().ceil() - origin_y).max(0.0) as u32;
        if width == 0 || height == 0 {
            return Ok(0.0);
        }

        let mut pixmap =
            Pixmap::new(width, height).ok_or(SomError::RasterUnavailable { width, height })?;
        pixmap.fill(tiny_skia::Color::BLACK);
        let transform = Transform::from_translate(-origin_x, -origin_y);

        paint_silhouette(&mut pixmap, shape, Ink::Foreground, transform);
        let total = count_foreground(&pixmap);
        if total == 0 {
            return Ok(0.0);
        }

        let occluders = self.occluders(node, &shape.rect);
        for occluder in &occluders {
            paint_silhouette(&mut pixmap, &occluder.shape, Ink::Background, transform);
        }

        let surviving = count_foreground(&pixmap);
        tracing::trace!(
            node = node.0,
            total,
            surviving,
            occluders = occluders.len(),
            "occlusion measured"
        );
        Ok(surviving as f32 / total as f32)
    }

    /// Indexed shapes intersecting `rect` that paint above `node`, de-duplicated.
    pub fn occluders(&self, node: NodeId, rect: &Rect) -> Vec<&'a PaintedNode> {
        let reference = &self.stacking[node.0];
        let mut seen = HashSet::new();
        self.index
            .query(rect)
            .into_iter()
            .filter(|painted| painted.node != node)
            .filter(|painted| seen.insert(painted.node))
            .filter(|painted| !self.containment.is_related(painted.node, node))
            .filter(|painted| paints_above(&self.stacking[painted.node.0], reference, self.containment))
            .collect()
    }
}

/// Paints a shape's outline: clip polygons when present, else the rounded or
/// plain box.
///
/// A clip whose every fragment was unsupported paints nothing for an
/// occluder, while a candidate falls back to its unclipped box.
fn paint_silhouette(pixmap: &mut Pixmap, shape: &Shape, ink: Ink, transform: Transform) {
    let paint = ink.paint();
    if let Some(clip) = &shape.clip {
        if !clip.is_empty() {
            for polygon in &clip.polygons {
                if let Some(path) = polygon_path(polygon, &shape.rect) {
                    pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
                }
            }
            return;
        }
        if ink == Ink::Background {
            return;
        }
    }

    if !shape.radii.is_zero() {
        if let Some(path) = rounded_rect_path(&shape.rect, &shape.radii) {
            pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
        }
        return;
    }

    if let Some(rect) =
        tiny_skia::Rect::from_xywh(shape.rect.x, shape.rect.y, shape.rect.width, shape.rect.height)
    {
        pixmap.fill_rect(rect, &paint, transform, None);
    }
}

fn polygon_path(polygon: &ClipPolygon, rect: &Rect) -> Option<tiny_skia::Path> {
    let mut points = polygon.absolute_points(rect);
    let (x0, y0) = points.next()?;
    let mut pb = PathBuilder::new();
    pb.move_to(x0, y0);
    for (x, y) in points {
        pb.line_to(x, y);
    }
    pb.close();
    pb.finish()
}

fn rounded_rect_path(rect: &Rect, radii: &CornerRadii) -> Option<tiny_skia::Path> {
    let [tl, tr, br, bl] = radii.clamped_to(rect.width, rect.height).0;
    let (x, y, right, bottom) = (rect.x, rect.y, rect.right(), rect.bottom());

    let mut pb = PathBuilder::new();
    pb.move_to(x + tl, y);
    pb.line_to(right - tr, y);
    if tr > 0.0 {
        pb.cubic_to(right - tr + tr * KAPPA, y, right, y + tr - tr * KAPPA, right, y + tr);
    }
    pb.line_to(right, bottom - br);
    if br > 0.0 {
        pb.cubic_to(
            right,
            bottom - br + br * KAPPA,
            right - br + br * KAPPA,
            bottom,
            right - br,
            bottom,
        );
    }
    pb.line_to(x + bl, bottom);
    if bl > 0.0 {
        pb.cubic_to(x + bl - bl * KAPPA, bottom, x, bottom - bl + bl * KAPPA, x, bottom - bl);
    }
    pb.line_to(x, y + tl);
    if tl > 0.0 {
        pb.cubic_to(x, y + tl - tl * KAPPA, x + tl - tl * KAPPA, y, x + tl, y);
    }
    pb.close();
    pb.finish()
}

fn count_foreground(pixmap: &Pixmap) -> usize {
    pixmap.pixels().iter().filter(|px| px.green() >= 128).count()
}
