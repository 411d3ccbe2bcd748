//! Screen-space geometry shared by every pipeline stage.
//!
//! All coordinates are CSS pixels relative to the viewport's top-left corner.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_edges(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Strict (open-interval) intersection test.
    ///
    /// Touching edges do not intersect, and two zero-area rectangles never do,
    /// while a zero-area rectangle lying inside a non-empty one still does.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Inclusive containment: `other` lies entirely within `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.right() <= self.right()
            && other.y >= self.y
            && other.bottom() <= self.bottom()
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect::from_edges(left, top, right, bottom))
    }

    pub fn overlap_area(&self, other: &Rect) -> f32 {
        let w = (self.right().min(other.right()) - self.x.max(other.x)).max(0.0);
        let h = (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0);
        w * h
    }

    /// Fraction of this rectangle's area that lies inside `bound`.
    pub fn fraction_inside(&self, bound: &Rect) -> f32 {
        let area = self.area();
        if area <= 0.0 {
            return 0.0;
        }
        self.overlap_area(bound) / area
    }
}

/// Border radii in CSS order: top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CornerRadii(pub [f32; 4]);

impl CornerRadii {
    pub const ZERO: CornerRadii = CornerRadii([0.0; 4]);

    /// Expands a CSS `border-radius` shorthand of one to four values.
    pub fn from_css_values(values: &[f32]) -> Self {
        let v = |idx: usize| values.get(idx).copied().unwrap_or(0.0).max(0.0);
        match values.len() {
            0 => Self::ZERO,
            1 => Self([v(0); 4]),
            2 => Self([v(0), v(1), v(0), v(1)]),
            3 => Self([v(0), v(1), v(2), v(1)]),
            _ => Self([v(0), v(1), v(2), v(3)]),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|r| *r <= 0.0)
    }

    /// Scales radii down so adjacent corners never overlap on any side.
    pub fn clamped_to(&self, width: f32, height: f32) -> Self {
        let [tl, tr, br, bl] = self.0;
        let mut factor = 1.0f32;
        for (side, sum) in [
            (width, tl + tr),
            (height, tr + br),
            (width, br + bl),
            (height, bl + tl),
        ] {
            if sum > side && sum > 0.0 {
                factor = factor.min(side.max(0.0) / sum);
            }
        }
        Self([tl * factor, tr * factor, br * factor, bl * factor])
    }
}

/// Closed polygon whose points are fractions of the owning rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipPolygon {
    pub points: Vec<(f32, f32)>,
}

impl ClipPolygon {
    /// Maps normalized points into absolute coordinates inside `rect`.
    pub fn absolute_points(&self, rect: &Rect) -> impl Iterator<Item = (f32, f32)> + '_ {
        let rect = *rect;
        self.points
            .iter()
            .map(move |(fx, fy)| (rect.x + fx * rect.width, rect.y + fy * rect.height))
    }
}

/// Parsed `clip-path`: the supported polygon fragments plus a count of the
/// fragments that had to be skipped.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClipShape {
    pub polygons: Vec<ClipPolygon>,
    pub skipped: usize,
}

impl ClipShape {
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

static CLIP_FRAGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-zA-Z-]+)\s*\(([^()]*)\)").expect("valid clip fragment regex"));

/// Parses a CSS `clip-path` value for an element of the given size.
///
/// Returns `None` for `none`/empty values. Unsupported shape functions
/// (`circle`, `inset`, `url`, ...) and malformed polygons are skipped with a
/// warning rather than failing.
pub fn parse_clip_path(css: &str, width: f32, height: f32) -> Option<ClipShape> {
    let trimmed = css.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return None;
    }

    let mut shape = ClipShape::default();
    let mut matched = false;
    for caps in CLIP_FRAGMENT_RE.captures_iter(trimmed) {
        matched = true;
        let kind = caps[1].to_ascii_lowercase();
        if kind != "polygon" {
            tracing::warn!(kind = %kind, "unsupported clip-path shape, skipping fragment");
            shape.skipped += 1;
            continue;
        }
        match parse_polygon_args(&caps[2], width, height) {
            Some(polygon) => shape.polygons.push(polygon),
            None => {
                tracing::warn!(fragment = %&caps[0], "malformed clip-path polygon, skipping fragment");
                shape.skipped += 1;
            }
        }
    }
    if !matched {
        tracing::warn!(clip_path = %trimmed, "unrecognized clip-path value, skipping");
        shape.skipped += 1;
    }
    Some(shape)
}

fn parse_polygon_args(args: &str, width: f32, height: f32) -> Option<ClipPolygon> {
    let mut points = Vec::new();
    for (idx, part) in args.split(',').enumerate() {
        let part = part.trim();
        if idx == 0 && matches!(part, "nonzero" | "evenodd") {
            continue;
        }
        let mut coords = part.split_whitespace();
        let x = parse_clip_length(coords.next()?, width)?;
        let y = parse_clip_length(coords.next()?, height)?;
        if coords.next().is_some() {
            return None;
        }
        points.push((x, y));
    }
    if points.len() < 3 {
        return None;
    }
    Some(ClipPolygon { points })
}

/// Converts a polygon coordinate into a fraction of `extent`.
fn parse_clip_length(token: &str, extent: f32) -> Option<f32> {
    if let Some(pct) = token.strip_suffix('%') {
        return pct.parse::<f32>().ok().map(|v| v / 100.0);
    }
    if let Some(px) = token.strip_suffix("px") {
        let value = px.parse::<f32>().ok()?;
        return Some(if extent > 0.0 { value / extent } else { 0.0 });
    }
    match token.parse::<f32>() {
        Ok(value) if value == 0.0 => Some(0.0),
        _ => None,
    }
}

/// The painted outline of one element: its box, corner radii and optional clip.
///
/// Captured from the scene once per pass and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shape {
    pub rect: Rect,
    pub radii: CornerRadii,
    pub clip: Option<ClipShape>,
}

impl Shape {
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            rect,
            radii: CornerRadii::ZERO,
            clip: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_intersection_ignores_touching_edges() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Rect::new(9.0, 9.0, 5.0, 5.0)));
    }

    #[test]
    fn zero_area_rects_never_intersect_each_other() {
        let a = Rect::new(5.0, 5.0, 0.0, 0.0);
        let b = Rect::new(5.0, 5.0, 0.0, 0.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Rect::new(0.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn fraction_inside_viewport() {
        let viewport = Rect::new(0.0, 0.0, 100.0, 100.0);
        let half_out = Rect::new(80.0, 0.0, 40.0, 10.0);
        assert!((half_out.fraction_inside(&viewport) - 0.5).abs() < 1e-6);
        assert_eq!(Rect::new(0.0, 0.0, 0.0, 5.0).fraction_inside(&viewport), 0.0);
    }

    #[test]
    fn border_radius_shorthand_expansion() {
        assert_eq!(CornerRadii::from_css_values(&[4.0]).0, [4.0; 4]);
        assert_eq!(
            CornerRadii::from_css_values(&[1.0, 2.0]).0,
            [1.0, 2.0, 1.0, 2.0]
        );
        assert_eq!(
            CornerRadii::from_css_values(&[1.0, 2.0, 3.0]).0,
            [1.0, 2.0, 3.0, 2.0]
        );
    }

    #[test]
    fn radii_are_scaled_to_fit() {
        let radii = CornerRadii([50.0; 4]).clamped_to(40.0, 100.0);
        assert!((radii.0[0] - 20.0).abs() < 1e-6);
    }

    #[test]
    fn clip_path_polygon_in_percent_and_px() {
        let clip = parse_clip_path("polygon(0% 0%, 50px 0, 100% 100%)", 100.0, 40.0).unwrap();
        assert_eq!(clip.skipped, 0);
        assert_eq!(clip.polygons.len(), 1);
        assert_eq!(clip.polygons[0].points[1], (0.5, 0.0));
    }

    #[test]
    fn clip_path_unknown_kind_is_skipped() {
        let clip = parse_clip_path("circle(50% at 50% 50%)", 10.0, 10.0).unwrap();
        assert!(clip.is_empty());
        assert_eq!(clip.skipped, 1);
        assert!(parse_clip_path("none", 10.0, 10.0).is_none());
    }
}
