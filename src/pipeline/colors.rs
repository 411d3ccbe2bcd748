//! Box colors that stand out against what is underneath and around them.

use crate::geometry::Rect;
use crate::scene::ElementInfo;
use crate::theme::Theme;
use serde::{Serialize, Serializer};

// Golden-ratio hue step for index-derived colors.
const HUE_STEP: f32 = 0.618_034;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    fn from_unit(r: f32, g: f32, b: f32, a: u8) -> Self {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::rgba(channel(r), channel(g), channel(b), a)
    }

    /// Parses a CSS color. Returns `None` for anything unrecognized.
    pub fn parse_css(css: &str) -> Option<Color> {
        let css = css.trim().to_ascii_lowercase();
        if let Some(hex) = css.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        if let Some(args) = function_args(&css, &["rgba", "rgb"]) {
            let values = split_args(args);
            if values.len() < 3 {
                return None;
            }
            let channel = |token: &str| -> Option<u8> {
                let value = match token.strip_suffix('%') {
                    Some(pct) => pct.parse::<f32>().ok()? * 2.55,
                    None => token.parse::<f32>().ok()?,
                };
                Some(value.clamp(0.0, 255.0).round() as u8)
            };
            let alpha = match values.get(3) {
                Some(token) => parse_alpha(token)?,
                None => 255,
            };
            return Some(Self::rgba(
                channel(values[0])?,
                channel(values[1])?,
                channel(values[2])?,
                alpha,
            ));
        }
        if let Some(args) = function_args(&css, &["hsla", "hsl"]) {
            let values = split_args(args);
            if values.len() < 3 {
                return None;
            }
            let hue = values[0].trim_end_matches("deg").parse::<f32>().ok()? / 360.0;
            let pct = |token: &str| -> Option<f32> {
                Some(token.trim_end_matches('%').parse::<f32>().ok()? / 100.0)
            };
            let alpha = match values.get(3) {
                Some(token) => parse_alpha(token)?,
                None => 255,
            };
            let mut color = Self::from_hsl(hue.rem_euclid(1.0), pct(values[1])?, pct(values[2])?);
            color.a = alpha;
            return Some(color);
        }
        if css == "transparent" {
            return Some(Self::TRANSPARENT);
        }
        named_color(&css).and_then(|hex| Self::parse_hex(&hex[1..]))
    }

    fn parse_hex(hex: &str) -> Option<Color> {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let expanded: String = match hex.len() {
            3 | 4 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 | 8 => hex.to_string(),
            _ => return None,
        };
        let byte = |idx: usize| u8::from_str_radix(&expanded[idx..idx + 2], 16).ok();
        let alpha = if expanded.len() == 8 { byte(6)? } else { 255 };
        Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, alpha))
    }

    pub fn from_hsl(h: f32, s: f32, l: f32) -> Color {
        if s <= 0.0 {
            return Self::from_unit(l, l, l, 255);
        }
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        let hue_to_rgb = |t: f32| {
            let t = t.rem_euclid(1.0);
            if t < 1.0 / 6.0 {
                p + (q - p) * 6.0 * t
            } else if t < 0.5 {
                q
            } else if t < 2.0 / 3.0 {
                p + (q - p) * (2.0 / 3.0 - t) * 6.0
            } else {
                p
            }
        };
        Self::from_unit(
            hue_to_rgb(h + 1.0 / 3.0),
            hue_to_rgb(h),
            hue_to_rgb(h - 1.0 / 3.0),
            255,
        )
    }

    /// `(hue, saturation, lightness)`, each in `[0, 1]`.
    pub fn to_hsl(&self) -> (f32, f32, f32) {
        let r = self.r as f32 / 255.0;
        let g = self.g as f32 / 255.0;
        let b = self.b as f32 / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;
        if max == min {
            return (0.0, 0.0, l);
        }
        let d = max - min;
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        (h / 6.0, s, l)
    }

    /// WCAG relative luminance.
    pub fn luminance(&self) -> f32 {
        0.2126 * srgb_to_linear(self.r) + 0.7152 * srgb_to_linear(self.g) + 0.0722 * srgb_to_linear(self.b)
    }

    /// Scales the linear channels toward `target` luminance. Channels saturate
    /// at full intensity, so very dark saturated colors may fall short.
    pub fn with_luminance(&self, target: f32) -> Color {
        let current = self.luminance();
        if current <= 0.0 {
            let gray = linear_to_srgb(target);
            return Self::from_unit(gray, gray, gray, self.a);
        }
        let ratio = target / current;
        let scale = |c: u8| linear_to_srgb(srgb_to_linear(c) * ratio);
        Self::from_unit(scale(self.r), scale(self.g), scale(self.b), self.a)
    }

    pub fn saturation(&self) -> f32 {
        self.to_hsl().1
    }

    pub fn with_saturation(&self, saturation: f32) -> Color {
        let (h, _, l) = self.to_hsl();
        Self {
            a: self.a,
            ..Self::from_hsl(h, saturation, l)
        }
    }

    pub fn complementary(&self) -> Color {
        let (h, s, l) = self.to_hsl();
        Self {
            a: self.a,
            ..Self::from_hsl((h + 0.5) % 1.0, s, l)
        }
    }

    /// Black on light colors, white on dark ones.
    pub fn label_text_color(&self) -> Color {
        if self.luminance() > 0.5 {
            Self::BLACK
        } else {
            Self::WHITE
        }
    }

    pub fn to_hex(&self) -> String {
        if self.a < 255 {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        } else {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        }
    }

    /// `r, g, b` triple for use inside `rgba(...)`.
    pub fn rgb_triple(&self) -> String {
        format!("{}, {}, {}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.03928 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(v: f32) -> f32 {
    let v = v.clamp(0.0, 1.0);
    if v <= 0.03928 / 12.92 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

fn function_args<'a>(css: &'a str, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| {
        css.strip_prefix(name)?
            .trim_start()
            .strip_prefix('(')?
            .strip_suffix(')')
    })
}

// Accepts both the comma and the space/slash separated forms.
fn split_args(args: &str) -> Vec<&str> {
    args.split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect()
}

fn parse_alpha(token: &str) -> Option<u8> {
    let value = match token.strip_suffix('%') {
        Some(pct) => pct.parse::<f32>().ok()? / 100.0,
        None => token.parse::<f32>().ok()?,
    };
    Some((value.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn named_color(name: &str) -> Option<&'static str> {
    Some(match name {
        "black" => "#000000",
        "white" => "#ffffff",
        "red" => "#ff0000",
        "green" => "#008000",
        "lime" => "#00ff00",
        "blue" => "#0000ff",
        "yellow" => "#ffff00",
        "cyan" | "aqua" => "#00ffff",
        "magenta" | "fuchsia" => "#ff00ff",
        "gray" | "grey" => "#808080",
        "silver" => "#c0c0c0",
        "lightgray" | "lightgrey" => "#d3d3d3",
        "darkgray" | "darkgrey" => "#a9a9a9",
        "maroon" => "#800000",
        "olive" => "#808000",
        "navy" => "#000080",
        "purple" => "#800080",
        "teal" => "#008080",
        "orange" => "#ffa500",
        "pink" => "#ffc0cb",
        "brown" => "#a52a2a",
        "gold" => "#ffd700",
        "indigo" => "#4b0082",
        "violet" => "#ee82ee",
        "whitesmoke" => "#f5f5f5",
        "aliceblue" => "#f0f8ff",
        "ghostwhite" => "#f8f8ff",
        "dodgerblue" => "#1e90ff",
        "tomato" => "#ff6347",
        "crimson" => "#dc143c",
        _ => return None,
    })
}

/// Colors of earlier boxes with any corresponding corner within `radius` of
/// `rect`'s.
pub fn surrounding_colors(rect: &Rect, colored: &[(Rect, Color)], radius: f32) -> Vec<Color> {
    colored
        .iter()
        .filter(|(other, _)| {
            [
                (rect.x - other.x, rect.y - other.y),
                (rect.right() - other.right(), rect.y - other.y),
                (rect.x - other.x, rect.bottom() - other.bottom()),
                (rect.right() - other.right(), rect.bottom() - other.bottom()),
            ]
            .iter()
            .any(|(dx, dy)| dx.hypot(*dy) < radius)
        })
        .map(|(_, color)| *color)
        .collect()
}

/// Picks the box color for one mark.
pub trait ColorChooser {
    fn choose(&self, element: &ElementInfo, surrounding: &[Color], index: usize) -> Color;
}

/// Averages the complements of the element's background and nearby box
/// colors, then clamps luminance and saturation.
#[derive(Debug, Clone, Copy)]
pub struct ContrastColorChooser {
    pub max_luminance: f32,
    pub min_luminance: f32,
    pub min_saturation: f32,
}

impl ContrastColorChooser {
    pub fn from_theme(theme: &Theme) -> Self {
        Self {
            max_luminance: theme.max_luminance,
            min_luminance: theme.min_luminance,
            min_saturation: theme.min_saturation,
        }
    }

    pub fn best_contrast(&self, colors: &[Color], index: usize) -> Color {
        let complements: Vec<Color> = colors
            .iter()
            .filter(|color| color.a > 0)
            .map(Color::complementary)
            .collect();
        let mut color = if complements.is_empty() {
            Color::from_hsl((index as f32 * HUE_STEP) % 1.0, 0.65, 0.5)
        } else {
            average(&complements)
        };

        color = self.clamp_luminance(color);
        if color.saturation() < self.min_saturation {
            // Raising saturation moves luminance again.
            color = self.clamp_luminance(color.with_saturation(self.min_saturation));
        }
        Color { a: 255, ..color }
    }

    fn clamp_luminance(&self, color: Color) -> Color {
        let luminance = color.luminance();
        if luminance > self.max_luminance {
            color.with_luminance(self.max_luminance)
        } else if luminance < self.min_luminance {
            color.with_luminance(self.min_luminance)
        } else {
            color
        }
    }
}

impl Default for ContrastColorChooser {
    fn default() -> Self {
        Self::from_theme(&Theme::som_default())
    }
}

impl ColorChooser for ContrastColorChooser {
    fn choose(&self, element: &ElementInfo, surrounding: &[Color], index: usize) -> Color {
        let mut colors = Vec::with_capacity(surrounding.len() + 1);
        if let Some(background) = element.background_color.as_deref().and_then(Color::parse_css) {
            colors.push(background);
        }
        colors.extend_from_slice(surrounding);
        self.best_contrast(&colors, index)
    }
}

fn average(colors: &[Color]) -> Color {
    let n = colors.len().max(1) as f32;
    let mean = |channel: fn(&Color) -> u8| {
        (colors.iter().map(|c| channel(c) as f32).sum::<f32>() / n).round() as u8
    };
    Color::rgb(mean(|c| c.r), mean(|c| c.g), mean(|c| c.b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_css_forms() {
        assert_eq!(Color::parse_css("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse_css("#FF000080"), Some(Color::rgba(255, 0, 0, 128)));
        assert_eq!(Color::parse_css("rgb(0, 128, 255)"), Some(Color::rgb(0, 128, 255)));
        assert_eq!(
            Color::parse_css("rgba(0, 0, 0, 0)"),
            Some(Color::TRANSPARENT)
        );
        assert_eq!(Color::parse_css("rgb(10 20 30 / 50%)"), Some(Color::rgba(10, 20, 30, 128)));
        assert_eq!(Color::parse_css("hsl(0, 100%, 50%)"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(Color::parse_css("Navy"), Some(Color::rgb(0, 0, 128)));
        assert_eq!(Color::parse_css("transparent"), Some(Color::TRANSPARENT));
        assert_eq!(Color::parse_css("var(--accent)"), None);
        assert_eq!(Color::parse_css("#12"), None);
    }

    #[test]
    fn complementary_rotates_hue() {
        assert_eq!(Color::rgb(255, 0, 0).complementary(), Color::rgb(0, 255, 255));
    }

    #[test]
    fn label_text_follows_luminance() {
        assert_eq!(Color::rgb(250, 250, 200).label_text_color(), Color::BLACK);
        assert_eq!(Color::rgb(20, 20, 80).label_text_color(), Color::WHITE);
    }

    #[test]
    fn chosen_colors_respect_bounds() {
        let chooser = ContrastColorChooser::default();
        for input in [Color::WHITE, Color::BLACK, Color::rgb(200, 200, 200)] {
            let color = chooser.best_contrast(&[input], 0);
            assert!(color.luminance() <= chooser.max_luminance + 0.02, "{color:?}");
            assert!(color.luminance() >= chooser.min_luminance - 0.02, "{color:?}");
        }
        let gray = chooser.best_contrast(&[Color::rgb(128, 128, 128)], 0);
        assert!(gray.saturation() >= chooser.min_saturation - 0.01);
    }

    #[test]
    fn transparent_inputs_fall_back_to_index_color() {
        let chooser = ContrastColorChooser::default();
        let a = chooser.best_contrast(&[Color::TRANSPARENT], 3);
        let b = chooser.best_contrast(&[], 3);
        assert_eq!(a, b);
        assert_ne!(chooser.best_contrast(&[], 4), b);
    }

    #[test]
    fn surrounding_uses_corresponding_corners() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let near = (Rect::new(150.0, 0.0, 100.0, 100.0), Color::WHITE);
        let far = (Rect::new(500.0, 500.0, 100.0, 100.0), Color::BLACK);
        assert_eq!(surrounding_colors(&rect, &[near, far], 200.0), vec![Color::WHITE]);
    }
}
