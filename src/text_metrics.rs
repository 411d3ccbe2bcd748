//! Label text measurement.
//!
//! Widths come from the first matching system font (via fontdb) and its
//! horizontal advances (via ttf-parser). When no font can be found, or when
//! the theme asks for fast metrics, a monospace estimate is used instead.

use crate::theme::Theme;
use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

// Advance of a monospace glyph relative to the font size.
const MONOSPACE_ADVANCE: f32 = 0.6;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Measured width of `text`, or `None` when no usable font was found.
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str, weight: u16) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family, weight)
}

pub fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size.max(0.0) * MONOSPACE_ADVANCE
}

/// Width of a label's text (no padding) under `theme`.
pub fn label_text_width(text: &str, theme: &Theme) -> f32 {
    if theme.fast_text_metrics {
        return estimate_text_width(text, theme.font_size);
    }
    measure_text_width(text, theme.font_size, &theme.font_family, theme.font_weight)
        .unwrap_or_else(|| estimate_text_width(text, theme.font_size))
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    faces: HashMap<(String, u16), Option<FontMetrics>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            faces: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str, weight: u16) -> Option<f32> {
        let key = (font_family.trim().to_string(), weight);
        if !self.faces.contains_key(&key) {
            let metrics = self.load(font_family, weight);
            if metrics.is_none() {
                tracing::debug!(family = %font_family, weight, "no system font matched, estimating label widths");
            }
            self.faces.insert(key.clone(), metrics);
        }
        self.faces.get(&key)?.as_ref().map(|m| m.width(text, font_size))
    }

    fn load(&mut self, font_family: &str, weight: u16) -> Option<FontMetrics> {
        let names: Vec<String> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" | "system-ui" => Family::SansSerif,
                "monospace" | "ui-monospace" => Family::Monospace,
                _ => Family::Name(name.as_str()),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::Monospace);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight(weight),
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| FontMetrics::parse(data, index))
            .flatten()
    }
}

/// Advance widths of one font face, in font units.
struct FontMetrics {
    units_per_em: f32,
    advances: HashMap<char, u16>,
    fallback: u16,
}

impl FontMetrics {
    fn parse(data: &[u8], index: u32) -> Option<Self> {
        let face = Face::parse(data, index).ok()?;
        let units_per_em = face.units_per_em().max(1);
        let mut advances = HashMap::new();
        for ch in (0x20u8..0x7f).map(char::from) {
            if let Some(advance) = face
                .glyph_index(ch)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
            {
                advances.insert(ch, advance);
            }
        }
        let fallback = advances
            .get(&'0')
            .copied()
            .unwrap_or((units_per_em as f32 * MONOSPACE_ADVANCE) as u16);
        Some(Self {
            units_per_em: units_per_em as f32,
            advances,
            fallback,
        })
    }

    fn width(&self, text: &str, font_size: f32) -> f32 {
        let units: u32 = text
            .chars()
            .map(|ch| u32::from(*self.advances.get(&ch).unwrap_or(&self.fallback)))
            .sum();
        units as f32 * font_size / self.units_per_em
    }
}
