use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub font_weight: u16,
    pub line_height: f32,
    pub label_padding_x: f32,
    pub label_padding_y: f32,
    pub box_opacity: f32,
    pub label_opacity: f32,
    pub editable_stripe_opacity: f32,
    pub editable_stripe_width: f32,
    pub outline_opacity: f32,
    pub outline_width: f32,
    pub max_luminance: f32,
    pub min_luminance: f32,
    pub min_saturation: f32,
    /// Estimate label widths instead of measuring with system fonts.
    pub fast_text_metrics: bool,
}

impl Theme {
    pub fn som_default() -> Self {
        Self {
            font_family: "\"Courier New\", Courier, monospace".to_string(),
            font_size: 16.0,
            font_weight: 700,
            line_height: 19.2,
            label_padding_x: 3.0,
            label_padding_y: 0.0,
            box_opacity: 0.45,
            label_opacity: 0.7,
            editable_stripe_opacity: 0.15,
            editable_stripe_width: 10.0,
            outline_opacity: 0.7,
            outline_width: 2.0,
            max_luminance: 0.7,
            min_luminance: 0.25,
            min_saturation: 0.3,
            fast_text_metrics: false,
        }
    }

    pub fn compact() -> Self {
        Self {
            font_size: 12.0,
            line_height: 14.4,
            label_padding_x: 2.0,
            box_opacity: 0.35,
            ..Self::som_default()
        }
    }

    /// Size of the label box for `text`, padding included.
    pub fn label_size(&self, text: &str) -> (f32, f32) {
        let text_width = crate::text_metrics::label_text_width(text, self);
        (
            text_width + self.label_padding_x * 2.0,
            self.line_height + self.label_padding_y * 2.0,
        )
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::som_default()
    }
}
