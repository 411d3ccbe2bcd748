use crate::pipeline::label_placement::DEFAULT_GRID_SIZE;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_PRIORITY_TAGS: [&str; 5] = ["a", "button", "input", "select", "textarea"];

/// Pipeline tunables, passed explicitly into every stage of a pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SomConfig {
    /// Minimum visible fraction, both for the viewport-intersection check
    /// and for the occlusion raster. A ratio exactly at the threshold passes.
    pub visibility_ratio: f32,
    /// Candidates wider or taller than this fraction of the viewport are
    /// rejected without rasterizing.
    pub max_cover_ratio: f32,
    /// A first hit smaller than `1 - disjoint_threshold` of its parent in
    /// both dimensions is a decoration and is dropped.
    pub disjoint_threshold: f32,
    /// Above this many sub-targets the parent itself is dropped.
    pub quantity_threshold: usize,
    /// Candidates observed between scheduler yields.
    pub batch_size: usize,
    /// Label spots per box edge, minus one.
    pub grid_size: usize,
    /// Width or height at or below this counts as zero size. The default
    /// rejects only elements with no rendered extent.
    pub min_element_size: f32,
    /// Neighborhood for the color chooser.
    pub surrounding_radius: f32,
    /// Intrinsically atomic tags, never decomposed.
    pub priority_tags: Vec<String>,
}

impl Default for SomConfig {
    fn default() -> Self {
        Self {
            visibility_ratio: 0.6,
            max_cover_ratio: 0.8,
            disjoint_threshold: 0.1,
            quantity_threshold: 3,
            batch_size: 10,
            grid_size: DEFAULT_GRID_SIZE,
            min_element_size: 0.0,
            surrounding_radius: 200.0,
            priority_tags: DEFAULT_PRIORITY_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Standalone rendering options; the scene viewport is used when unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub background: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            background: Some("#FFFFFF".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub som: SomConfig,
    pub theme: Theme,
    pub render: RenderConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SomConfigFile {
    visibility_ratio: Option<f32>,
    max_cover_ratio: Option<f32>,
    disjoint_threshold: Option<f32>,
    quantity_threshold: Option<usize>,
    batch_size: Option<usize>,
    grid_size: Option<usize>,
    min_element_size: Option<f32>,
    surrounding_radius: Option<f32>,
    priority_tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    font_weight: Option<u16>,
    line_height: Option<f32>,
    label_padding_x: Option<f32>,
    label_padding_y: Option<f32>,
    box_opacity: Option<f32>,
    label_opacity: Option<f32>,
    editable_stripe_opacity: Option<f32>,
    editable_stripe_width: Option<f32>,
    outline_opacity: Option<f32>,
    outline_width: Option<f32>,
    max_luminance: Option<f32>,
    min_luminance: Option<f32>,
    min_saturation: Option<f32>,
    fast_text_metrics: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    som: Option<SomConfigFile>,
    render: Option<RenderConfigFile>,
}

fn parse_config_file(contents: &str) -> anyhow::Result<ConfigFile> {
    match serde_json::from_str(contents) {
        Ok(parsed) => Ok(parsed),
        Err(json_err) => json5::from_str(contents)
            .map_err(|json5_err| anyhow::anyhow!("invalid config ({json_err}; as JSON5: {json5_err})")),
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed = parse_config_file(&contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "compact" => config.theme = Theme::compact(),
            "default" | "som" => config.theme = Theme::som_default(),
            other => tracing::warn!(theme = other, "unknown theme name, keeping default"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        let theme = &mut config.theme;
        if let Some(v) = vars.font_family {
            theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            theme.font_size = v;
        }
        if let Some(v) = vars.font_weight {
            theme.font_weight = v;
        }
        if let Some(v) = vars.line_height {
            theme.line_height = v;
        }
        if let Some(v) = vars.label_padding_x {
            theme.label_padding_x = v;
        }
        if let Some(v) = vars.label_padding_y {
            theme.label_padding_y = v;
        }
        if let Some(v) = vars.box_opacity {
            theme.box_opacity = v;
        }
        if let Some(v) = vars.label_opacity {
            theme.label_opacity = v;
        }
        if let Some(v) = vars.editable_stripe_opacity {
            theme.editable_stripe_opacity = v;
        }
        if let Some(v) = vars.editable_stripe_width {
            theme.editable_stripe_width = v;
        }
        if let Some(v) = vars.outline_opacity {
            theme.outline_opacity = v;
        }
        if let Some(v) = vars.outline_width {
            theme.outline_width = v;
        }
        if let Some(v) = vars.max_luminance {
            theme.max_luminance = v;
        }
        if let Some(v) = vars.min_luminance {
            theme.min_luminance = v;
        }
        if let Some(v) = vars.min_saturation {
            theme.min_saturation = v;
        }
        if let Some(v) = vars.fast_text_metrics {
            theme.fast_text_metrics = v;
        }
    }

    if let Some(som) = parsed.som {
        let target = &mut config.som;
        if let Some(v) = som.visibility_ratio {
            target.visibility_ratio = v;
        }
        if let Some(v) = som.max_cover_ratio {
            target.max_cover_ratio = v;
        }
        if let Some(v) = som.disjoint_threshold {
            target.disjoint_threshold = v;
        }
        if let Some(v) = som.quantity_threshold {
            target.quantity_threshold = v;
        }
        if let Some(v) = som.batch_size {
            target.batch_size = v.max(1);
        }
        if let Some(v) = som.grid_size {
            target.grid_size = v.max(1);
        }
        if let Some(v) = som.min_element_size {
            target.min_element_size = v;
        }
        if let Some(v) = som.surrounding_radius {
            target.surrounding_radius = v;
        }
        if let Some(v) = som.priority_tags {
            target.priority_tags = v.into_iter().map(|t| t.to_ascii_lowercase()).collect();
        }
    }

    if let Some(render) = parsed.render {
        if render.width.is_some() {
            config.render.width = render.width;
        }
        if render.height.is_some() {
            config.render.height = render.height;
        }
        if render.background.is_some() {
            config.render.background = render.background;
        }
    }

    Ok(config)
}
