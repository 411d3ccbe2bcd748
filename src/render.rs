use crate::config::RenderConfig;
use crate::geometry::Rect;
use crate::pipeline::Mark;
use crate::pipeline::colors::Color;
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

/// Renders the overlay as a standalone SVG the size of the viewport.
///
/// A hidden overlay keeps its root element but paints no marks.
pub fn render_svg(
    marks: &[Mark],
    viewport: &Rect,
    theme: &Theme,
    config: &RenderConfig,
    hidden: bool,
) -> String {
    let mut svg = String::new();
    let width = config.width.unwrap_or(viewport.width);
    let height = config.height.unwrap_or(viewport.height);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"{} {} {} {}\">",
        viewport.x, viewport.y, viewport.width, viewport.height
    ));
    if let Some(background) = config.background.as_deref() {
        svg.push_str(&format!(
            "<rect x=\"{}\" y=\"{}\" width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            viewport.x,
            viewport.y,
            escape_xml(background)
        ));
    }
    if hidden {
        svg.push_str("</svg>");
        return svg;
    }

    let editable: Vec<&Mark> = marks.iter().filter(|m| m.editable).collect();
    if !editable.is_empty() {
        svg.push_str("<defs>");
        let stripe = theme.editable_stripe_width;
        for mark in editable {
            svg.push_str(&format!(
                "<pattern id=\"som-hatch-{}\" patternUnits=\"userSpaceOnUse\" width=\"{}\" height=\"{}\" patternTransform=\"rotate(45)\"><rect width=\"{stripe}\" height=\"{}\" fill=\"{}\"/><rect x=\"{stripe}\" width=\"{stripe}\" height=\"{}\" fill=\"{}\"/></pattern>",
                mark.index,
                stripe * 2.0,
                stripe * 2.0,
                stripe * 2.0,
                rgba(&mark.color, theme.editable_stripe_opacity),
                stripe * 2.0,
                rgba(&mark.color, theme.box_opacity),
            ));
        }
        svg.push_str("</defs>");
    }

    for mark in marks {
        push_mark(&mut svg, mark, theme);
    }
    svg.push_str("</svg>");
    svg
}

fn push_mark(svg: &mut String, mark: &Mark, theme: &Theme) {
    let r = &mark.rect;
    svg.push_str(&format!("<g class=\"som-mark\" data-som=\"{}\">", mark.index));
    if mark.editable {
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"url(#som-hatch-{})\"/>",
            r.x, r.y, r.width, r.height, mark.index
        ));
        // outline sits outside the box
        let half = theme.outline_width / 2.0;
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"/>",
            r.x - half,
            r.y - half,
            r.width + theme.outline_width,
            r.height + theme.outline_width,
            rgba(&mark.color, theme.outline_opacity),
            theme.outline_width
        ));
    } else {
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
            r.x,
            r.y,
            r.width,
            r.height,
            rgba(&mark.color, theme.box_opacity)
        ));
    }

    let label = mark.label_rect();
    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
        label.x,
        label.y,
        label.width,
        label.height,
        rgba(&mark.color, theme.label_opacity)
    ));
    svg.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{}\" font-weight=\"{}\" fill=\"{}\">{}</text>",
        label.x + theme.label_padding_x,
        label.y + label.height / 2.0,
        escape_xml(&theme.font_family),
        theme.font_size,
        theme.font_weight,
        mark.label_color.to_hex(),
        mark.index
    ));
    svg.push_str("</g>");
}

fn rgba(color: &Color, alpha: f32) -> String {
    format!("rgba({}, {})", color.rgb_triple(), alpha.clamp(0.0, 1.0))
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .next()
        .map(|family| family.trim().trim_matches('"').to_string())
        .unwrap_or_else(|| "monospace".to_string());
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate {}x{} pixmap", size.width(), size.height()))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
