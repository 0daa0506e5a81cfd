//! Mermaid engine backed by `mermaid-rs-renderer`, plus SVG rasterization.

use std::panic;
use std::sync::Arc;

use anyhow::Result;
use image::DynamicImage;
use mermaid_rs_renderer::config::LayoutConfig;
use mermaid_rs_renderer::layout::compute_layout;
use mermaid_rs_renderer::parser::parse_mermaid;
use mermaid_rs_renderer::render::render_svg;
use mermaid_rs_renderer::theme::Theme as Palette;
use resvg::usvg::fontdb;

use crate::state::Theme;

use super::Artifact;
use super::engine::{EngineConfig, RenderEngine, RenderError};
use super::syntax::check;

/// Renders mermaid source to SVG.
pub struct MermaidEngine {
    config: EngineConfig,
    palette: Palette,
}

impl MermaidEngine {
    pub fn new() -> Self {
        let config = EngineConfig::for_theme(Theme::Default);
        Self {
            palette: palette_for(config.theme),
            config,
        }
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Default for MermaidEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MermaidEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MermaidEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RenderEngine for MermaidEngine {
    fn initialize(&mut self, config: &EngineConfig) {
        self.config = *config;
        self.palette = palette_for(config.theme);
    }

    fn validate(&mut self, source: &str) -> Result<(), RenderError> {
        let outline = check(source).map_err(|err| RenderError::Syntax(err.to_string()))?;
        let owned = source.to_string();
        match catch_renderer_panic(move || parse_mermaid(&owned).map(|p| p.graph.nodes.is_empty())) {
            Ok(Ok(true)) if outline.expects_nodes() => Err(RenderError::Syntax(format!(
                "Parse error on line {}: no diagram elements found",
                outline.header_line
            ))),
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(RenderError::Syntax(err.to_string())),
            Err(panic_msg) => Err(RenderError::Syntax(panic_msg)),
        }
    }

    fn draw(&mut self, target_id: &str, source: &str) -> Result<Artifact, RenderError> {
        let owned = source.to_string();
        let palette = self.palette.clone();
        let result = catch_renderer_panic(move || -> Result<String> {
            let parsed = parse_mermaid(&owned)?;
            let layout_config = LayoutConfig::default();
            let layout = compute_layout(&parsed.graph, &palette, &layout_config);
            Ok(render_svg(&layout, &palette, &layout_config))
        });
        match result {
            Ok(Ok(svg)) => Ok(Artifact::new(
                target_id,
                tag_svg_id(&fix_svg_font_families(&svg), target_id),
            )),
            Ok(Err(err)) => Err(RenderError::Draw(err.to_string())),
            Err(panic_msg) => Err(RenderError::Draw(panic_msg)),
        }
    }
}

/// Run renderer code, turning a panic into an error message.
///
/// The default hook is swapped out for the duration so panic output does
/// not land on the terminal while the TUI owns it.
fn catch_renderer_panic<T>(f: impl FnOnce() -> T + panic::UnwindSafe) -> Result<T, String> {
    let prev_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let result = panic::catch_unwind(f);
    panic::set_hook(prev_hook);
    result.map_err(|payload| {
        payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "renderer panicked".to_string())
    })
}

fn palette_for(theme: Theme) -> Palette {
    let modern = Palette::modern();
    let colors = match theme {
        Theme::Base | Theme::Null => return modern,
        Theme::Default => ["#ffffff", "#ECECFF", "#333333", "#9370DB", "#333333", "#ffffde", "#ECECFF"],
        Theme::Dark => ["#1e1e1e", "#1f2020", "#cccccc", "#81B1DB", "#d3d3d3", "#3a3a3a", "#2b2b2b"],
        Theme::Forest => ["#ffffff", "#cde498", "#000000", "#13540c", "#008000", "#cdffb2", "#eeeeee"],
        Theme::Neutral => ["#ffffff", "#eeeeee", "#333333", "#999999", "#666666", "#fafafa", "#e6e6e6"],
    };
    let [background, primary, text, border, line, secondary, tertiary] = colors.map(String::from);
    Palette {
        background,
        primary_color: primary,
        primary_text_color: text.clone(),
        primary_border_color: border,
        line_color: line,
        secondary_color: secondary,
        tertiary_color: tertiary,
        text_color: text,
        ..modern
    }
}

/// Give the root `<svg>` element the draw target id so exports can find it.
fn tag_svg_id(svg: &str, target_id: &str) -> String {
    let Some(start) = svg.find("<svg") else {
        return svg.to_string();
    };
    let head_end = svg[start..].find('>').map_or(svg.len(), |i| start + i);
    if svg[start..head_end].contains(" id=\"") {
        return svg.to_string();
    }
    let insert_at = start + "<svg".len();
    format!("{} id=\"{target_id}\"{}", &svg[..insert_at], &svg[insert_at..])
}

/// Fix unescaped double quotes inside font-family attributes.
///
/// The renderer emits values like `font-family="Inter, "Segoe UI", sans-serif"`;
/// the inner quotes break XML parsing, so they become single quotes.
fn fix_svg_font_families(svg: &str) -> String {
    const MARKER: &str = "font-family=\"";
    let mut result = String::with_capacity(svg.len());
    let mut rest = svg;

    while let Some(pos) = rest.find(MARKER) {
        result.push_str(&rest[..pos + MARKER.len()]);
        rest = &rest[pos + MARKER.len()..];

        let mut value = String::new();
        let mut end_offset = rest.len();
        for (i, ch) in rest.char_indices() {
            if ch != '"' {
                value.push(ch);
                continue;
            }
            let after = rest.get(i + 1..i + 2).unwrap_or("");
            let closing = after.is_empty()
                || after.starts_with('>')
                || after.starts_with(' ')
                || after.starts_with('/');
            if closing {
                result.push_str(&value.replace('"', "'"));
                result.push('"');
                end_offset = i + 1;
                break;
            }
            value.push('"');
        }
        rest = &rest[end_offset..];
    }
    result.push_str(rest);
    result
}

/// Rasterize an SVG string so its width matches `target_width_px`.
///
/// # Errors
///
/// Returns an error if the SVG cannot be parsed or the pixmap cannot be
/// allocated.
pub fn rasterize_svg(svg: &str, target_width_px: u32) -> Result<DynamicImage> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    let opts = resvg::usvg::Options {
        fontdb: Arc::new(db),
        ..Default::default()
    };

    let tree = resvg::usvg::Tree::from_str(svg, &opts)?;
    let size = tree.size();

    #[allow(clippy::cast_precision_loss)]
    let scale = target_width_px.max(1) as f32 / size.width();

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let width = (size.width() * scale).ceil() as u32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let height = (size.height() * scale).ceil() as u32;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width.max(1), height.max(1))
        .ok_or_else(|| anyhow::anyhow!("failed to create pixmap {width}x{height}"))?;

    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    let (w, h) = (pixmap.width(), pixmap.height());
    let rgba = pixmap.data().to_vec();
    let img_buf = image::RgbaImage::from_raw(w, h, rgba)
        .ok_or_else(|| anyhow::anyhow!("failed to create image from pixmap data"))?;

    Ok(DynamicImage::ImageRgba8(img_buf))
}

/// Natural width of an SVG in pixels.
///
/// # Errors
///
/// Returns an error if the SVG cannot be parsed.
pub fn svg_width(svg: &str) -> Result<f32> {
    let tree = resvg::usvg::Tree::from_str(svg, &resvg::usvg::Options::default())?;
    Ok(tree.size().width())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::engine::DIAGRAM_TARGET_ID;

    #[test]
    fn test_fix_svg_font_families_replaces_inner_quotes() {
        let input = r#"<text font-family="Inter, "Segoe UI", sans-serif" font-size="14">"#;
        assert_eq!(
            fix_svg_font_families(input),
            r#"<text font-family="Inter, 'Segoe UI', sans-serif" font-size="14">"#
        );
    }

    #[test]
    fn test_fix_svg_font_families_no_op_when_clean() {
        let input = r#"<text font-family="Inter, sans-serif" font-size="14">"#;
        assert_eq!(fix_svg_font_families(input), input);
    }

    #[test]
    fn test_tag_svg_id_inserts_once() {
        let tagged = tag_svg_id(r#"<svg width="10"><g/></svg>"#, "diagram");
        assert_eq!(tagged, r#"<svg id="diagram" width="10"><g/></svg>"#);
        assert_eq!(tag_svg_id(&tagged, "other"), tagged);
    }

    #[test]
    fn test_validate_rejects_garbage() {
        let mut engine = MermaidEngine::new();
        for source in [
            "sequenceDiagram with error",
            "not a diagram at all",
            "classDiagram\n class {",
            "graph TD\n  A[Start --> B",
        ] {
            let result = engine.validate(source);
            assert!(
                matches!(result, Err(RenderError::Syntax(_))),
                "{source:?} gave {result:?}"
            );
        }
    }

    #[test]
    fn test_validate_reports_line() {
        let mut engine = MermaidEngine::new();
        let err = engine.validate("sequenceDiagram with error").unwrap_err();
        assert!(err.message().starts_with("Parse error on line 1:"));
    }

    #[test]
    fn test_validate_accepts_builtin_templates() {
        let library = crate::templates::TemplateLibrary::builtin();
        let mut engine = MermaidEngine::new();
        for template in library.templates() {
            let code = library.load(template.file_name());
            assert_eq!(engine.validate(&code), Ok(()), "{}", template.file_name());
        }
    }

    #[test]
    fn test_draw_flowchart_produces_tagged_svg() {
        let mut engine = MermaidEngine::new();
        let source = "flowchart LR\n    A[Start] --> B[End]";
        engine.validate(source).unwrap();
        let artifact = engine.draw(DIAGRAM_TARGET_ID, source).unwrap();
        assert!(artifact.svg().contains("<svg"));
        assert!(artifact.svg().contains("id=\"diagram\""));
    }

    #[test]
    fn test_theme_changes_palette() {
        let mut engine = MermaidEngine::new();
        let source = "flowchart LR\n    A --> B";
        let light = engine.draw(DIAGRAM_TARGET_ID, source).unwrap();
        engine.initialize(&EngineConfig::for_theme(Theme::Dark));
        let dark = engine.draw(DIAGRAM_TARGET_ID, source).unwrap();
        assert_eq!(engine.config().theme, Theme::Dark);
        assert_ne!(light.svg(), dark.svg());
    }

    #[test]
    fn test_rasterize_matches_target_width() {
        let mut engine = MermaidEngine::new();
        let artifact = engine
            .draw(
                DIAGRAM_TARGET_ID,
                "sequenceDiagram\n    Alice->>Bob: Hello\n    Bob-->>Alice: Hi",
            )
            .unwrap();
        let img = rasterize_svg(artifact.svg(), 800).unwrap();
        assert_eq!(img.width(), 800);
        assert!(img.height() > 0);
    }
}
