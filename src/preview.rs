//! Terminal image output for the diagram preview.
//!
//! Graphics protocol detection (Kitty, Sixel, iTerm2, half-block fallback)
//! plus a one-entry cache of the rasterized diagram, keyed by the SVG and
//! the pane width so redraws do not re-rasterize.

use std::hash::{DefaultHasher, Hash, Hasher};
#[cfg(unix)]
use std::time::Duration;

use ratatui_image::picker::Picker;
#[cfg(unix)]
use ratatui_image::picker::cap_parser::QueryStdioOptions;
use ratatui_image::protocol::StatefulProtocol;

use crate::render::{Artifact, rasterize_svg};

#[cfg(unix)]
const PICKER_QUERY_TIMEOUT_MS: u64 = 250;

/// Fallback cell width in pixels when the picker cannot tell.
const DEFAULT_FONT_WIDTH_PX: u16 = 8;

/// Detect the terminal's graphics support.
///
/// Must run before the terminal enters raw mode, since it queries stdio.
pub fn create_picker(force_half_cell: bool) -> Option<Picker> {
    if force_half_cell {
        crate::perf::log_event("preview.create_picker", "forced protocol=Halfblocks");
        return Some(Picker::halfblocks());
    }

    // The stdio query can strand a reader thread on Windows consoles.
    #[cfg(not(unix))]
    {
        crate::perf::log_event("preview.create_picker", "windows protocol=Halfblocks");
        return Some(Picker::halfblocks());
    }

    #[cfg(unix)]
    {
        let mut options = QueryStdioOptions::default();
        options.timeout = Duration::from_millis(PICKER_QUERY_TIMEOUT_MS);
        let picker = match Picker::from_query_stdio_with_options(options) {
            Ok(picker) => picker,
            Err(err) => {
                tracing::warn!(%err, "terminal graphics query failed, using half blocks");
                Picker::halfblocks()
            }
        };
        crate::perf::log_event(
            "preview.create_picker",
            format!(
                "term={} protocol={:?}",
                std::env::var("TERM").unwrap_or_else(|_| "<unset>".to_string()),
                picker.protocol_type()
            ),
        );
        Some(picker)
    }
}

fn cache_key(svg: &str, width_cols: u16) -> u64 {
    let mut hasher = DefaultHasher::new();
    svg.hash(&mut hasher);
    width_cols.hash(&mut hasher);
    hasher.finish()
}

/// The rasterized preview for the current artifact and pane width.
#[derive(Default)]
pub struct PreviewCache {
    key: Option<u64>,
    protocol: Option<StatefulProtocol>,
    rasterized: usize,
}

impl std::fmt::Debug for PreviewCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewCache")
            .field("key", &self.key)
            .field("ready", &self.protocol.is_some())
            .finish_non_exhaustive()
    }
}

impl PreviewCache {
    /// Make sure the cached image matches `artifact` at `width_cols`.
    ///
    /// A failed rasterization is remembered so it is not retried every frame.
    pub fn prepare(&mut self, picker: &Picker, artifact: Option<&Artifact>, width_cols: u16) {
        let Some(artifact) = artifact.filter(|_| width_cols > 0) else {
            self.clear();
            return;
        };
        let key = cache_key(artifact.svg(), width_cols);
        if self.key == Some(key) {
            return;
        }
        self.key = Some(key);
        self.rasterized += 1;

        let font_width = match picker.font_size().0 {
            0 => DEFAULT_FONT_WIDTH_PX,
            w => w,
        };
        let target_px = u32::from(width_cols) * u32::from(font_width);
        self.protocol = match rasterize_svg(artifact.svg(), target_px) {
            Ok(img) => {
                crate::perf::log_event(
                    "preview.rasterize",
                    format!("cols={width_cols} px={}x{}", img.width(), img.height()),
                );
                Some(picker.new_resize_protocol(img))
            }
            Err(err) => {
                tracing::warn!(%err, "failed to rasterize diagram preview");
                None
            }
        };
    }

    pub fn protocol_mut(&mut self) -> Option<&mut StatefulProtocol> {
        self.protocol.as_mut()
    }

    pub const fn is_ready(&self) -> bool {
        self.protocol.is_some()
    }

    /// Number of rasterizations so far.
    pub const fn rasterized(&self) -> usize {
        self.rasterized
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.protocol = None;
    }
}
