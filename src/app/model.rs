use std::path::PathBuf;
use std::time::{Duration, Instant};

use ratatui_image::picker::Picker;
use ratatui_image::protocol::StatefulProtocol;

use crate::editor::EditorBuffer;
use crate::preview::PreviewCache;
use crate::render::{Display, MermaidEngine, RenderEngine, RenderPipeline};
use crate::state::{
    AddressBar, BootstrapSource, DiagramStore, MemoryStorage, Storage, StoreDefaults, Theme,
};
use crate::templates::TemplateLibrary;

pub type SessionStore = DiagramStore<Box<dyn Storage>, AddressBar>;
pub type SessionPipeline = RenderPipeline<Box<dyn RenderEngine>>;

/// Editor share of the screen width.
pub const EDITOR_WIDTH_PERCENT: u16 = 50;
/// Editor share of the screen width after Ctrl+X.
pub const EXPANDED_EDITOR_WIDTH_PERCENT: u16 = 67;

const TOAST_TTL: Duration = Duration::from_secs(4);

/// Rows taken by pane borders and the status bar.
const CHROME_ROWS: u16 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    level: ToastLevel,
    message: String,
    expires_at: Instant,
}

/// A popup drawn over both panes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    Help,
    Templates,
    Share(String),
}

/// The complete application state.
pub struct Model {
    /// Source text, theme, persistence, and the shareable link
    pub store: SessionStore,
    /// Debounced rendering and the last good diagram
    pub pipeline: SessionPipeline,
    pub editor: EditorBuffer,
    /// First visible editor line
    pub editor_scroll: usize,
    pub editor_expanded: bool,
    pub templates: TemplateLibrary,
    pub template_selected: usize,
    pub overlay: Option<Overlay>,
    pub picker: Option<Picker>,
    pub images_enabled: bool,
    /// Where Ctrl+E / Ctrl+P write their files
    pub export_dir: PathBuf,
    pub config_global_path: Option<PathBuf>,
    pub config_local_path: Option<PathBuf>,
    pub terminal_size: (u16, u16),
    /// Clock reading for the message being handled, in ms since start
    pub now_ms: u64,
    pub should_quit: bool,
    toast: Option<Toast>,
    preview: PreviewCache,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("store", &self.store)
            .field("overlay", &self.overlay)
            .field("editor_cursor", &self.editor.cursor())
            .field("terminal_size", &self.terminal_size)
            .finish_non_exhaustive()
    }
}

impl Default for Model {
    fn default() -> Self {
        let store = DiagramStore::new(
            Box::new(MemoryStorage::new()) as Box<dyn Storage>,
            AddressBar::default(),
            StoreDefaults::default(),
        );
        // Rebuilt by every `mem::take` in dispatch, so the engine stays cold.
        let pipeline = RenderPipeline::detached(
            Box::new(MermaidEngine::new()) as Box<dyn RenderEngine>,
            Theme::Default,
        );
        Self::new(store, pipeline, TemplateLibrary::builtin(), (80, 24))
    }
}

impl Model {
    pub fn new(
        store: SessionStore,
        pipeline: SessionPipeline,
        templates: TemplateLibrary,
        terminal_size: (u16, u16),
    ) -> Self {
        let editor = EditorBuffer::from_text(store.source_text());
        Self {
            store,
            pipeline,
            editor,
            editor_scroll: 0,
            editor_expanded: false,
            templates,
            template_selected: 0,
            overlay: None,
            picker: None,
            images_enabled: true,
            export_dir: PathBuf::from("."),
            config_global_path: None,
            config_local_path: None,
            terminal_size,
            now_ms: 0,
            should_quit: false,
            toast: None,
            preview: PreviewCache::default(),
        }
    }

    #[must_use]
    pub fn with_picker(mut self, picker: Option<Picker>) -> Self {
        self.picker = picker;
        self
    }

    /// Restore the session and draw it right away.
    pub fn bootstrap(&mut self) {
        let source = self.store.bootstrap();
        self.editor.set_text(self.store.source_text());
        self.editor.move_to(0, 0);
        self.editor_scroll = 0;
        self.pipeline
            .render_current(self.store.source_text(), self.store.theme());
        match source {
            BootstrapSource::Link => self.show_toast(ToastLevel::Info, "Loaded diagram from link"),
            BootstrapSource::Storage => self.show_toast(ToastLevel::Info, "Restored last session"),
            BootstrapSource::Defaults => {}
        }
    }

    /// Push the editor text into the store, scheduling a render if it changed.
    pub(super) fn sync_source(&mut self) {
        if self.store.set_source_text(self.editor.text(), self.now_ms) {
            self.pipeline.source_changed(self.now_ms);
        }
        self.ensure_cursor_visible();
    }

    /// Replace the whole editor text, as loading a template or formatting does.
    pub(super) fn replace_source(&mut self, text: &str) {
        self.editor.set_text(text);
        self.sync_source();
    }

    pub(super) fn set_theme(&mut self, theme: Theme) {
        if self.store.set_theme(theme, self.now_ms) {
            self.pipeline.set_theme(theme, self.now_ms);
            self.show_toast(ToastLevel::Info, format!("Theme: {theme}"));
        }
    }

    /// Advance both debouncers. Returns whether anything visible changed.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        self.now_ms = now_ms;
        let rendered = self
            .pipeline
            .poll(now_ms, self.store.source_text(), self.store.theme())
            .is_some();
        let relinked = self.store.poll(now_ms);
        rendered || relinked
    }

    /// Whether a render or link update is waiting on its debounce window.
    pub const fn has_pending_work(&self) -> bool {
        self.pipeline.is_pending() || self.store.is_link_update_pending()
    }

    /// Drop pending timers before shutdown.
    pub fn teardown(&mut self) {
        self.pipeline.cancel();
        self.store.cancel_pending();
    }

    pub const fn theme(&self) -> Theme {
        self.store.theme()
    }

    pub const fn editor_width_percent(&self) -> u16 {
        if self.editor_expanded {
            EXPANDED_EDITOR_WIDTH_PERCENT
        } else {
            EDITOR_WIDTH_PERCENT
        }
    }

    /// Rows of source visible in the editor pane.
    pub fn editor_view_height(&self) -> usize {
        usize::from(self.terminal_size.1.saturating_sub(CHROME_ROWS)).max(1)
    }

    pub(super) fn ensure_cursor_visible(&mut self) {
        let line = self.editor.cursor().line;
        let height = self.editor_view_height();
        if line < self.editor_scroll {
            self.editor_scroll = line;
        } else if line >= self.editor_scroll + height {
            self.editor_scroll = line + 1 - height;
        }
    }

    pub(super) fn scroll_editor(&mut self, delta: isize) {
        let max = self.editor.line_count().saturating_sub(1);
        self.editor_scroll = self.editor_scroll.saturating_add_signed(delta).min(max);
    }

    /// Rasterize the diagram for a preview pane `width_cols` wide, if needed.
    pub fn prepare_preview(&mut self, width_cols: u16) {
        let Some(picker) = self.picker.as_ref().filter(|_| self.images_enabled) else {
            self.preview.clear();
            return;
        };
        let artifact = match self.pipeline.display() {
            Display::Diagram(artifact) => Some(artifact),
            Display::Placeholder => None,
        };
        self.preview.prepare(picker, artifact, width_cols);
    }

    pub fn preview_protocol_mut(&mut self) -> Option<&mut StatefulProtocol> {
        self.preview.protocol_mut()
    }

    pub fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: Instant::now() + TOAST_TTL,
        });
    }

    pub(super) fn expire_toast(&mut self, now: Instant) -> bool {
        if self.toast.as_ref().is_some_and(|t| t.expires_at <= now) {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, ToastLevel)> {
        self.toast.as_ref().map(|t| (t.message.as_str(), t.level))
    }
}
