use std::io::stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;

use crate::app::effects::handle_message_side_effects;
use crate::app::{App, Message, Model, SessionPipeline, update};
use crate::render::{MermaidEngine, RenderEngine, RenderPipeline};
use crate::state::DiagramStore;

/// Poll interval while a debounce window is open.
const PENDING_POLL_MS: u64 = 10;
/// Poll interval when idle; only toasts need waking up for.
const IDLE_POLL_MS: u64 = 250;

impl App {
    /// Run the main event loop.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal initialization or the event loop hits
    /// an I/O failure.
    pub fn run(self) -> Result<()> {
        let _run_scope = crate::perf::scope("app.run.total");

        // Create image picker BEFORE initializing terminal (queries stdio)
        let picker = if self.images_enabled {
            let _picker_scope = crate::perf::scope("app.create_picker");
            crate::preview::create_picker(self.force_half_cell)
        } else {
            None
        };

        let init_scope = crate::perf::scope("app.ratatui_init");
        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal: merdit requires an interactive terminal")?;
        let size = terminal.size()?;
        drop(init_scope);

        let mut model = self.into_model((size.width, size.height)).with_picker(picker);
        {
            let _bootstrap_scope = crate::perf::scope("app.bootstrap");
            model.bootstrap();
        }

        let result = execute!(stdout(), EnableBracketedPaste, EnableMouseCapture)
            .context("Failed to enable mouse capture")
            .and_then(|()| Self::event_loop(&mut terminal, &mut model));

        model.teardown();
        let _ = execute!(stdout(), DisableBracketedPaste, DisableMouseCapture);
        ratatui::restore();

        result
    }

    /// Build the model for a terminal of `size`, without bootstrapping it.
    pub(super) fn into_model(self, size: (u16, u16)) -> Model {
        let theme = self.defaults.theme;
        let store = DiagramStore::new(self.storage, self.location, self.defaults);
        let engine: Box<dyn RenderEngine> = Box::new(MermaidEngine::new());
        let pipeline: SessionPipeline = RenderPipeline::new(engine, theme);

        let mut model = Model::new(store, pipeline, self.templates, size);
        model.images_enabled = self.images_enabled;
        model.export_dir = self.export_dir;
        model.config_global_path = self.config_global_path;
        model.config_local_path = self.config_local_path;
        model
    }

    fn dispatch(model: &mut Model, msg: Message, now_ms: u64, frame_idx: u64) {
        crate::perf::log_event("event.message", format!("frame={frame_idx} msg={msg:?}"));
        model.now_ms = now_ms;
        let side_msg = msg.clone();
        *model = update(std::mem::take(model), msg);
        handle_message_side_effects(model, &side_msg);
    }

    fn event_loop(terminal: &mut DefaultTerminal, model: &mut Model) -> Result<()> {
        let start = Instant::now();
        let mut frame_idx: u64 = 0;
        let mut needs_render = true;

        loop {
            if model.expire_toast(Instant::now()) {
                needs_render = true;
            }

            let now_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            if model.tick(now_ms) {
                needs_render = true;
            }

            let poll_ms = if needs_render {
                0
            } else if model.has_pending_work() {
                PENDING_POLL_MS
            } else {
                IDLE_POLL_MS
            };
            if event::poll(Duration::from_millis(poll_ms))? {
                // Refresh timestamp after poll wait so debouncers use accurate times.
                let event_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                if let Some(msg) = Self::handle_event(&event::read()?, model) {
                    Self::dispatch(model, msg, event_ms, frame_idx);
                    needs_render = true;
                }

                // Coalesce key repeat bursts and pastes into a single render.
                let mut drained = 0_u32;
                while event::poll(Duration::from_millis(0))? {
                    let drain_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                    if let Some(msg) = Self::handle_event(&event::read()?, model) {
                        drained += 1;
                        Self::dispatch(model, msg, drain_ms, frame_idx);
                        needs_render = true;
                    }
                }
                if drained > 0 {
                    crate::perf::log_event(
                        "event.drain",
                        format!("frame={frame_idx} drained={drained}"),
                    );
                }
            }

            if model.should_quit {
                break;
            }

            if needs_render {
                frame_idx += 1;

                let prep_start = Instant::now();
                let area = Rect::new(0, 0, model.terminal_size.0, model.terminal_size.1);
                let preview =
                    crate::ui::pane_layout(area, model.editor_width_percent()).preview_inner();
                model.prepare_preview(preview.width);
                crate::perf::log_event(
                    "frame.prep",
                    format!(
                        "frame={} prep_ms={:.3} preview_cols={}",
                        frame_idx,
                        prep_start.elapsed().as_secs_f64() * 1000.0,
                        preview.width
                    ),
                );

                let draw_start = Instant::now();
                terminal.draw(|frame| Self::view(model, frame))?;
                crate::perf::log_event(
                    "frame.draw",
                    format!(
                        "frame={} draw_ms={:.3}",
                        frame_idx,
                        draw_start.elapsed().as_secs_f64() * 1000.0
                    ),
                );
                needs_render = false;
            }
        }
        Ok(())
    }
}
