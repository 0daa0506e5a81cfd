use crate::debounce::Debouncer;
use crate::perf;
use crate::state::Theme;

use super::engine::{DIAGRAM_TARGET_ID, EngineConfig, RenderEngine};
use super::{Artifact, Display, RenderOutcome, RenderSession};

/// Quiet period after the last edit before a render fires.
pub const RENDER_DEBOUNCE_MS: u64 = 300;

/// Identifies one render attempt. Only the newest ticket may complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTicket {
    seq: u64,
}

impl RenderTicket {
    pub const fn seq(self) -> u64 {
        self.seq
    }
}

/// What a fired render did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
    /// The source was empty; the preview shows the placeholder.
    Placeholder,
    Rendered(RenderOutcome),
}

/// Debounced, validate-then-draw rendering with last-good retention.
#[derive(Debug)]
pub struct RenderPipeline<E> {
    engine: E,
    theme: Theme,
    session: RenderSession,
    error: Option<String>,
    placeholder: bool,
    issued: u64,
    in_flight: Option<u64>,
    debounce: Debouncer<()>,
}

impl<E: RenderEngine> RenderPipeline<E> {
    pub fn new(engine: E, theme: Theme) -> Self {
        let mut pipeline = Self::detached(engine, theme);
        pipeline.engine.initialize(&EngineConfig::for_theme(theme));
        pipeline
    }

    /// Build a pipeline without initializing the engine.
    ///
    /// For stand-in models that are replaced before anything renders.
    pub fn detached(engine: E, theme: Theme) -> Self {
        Self {
            engine,
            theme,
            session: RenderSession::new(),
            error: None,
            placeholder: false,
            issued: 0,
            in_flight: None,
            debounce: Debouncer::new(RENDER_DEBOUNCE_MS),
        }
    }

    pub const fn theme(&self) -> Theme {
        self.theme
    }

    pub const fn engine(&self) -> &E {
        &self.engine
    }

    pub const fn session(&self) -> &RenderSession {
        &self.session
    }

    pub const fn last_good(&self) -> Option<&Artifact> {
        self.session.last_good()
    }

    /// The current render diagnostic, if the latest attempt failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn display(&self) -> Display<'_> {
        match self.session.last_good() {
            Some(artifact) if !self.placeholder => Display::Diagram(artifact),
            _ => Display::Placeholder,
        }
    }

    /// Whether a ticket from [`begin`](Self::begin) is still waiting for
    /// [`complete`](Self::complete). [`render`](Self::render) runs both in
    /// one call, so this is only observable through the ticket API.
    pub const fn is_rendering(&self) -> bool {
        self.in_flight.is_some()
    }

    pub const fn is_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Milliseconds until the pending render fires.
    pub fn render_due_in(&self, now_ms: u64) -> Option<u64> {
        self.debounce.remaining_ms(now_ms)
    }

    /// Re-initialize the engine for `theme` and schedule a re-render.
    ///
    /// Returns `false` if the theme was already active.
    pub fn set_theme(&mut self, theme: Theme, now_ms: u64) -> bool {
        if theme == self.theme {
            return false;
        }
        self.apply_theme(theme);
        self.debounce.queue((), now_ms);
        true
    }

    /// Note an edit. A newer call replaces any pending render.
    pub fn source_changed(&mut self, now_ms: u64) {
        self.debounce.queue((), now_ms);
    }

    /// Drop the pending render, if any.
    pub fn cancel(&mut self) {
        self.debounce.cancel();
    }

    /// Fire the pending render once its window has elapsed.
    ///
    /// `source` and `theme` are read now, not when the render was scheduled.
    pub fn poll(&mut self, now_ms: u64, source: &str, theme: Theme) -> Option<PollResult> {
        self.debounce.take_ready(now_ms)?;
        Some(self.render_current(source, theme))
    }

    /// Render immediately, treating empty source as the placeholder state.
    pub fn render_current(&mut self, source: &str, theme: Theme) -> PollResult {
        if source.trim().is_empty() {
            if theme != self.theme {
                self.apply_theme(theme);
            }
            // Anything still in flight belongs to older text.
            self.issued += 1;
            self.in_flight = None;
            self.placeholder = true;
            self.error = None;
            tracing::debug!("empty source, showing placeholder");
            return PollResult::Placeholder;
        }
        self.placeholder = false;
        PollResult::Rendered(self.render(source, theme))
    }

    /// Validate then draw `source`, recording the outcome.
    pub fn render(&mut self, source: &str, theme: Theme) -> RenderOutcome {
        let _scope = perf::scope("render.diagram");
        if theme != self.theme {
            self.apply_theme(theme);
        }
        let ticket = self.begin();
        let outcome = self.attempt(source);
        self.complete(ticket, outcome.clone());
        outcome
    }

    /// Start a render attempt. Any older ticket becomes stale.
    pub fn begin(&mut self) -> RenderTicket {
        self.issued += 1;
        self.in_flight = Some(self.issued);
        RenderTicket { seq: self.issued }
    }

    /// Apply `outcome` if `ticket` is still the newest.
    ///
    /// Returns `false` and discards the outcome for a stale ticket.
    pub fn complete(&mut self, ticket: RenderTicket, outcome: RenderOutcome) -> bool {
        if ticket.seq != self.issued {
            tracing::debug!(
                seq = ticket.seq,
                latest = self.issued,
                "discarding stale render"
            );
            perf::log_event("render.stale", format!("seq={}", ticket.seq));
            return false;
        }
        self.in_flight = None;
        self.session.record(&outcome);
        match outcome {
            RenderOutcome::Success(_) => {
                self.placeholder = false;
                self.error = None;
                perf::log_event("render.success", format!("seq={}", ticket.seq));
            }
            RenderOutcome::Failure(msg) => {
                tracing::debug!(seq = ticket.seq, error = %msg, "render failed");
                perf::log_event("render.failure", &msg);
                self.error = Some(msg);
            }
        }
        true
    }

    fn attempt(&mut self, source: &str) -> RenderOutcome {
        if let Err(err) = self.engine.validate(source) {
            return RenderOutcome::Failure(err.message().to_string());
        }
        match self.engine.draw(DIAGRAM_TARGET_ID, source) {
            Ok(artifact) => RenderOutcome::Success(artifact),
            Err(err) => RenderOutcome::Failure(err.message().to_string()),
        }
    }

    fn apply_theme(&mut self, theme: Theme) {
        perf::log_event("render.theme", format!("{} -> {theme}", self.theme));
        self.engine.initialize(&EngineConfig::for_theme(theme));
        self.theme = theme;
    }
}
