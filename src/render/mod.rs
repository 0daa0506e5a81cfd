//! Diagram rendering: source text in, SVG artifact or diagnostic out.
//!
//! The [`pipeline`] debounces edits, validates before drawing, and keeps the
//! last good artifact on screen when a new render fails. The [`engine`]
//! trait is the seam to the actual renderer; [`mermaid`] provides the
//! production implementation.

pub mod engine;
pub mod mermaid;
pub mod pipeline;
pub mod syntax;

pub use engine::{
    DIAGRAM_TARGET_ID, EngineConfig, GENERIC_RENDER_FAILURE, RenderEngine, RenderError,
};
pub use mermaid::{MermaidEngine, rasterize_svg};
pub use pipeline::{PollResult, RENDER_DEBOUNCE_MS, RenderPipeline, RenderTicket};
pub use syntax::{DiagramKind, SyntaxError};

/// Shown in the preview while there is nothing to draw.
pub const PLACEHOLDER_TEXT: &str = "Start typing to create a diagram";

/// A drawn diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    target_id: String,
    svg: String,
}

impl Artifact {
    pub fn new(target_id: impl Into<String>, svg: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            svg: svg.into(),
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn svg(&self) -> &str {
        &self.svg
    }
}

/// Result of one render attempt. Carries an artifact or a message, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Success(Artifact),
    Failure(String),
}

impl RenderOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            Self::Success(artifact) => Some(artifact),
            Self::Failure(_) => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(msg) => Some(msg),
        }
    }
}

/// Holds the most recent successful artifact for the lifetime of a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderSession {
    last_good: Option<Artifact>,
}

impl RenderSession {
    pub const fn new() -> Self {
        Self { last_good: None }
    }

    pub const fn last_good(&self) -> Option<&Artifact> {
        self.last_good.as_ref()
    }

    /// Apply an outcome. Only a success replaces the stored artifact.
    pub fn record(&mut self, outcome: &RenderOutcome) {
        if let RenderOutcome::Success(artifact) = outcome {
            self.last_good = Some(artifact.clone());
        }
    }
}

/// What the preview pane should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display<'a> {
    Placeholder,
    Diagram(&'a Artifact),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_keeps_last_good_on_failure() {
        let mut session = RenderSession::new();
        let ok = RenderOutcome::Success(Artifact::new("diagram", "<svg/>"));
        session.record(&ok);
        session.record(&RenderOutcome::Failure("bad".into()));
        assert_eq!(session.last_good().map(Artifact::svg), Some("<svg/>"));
    }

    #[test]
    fn test_outcome_accessors_are_exclusive() {
        let ok = RenderOutcome::Success(Artifact::new("diagram", "<svg/>"));
        assert!(ok.is_success());
        assert!(ok.artifact().is_some());
        assert!(ok.error_message().is_none());

        let err = RenderOutcome::Failure("boom".into());
        assert!(!err.is_success());
        assert!(err.artifact().is_none());
        assert_eq!(err.error_message(), Some("boom"));
    }
}
