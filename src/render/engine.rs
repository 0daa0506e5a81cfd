use crate::state::Theme;

use super::Artifact;

/// Draw target every artifact is keyed by.
pub const DIAGRAM_TARGET_ID: &str = "diagram";

/// Message used when an engine fails without explaining why.
pub const GENERIC_RENDER_FAILURE: &str = "Failed to render diagram";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityLevel {
    Strict,
    Loose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineLogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

/// Global engine settings. Only the theme varies between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub theme: Theme,
    pub start_on_load: bool,
    pub security_level: SecurityLevel,
    pub log_level: EngineLogLevel,
}

impl EngineConfig {
    pub const fn for_theme(theme: Theme) -> Self {
        Self {
            theme,
            start_on_load: true,
            security_level: SecurityLevel::Loose,
            log_level: EngineLogLevel::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The source is not well-formed.
    #[error("syntax error: {0}")]
    Syntax(String),
    /// The source parsed but drawing it failed.
    #[error("render error: {0}")]
    Draw(String),
}

impl RenderError {
    /// The engine's diagnostic, as shown to the user.
    pub fn message(&self) -> &str {
        let msg = match self {
            Self::Syntax(msg) | Self::Draw(msg) => msg.trim(),
        };
        if msg.is_empty() {
            GENERIC_RENDER_FAILURE
        } else {
            msg
        }
    }
}

/// A diagram rendering engine.
///
/// Implementations hold global settings applied by [`initialize`]; the
/// pipeline calls it on every theme change.
///
/// [`initialize`]: RenderEngine::initialize
pub trait RenderEngine {
    fn initialize(&mut self, config: &EngineConfig);

    /// Check that `source` is well-formed without drawing it.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Syntax`] with the engine's diagnostic.
    fn validate(&mut self, source: &str) -> Result<(), RenderError>;

    /// Draw `source` into an artifact keyed by `target_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`RenderError`] if drawing fails.
    fn draw(&mut self, target_id: &str, source: &str) -> Result<Artifact, RenderError>;
}

impl<E: RenderEngine + ?Sized> RenderEngine for Box<E> {
    fn initialize(&mut self, config: &EngineConfig) {
        (**self).initialize(config);
    }

    fn validate(&mut self, source: &str) -> Result<(), RenderError> {
        (**self).validate(source)
    }

    fn draw(&mut self, target_id: &str, source: &str) -> Result<Artifact, RenderError> {
        (**self).draw(target_id, source)
    }
}
