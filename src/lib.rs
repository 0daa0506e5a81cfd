// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. render::RenderError)
    clippy::module_name_repetitions
)]

//! # Merdit
//!
//! A terminal editor for mermaid diagrams with a live preview.
//!
//! Merdit keeps a diagram's source and theme in sync with:
//! - A debounced render of the diagram into the preview pane
//! - Local storage, written on every change
//! - A shareable link that reconstructs the diagram anywhere
//!
//! ## Architecture
//!
//! Merdit uses The Elm Architecture (TEA) pattern:
//! - **Model**: Application state
//! - **Message**: Events and actions
//! - **Update**: Pure state transitions
//! - **View**: Render to terminal
//!
//! ## Modules
//!
//! - [`app`]: Main application loop and state
//! - [`state`]: Diagram document, link codec, storage, and the store
//! - [`render`]: Render engine and the debounced render pipeline
//! - [`editor`]: Text buffer behind the code pane
//! - [`ui`]: Terminal UI components
//! - [`preview`]: Terminal image output for the diagram
//! - [`templates`], [`format`], [`export`]: editor actions

pub mod app;
pub mod config;
pub mod debounce;
pub mod editor;
pub mod export;
pub mod format;
pub mod perf;
pub mod preview;
pub mod render;
pub mod state;
pub mod templates;
pub mod ui;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model};
    pub use crate::render::{RenderEngine, RenderPipeline};
    pub use crate::state::{DiagramDocument, DiagramStore, Theme};
}
