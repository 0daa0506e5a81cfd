//! Application state and main event loop.
//!
//! This module implements The Elm Architecture (TEA):
//! - [`Model`]: The complete application state
//! - [`Message`]: All possible events and actions
//! - [`update`]: Pure function for state transitions
//! - [`App::run`]: Main event loop with rendering

mod effects;
mod event_loop;
mod input;
mod model;
mod update;

pub use model::{
    EDITOR_WIDTH_PERCENT, EXPANDED_EDITOR_WIDTH_PERCENT, Model, Overlay, SessionPipeline,
    SessionStore, ToastLevel,
};
pub use update::{Message, update};

use std::path::PathBuf;

use crate::state::{AddressBar, MemoryStorage, Storage, StoreDefaults};
use crate::templates::TemplateLibrary;

/// Main application struct that owns the session setup and runs the event loop.
pub struct App {
    storage: Box<dyn Storage>,
    location: AddressBar,
    defaults: StoreDefaults,
    templates: TemplateLibrary,
    images_enabled: bool,
    force_half_cell: bool,
    export_dir: PathBuf,
    config_global_path: Option<PathBuf>,
    config_local_path: Option<PathBuf>,
}

impl App {
    /// Create an application whose address bar starts at `location`.
    ///
    /// Storage defaults to memory until [`with_storage`](Self::with_storage).
    pub fn new(location: AddressBar) -> Self {
        Self {
            storage: Box::new(MemoryStorage::new()),
            location,
            defaults: StoreDefaults::default(),
            templates: TemplateLibrary::builtin(),
            images_enabled: true,
            force_half_cell: false,
            export_dir: PathBuf::from("."),
            config_global_path: None,
            config_local_path: None,
        }
    }

    #[must_use]
    pub fn with_storage(mut self, storage: Box<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    /// Source and theme used when neither the link nor storage has a diagram.
    #[must_use]
    pub fn with_defaults(mut self, defaults: StoreDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    #[must_use]
    pub fn with_templates(mut self, templates: TemplateLibrary) -> Self {
        self.templates = templates;
        self
    }

    /// Enable or disable the image preview.
    #[must_use]
    pub const fn with_images_enabled(mut self, enabled: bool) -> Self {
        self.images_enabled = enabled;
        self
    }

    /// Skip graphics protocol detection and draw with half blocks.
    #[must_use]
    pub const fn with_force_half_cell(mut self, force: bool) -> Self {
        self.force_half_cell = force;
        self
    }

    #[must_use]
    pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
        self.export_dir = dir;
        self
    }

    /// Set config paths to show in help.
    #[must_use]
    pub fn with_config_paths(
        mut self,
        global_path: Option<PathBuf>,
        local_path: Option<PathBuf>,
    ) -> Self {
        self.config_global_path = global_path;
        self.config_local_path = local_path;
        self
    }
}

#[cfg(test)]
mod tests;
