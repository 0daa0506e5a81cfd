//! Terminal UI components.
//!
//! This module contains all drawing code:
//! - [`render`]: the editor and preview panes
//! - status and toast bars
//! - help, template, and share overlays

mod overlays;
mod render;
mod status;

pub use overlays::{centered_popup_rect, templates_popup_rect};
pub use render::{PaneLayout, line_number_width, pane_layout, render};
