//! The text-editing surface for diagram source.
//!
//! A rope-backed buffer with a single cursor. The app owns one and mirrors
//! its text into the diagram store after every edit.

mod buffer;

pub use buffer::{Cursor, Direction, EditorBuffer, TAB_WIDTH};
