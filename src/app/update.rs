use crate::app::model::{Model, Overlay, ToastLevel};
use crate::editor::Direction;
use crate::format::pretty_format;

/// All possible events and actions in the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // Editing
    EditorInsertChar(char),
    /// Insert pasted text
    EditorInsertStr(String),
    EditorNewline,
    EditorTab,
    EditorDeleteBack,
    EditorDeleteForward,
    EditorMoveCursor(Direction),
    EditorMoveHome,
    EditorMoveEnd,
    EditorPageUp,
    EditorPageDown,
    EditorMoveToStart,
    EditorMoveToEnd,
    /// Move the cursor to (line, col), e.g. from a click
    EditorMoveTo(usize, usize),
    EditorScrollUp(usize),
    EditorScrollDown(usize),
    /// Re-indent the source
    FormatSource,
    /// Copy the source to the clipboard
    CopySource,
    /// Toggle between the normal and wide editor
    ToggleEditorWidth,

    // Diagram
    /// Switch to the next selectable theme
    CycleTheme,
    /// Generate the share link and show it
    ShareLink,
    /// Copy the shown share link again
    CopyShareLink,
    ExportSvg,
    ExportPng,

    // Templates
    OpenTemplates,
    TemplateUp,
    TemplateDown,
    TemplateSelect,

    // Overlays
    ToggleHelp,
    HideOverlay,

    // Window
    Resize(u16, u16),

    Quit,
}

impl Message {
    /// Whether this message can change the source text.
    pub const fn edits_source(&self) -> bool {
        matches!(
            self,
            Self::EditorInsertChar(_)
                | Self::EditorInsertStr(_)
                | Self::EditorNewline
                | Self::EditorTab
                | Self::EditorDeleteBack
                | Self::EditorDeleteForward
                | Self::FormatSource
                | Self::TemplateSelect
        )
    }
}

/// Apply `msg` to the model.
///
/// Filesystem, clipboard, and terminal work happens afterwards in the
/// event loop's side-effect pass.
pub fn update(mut model: Model, msg: Message) -> Model {
    let edits_source = msg.edits_source();
    match msg {
        Message::EditorInsertChar(ch) => model.editor.insert_char(ch),
        Message::EditorInsertStr(text) => model.editor.insert_str(&text),
        Message::EditorNewline => model.editor.newline(),
        Message::EditorTab => model.editor.insert_tab(),
        Message::EditorDeleteBack => {
            model.editor.delete_back();
        }
        Message::EditorDeleteForward => {
            model.editor.delete_forward();
        }
        Message::EditorMoveCursor(direction) => model.editor.move_cursor(direction),
        Message::EditorMoveHome => model.editor.move_home(),
        Message::EditorMoveEnd => model.editor.move_end(),
        Message::EditorPageUp => {
            let page = model.editor_view_height();
            model.editor.move_lines(Direction::Up, page);
        }
        Message::EditorPageDown => {
            let page = model.editor_view_height();
            model.editor.move_lines(Direction::Down, page);
        }
        Message::EditorMoveToStart => model.editor.move_to(0, 0),
        Message::EditorMoveToEnd => model.editor.move_to_end(),
        Message::EditorMoveTo(line, col) => model.editor.move_to(line, col),
        Message::EditorScrollUp(n) => {
            model.scroll_editor(-isize::try_from(n).unwrap_or(isize::MAX));
            return model;
        }
        Message::EditorScrollDown(n) => {
            model.scroll_editor(isize::try_from(n).unwrap_or(isize::MAX));
            return model;
        }
        Message::FormatSource => {
            let formatted = pretty_format(&model.editor.text());
            model.replace_source(&formatted);
            model.show_toast(ToastLevel::Info, "Formatted");
        }
        Message::ToggleEditorWidth => model.editor_expanded = !model.editor_expanded,

        Message::CycleTheme => {
            let next = model.theme().next_selectable();
            model.set_theme(next);
        }
        Message::ShareLink => match model.store.generate_share_link() {
            Ok(link) => model.overlay = Some(Overlay::Share(link)),
            Err(err) => {
                tracing::warn!(%err, "failed to generate share link");
                model.show_toast(ToastLevel::Error, format!("Share failed: {err}"));
            }
        },
        // Handled as side effects
        Message::CopySource
        | Message::CopyShareLink
        | Message::ExportSvg
        | Message::ExportPng => {}

        Message::OpenTemplates => {
            if model.templates.is_empty() {
                model.show_toast(ToastLevel::Warning, "No templates available");
            } else {
                model.template_selected = model
                    .template_selected
                    .min(model.templates.len().saturating_sub(1));
                model.overlay = Some(Overlay::Templates);
            }
        }
        Message::TemplateUp => {
            model.template_selected = model.template_selected.saturating_sub(1);
        }
        Message::TemplateDown => {
            if model.template_selected + 1 < model.templates.len() {
                model.template_selected += 1;
            }
        }
        Message::TemplateSelect => {
            model.overlay = None;
            let Some(template) = model.templates.get(model.template_selected).cloned() else {
                return model;
            };
            let code = model.templates.load(template.file_name());
            if code.is_empty() {
                model.show_toast(
                    ToastLevel::Error,
                    format!("Failed to load {}", template.display_name()),
                );
            } else {
                model.replace_source(&code);
                model.editor.move_to(0, 0);
                model.ensure_cursor_visible();
                model.show_toast(ToastLevel::Info, format!("Loaded {}", template.display_name()));
            }
            return model;
        }

        Message::ToggleHelp => {
            model.overlay = match model.overlay {
                Some(Overlay::Help) => None,
                _ => Some(Overlay::Help),
            };
        }
        Message::HideOverlay => model.overlay = None,

        Message::Resize(width, height) => {
            model.terminal_size = (width, height);
            model.ensure_cursor_visible();
        }

        Message::Quit => {
            model.teardown();
            model.should_quit = true;
        }
    }
    if edits_source {
        model.sync_source();
    } else {
        model.ensure_cursor_visible();
    }
    model
}
