use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::Frame;
use ratatui::layout::Rect;

use crate::app::{App, Message, Model, Overlay};
use crate::editor::Direction;

/// Lines moved per mouse wheel notch.
const SCROLL_LINES: usize = 3;

impl App {
    pub(super) fn handle_event(event: &Event, model: &Model) -> Option<Message> {
        match event {
            Event::Key(key) => Self::handle_key(*key, model),
            Event::Mouse(mouse) => Self::handle_mouse(*mouse, model),
            Event::Paste(text) if model.overlay.is_none() => {
                Some(Message::EditorInsertStr(text.clone()))
            }
            Event::Resize(w, h) => {
                crate::perf::log_event("event.resize", format!("width={w} height={h}"));
                Some(Message::Resize(*w, *h))
            }
            _ => None,
        }
    }

    pub(super) fn handle_key(key: KeyEvent, model: &Model) -> Option<Message> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && matches!(key.code, KeyCode::Char('q' | 'c')) {
            return Some(Message::Quit);
        }

        match &model.overlay {
            Some(Overlay::Help) => return Some(Message::HideOverlay),
            Some(Overlay::Share(_)) => {
                return match key.code {
                    KeyCode::Enter | KeyCode::Char('c') => Some(Message::CopyShareLink),
                    _ => Some(Message::HideOverlay),
                };
            }
            Some(Overlay::Templates) => {
                return match key.code {
                    KeyCode::Char('k') | KeyCode::Up => Some(Message::TemplateUp),
                    KeyCode::Char('j') | KeyCode::Down => Some(Message::TemplateDown),
                    KeyCode::Enter => Some(Message::TemplateSelect),
                    KeyCode::Esc | KeyCode::Char('q') => Some(Message::HideOverlay),
                    _ => None,
                };
            }
            None => {}
        }

        if ctrl {
            return match key.code {
                KeyCode::Char('s') => Some(Message::ShareLink),
                KeyCode::Char('e') => Some(Message::ExportSvg),
                KeyCode::Char('p') => Some(Message::ExportPng),
                KeyCode::Char('t') => Some(Message::CycleTheme),
                KeyCode::Char('o') => Some(Message::OpenTemplates),
                KeyCode::Char('f') => Some(Message::FormatSource),
                KeyCode::Char('y') => Some(Message::CopySource),
                KeyCode::Char('x') => Some(Message::ToggleEditorWidth),
                KeyCode::Home => Some(Message::EditorMoveToStart),
                KeyCode::End => Some(Message::EditorMoveToEnd),
                _ => None,
            };
        }

        match key.code {
            KeyCode::F(1) => Some(Message::ToggleHelp),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::ALT) => {
                Some(Message::EditorInsertChar(c))
            }
            KeyCode::Enter => Some(Message::EditorNewline),
            KeyCode::Tab => Some(Message::EditorTab),
            KeyCode::Backspace => Some(Message::EditorDeleteBack),
            KeyCode::Delete => Some(Message::EditorDeleteForward),
            KeyCode::Left => Some(Message::EditorMoveCursor(Direction::Left)),
            KeyCode::Right => Some(Message::EditorMoveCursor(Direction::Right)),
            KeyCode::Up => Some(Message::EditorMoveCursor(Direction::Up)),
            KeyCode::Down => Some(Message::EditorMoveCursor(Direction::Down)),
            KeyCode::Home => Some(Message::EditorMoveHome),
            KeyCode::End => Some(Message::EditorMoveEnd),
            KeyCode::PageUp => Some(Message::EditorPageUp),
            KeyCode::PageDown => Some(Message::EditorPageDown),
            _ => None,
        }
    }

    pub(super) fn handle_mouse(mouse: MouseEvent, model: &Model) -> Option<Message> {
        if model.overlay.is_some() {
            return None;
        }
        let area = Rect::new(0, 0, model.terminal_size.0, model.terminal_size.1);
        let text_area = crate::ui::pane_layout(area, model.editor_width_percent()).editor_inner();
        if !point_in_rect(mouse.column, mouse.row, text_area) {
            return None;
        }

        match mouse.kind {
            MouseEventKind::ScrollDown => Some(Message::EditorScrollDown(SCROLL_LINES)),
            MouseEventKind::ScrollUp => Some(Message::EditorScrollUp(SCROLL_LINES)),
            MouseEventKind::Down(MouseButton::Left) => {
                let line = model.editor_scroll + usize::from(mouse.row - text_area.y);
                if line >= model.editor.line_count() {
                    return Some(Message::EditorMoveToEnd);
                }
                let gutter = crate::ui::line_number_width(model.editor.line_count()) + 1;
                let display_col = mouse.column.saturating_sub(text_area.x + gutter);
                let col = model.editor.col_at_display(line, usize::from(display_col));
                Some(Message::EditorMoveTo(line, col))
            }
            _ => None,
        }
    }

    pub(super) fn view(model: &mut Model, frame: &mut Frame) {
        crate::ui::render(model, frame);
    }
}

const fn point_in_rect(col: u16, row: u16, rect: Rect) -> bool {
    col >= rect.x && col < rect.x + rect.width && row >= rect.y && row < rect.y + rect.height
}
