use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::{Model, ToastLevel};
use crate::state::Location;

pub fn render_status_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let cursor = model.editor.cursor();
    let activity = if model.pipeline.is_pending() {
        " [typing]"
    } else {
        ""
    };
    let link_state = if model.store.is_link_update_pending() {
        " [link pending]"
    } else {
        ""
    };
    let location = model.store.location();

    let status = format!(
        " merdit  {}  Ln {}, Col {}{}{}  {}{}  F1:help",
        model.theme(),
        cursor.line + 1,
        cursor.col + 1,
        activity,
        link_state,
        location.origin(),
        location.path(),
    );

    let status_bar =
        Paragraph::new(status).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(status_bar, area);
}

pub fn render_toast_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some((message, level)) = model.active_toast() else {
        return;
    };
    let (prefix, style) = match level {
        ToastLevel::Info => (
            "[info]",
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
        ToastLevel::Warning => (
            "[warn]",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ),
        ToastLevel::Error => ("[error]", Style::default().bg(Color::Red).fg(Color::White)),
    };
    let toast = Paragraph::new(format!("{prefix} {message}")).style(style);
    frame.render_widget(toast, area);
}
