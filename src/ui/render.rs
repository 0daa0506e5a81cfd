use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui_image::{Resize, StatefulImage};

use crate::app::{Model, Overlay};
use crate::render::{Display, PLACEHOLDER_TEXT};

use super::{overlays, status};

/// Screen areas for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneLayout {
    pub editor: Rect,
    pub preview: Rect,
    pub status: Rect,
}

impl PaneLayout {
    /// Area inside the preview border.
    pub const fn preview_inner(&self) -> Rect {
        inner(self.preview)
    }

    /// Area inside the editor border.
    pub const fn editor_inner(&self) -> Rect {
        inner(self.editor)
    }
}

const fn inner(area: Rect) -> Rect {
    Rect {
        x: area.x.saturating_add(1),
        y: area.y.saturating_add(1),
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    }
}

/// Split `area` into editor, preview, and a one-row status bar.
pub fn pane_layout(area: Rect, editor_percent: u16) -> PaneLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(editor_percent),
            Constraint::Percentage(100 - editor_percent.min(100)),
        ])
        .split(rows[0]);
    PaneLayout {
        editor: columns[0],
        preview: columns[1],
        status: rows[1],
    }
}

/// Render the complete UI.
pub fn render(model: &mut Model, frame: &mut Frame) {
    let area = frame.area();
    let layout = pane_layout(area, model.editor_width_percent());

    render_editor(model, frame, layout.editor);
    render_preview(model, frame, layout.preview);

    if model.active_toast().is_some() {
        status::render_toast_bar(model, frame, layout.status);
    } else {
        status::render_status_bar(model, frame, layout.status);
    }

    match &model.overlay {
        Some(Overlay::Help) => overlays::render_help_overlay(model, frame, area),
        Some(Overlay::Templates) => overlays::render_templates_overlay(model, frame, area),
        Some(Overlay::Share(link)) => overlays::render_share_overlay(link, frame, area),
        None => {}
    }
}

fn render_editor(model: &Model, frame: &mut Frame, area: Rect) {
    let buf = &model.editor;
    let block = Block::default()
        .title(" Code ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let text_area = block.inner(area);

    let total_lines = buf.line_count();
    let gutter_width = line_number_width(total_lines);
    let visible_height = text_area.height as usize;
    let start = model.editor_scroll.min(total_lines.saturating_sub(1));
    let end = (start + visible_height).min(total_lines);
    let cursor = buf.cursor();

    let mut content: Vec<Line> = Vec::new();
    for line_idx in start..end {
        let line_text = buf.line(line_idx).unwrap_or_default();
        let line_num = format!("{:>width$} ", line_idx + 1, width = gutter_width as usize);
        let mut spans = vec![Span::styled(line_num, Style::default().fg(Color::DarkGray))];

        if line_idx == cursor.line {
            let chars: Vec<char> = line_text.chars().collect();
            let col = cursor.col.min(chars.len());
            let before: String = chars[..col].iter().collect();
            let cursor_char = chars.get(col).map_or_else(|| " ".to_string(), char::to_string);
            let after: String = chars.iter().skip(col + 1).collect();

            if !before.is_empty() {
                spans.push(Span::raw(before));
            }
            spans.push(Span::styled(
                cursor_char,
                Style::default().bg(Color::White).fg(Color::Black),
            ));
            if !after.is_empty() {
                spans.push(Span::raw(after));
            }
        } else {
            spans.push(Span::raw(line_text));
        }
        content.push(Line::from(spans));
    }

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(content).block(block), area);
}

fn render_preview(model: &mut Model, frame: &mut Frame, area: Rect) {
    let error = model.pipeline.error().map(str::to_string);
    let has_diagram = matches!(model.pipeline.display(), Display::Diagram(_));

    let mut title = vec![Span::raw(format!(" Preview ({}) ", model.theme()))];
    if error.is_some() {
        title.push(Span::styled(
            " ! error ",
            Style::default()
                .bg(Color::Red)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ));
    }
    let block = Block::default()
        .title(Line::from(title))
        .borders(Borders::ALL)
        .border_style(if error.is_some() {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        });
    let body = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let (content_area, error_area) = match &error {
        Some(_) if body.height > 1 => {
            let error_rows = 2.min(body.height - 1);
            (
                Rect {
                    height: body.height - error_rows,
                    ..body
                },
                Some(Rect {
                    y: body.y + body.height - error_rows,
                    height: error_rows,
                    ..body
                }),
            )
        }
        _ => (body, None),
    };

    if has_diagram {
        let images_enabled = model.images_enabled;
        if let Some(protocol) = model.preview_protocol_mut() {
            let resize = Resize::Fit(Some(image::imageops::FilterType::CatmullRom));
            frame.render_stateful_widget(
                StatefulImage::default().resize(resize),
                content_area,
                protocol,
            );
        } else {
            let note = if images_enabled {
                "Preview unavailable in this terminal. Ctrl+E exports SVG."
            } else {
                "Diagram ready (images disabled). Ctrl+E exports SVG."
            };
            frame.render_widget(
                Paragraph::new(note)
                    .style(Style::default().fg(Color::Indexed(245)))
                    .wrap(Wrap { trim: true }),
                content_area,
            );
        }
    } else if error.is_none() {
        let placeholder = Paragraph::new(PLACEHOLDER_TEXT)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Indexed(245)));
        let mid = Rect {
            y: content_area.y + content_area.height / 2,
            height: content_area.height.min(1),
            ..content_area
        };
        frame.render_widget(placeholder, mid);
    }

    if let (Some(message), Some(error_area)) = (error, error_area) {
        let line = Paragraph::new(format!("Error: {message}"))
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true });
        frame.render_widget(line, error_area);
    }
}

/// Width of the line number column, without the separating space.
pub const fn line_number_width(total_lines: usize) -> u16 {
    if total_lines < 10 {
        1
    } else if total_lines < 100 {
        2
    } else if total_lines < 1000 {
        3
    } else if total_lines < 10_000 {
        4
    } else {
        5
    }
}
