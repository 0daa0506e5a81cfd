use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap};

use crate::app::Model;

/// Popup for the template picker, sized to its items.
pub fn templates_popup_rect(area: Rect, items_len: usize) -> Rect {
    let popup_width = area.width.saturating_sub(16).clamp(24, 56);
    let items = u16::try_from(items_len).unwrap_or(u16::MAX);
    // border + padding on both sides, plus a footer row
    let needed_rows = items.saturating_add(6);
    let popup_height = needed_rows.min(area.height.saturating_sub(2).max(8));
    centered_popup_rect(popup_width, popup_height, area)
}

pub fn render_templates_overlay(model: &Model, frame: &mut Frame, area: Rect) {
    let templates = model.templates.templates();
    let popup = templates_popup_rect(area, templates.len());

    let visible_rows = popup.height.saturating_sub(5) as usize;
    let start = (model.template_selected + 1).saturating_sub(visible_rows);

    let mut lines: Vec<Line> = templates
        .iter()
        .enumerate()
        .skip(start)
        .take(visible_rows)
        .map(|(idx, template)| {
            let selected = idx == model.template_selected;
            let marker = if selected { "> " } else { "  " };
            let origin = if template.is_builtin() { "" } else { "  (file)" };
            let style = if selected {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::styled(format!("{marker}{}{origin}", template.display_name()), style)
        })
        .collect();
    lines.push(Line::raw(""));
    lines.push(Line::styled(
        "j/k move \u{2502} Enter load \u{2502} Esc cancel",
        Style::default().fg(Color::Indexed(245)),
    ));

    let block = Block::default()
        .title("Templates")
        .borders(Borders::ALL)
        .padding(Padding::uniform(1))
        .style(Style::default().bg(Color::Black).fg(Color::White));
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

pub fn render_share_overlay(link: &str, frame: &mut Frame, area: Rect) {
    let popup_width = area.width.saturating_sub(8).max(40);
    let popup_height = area.height.saturating_sub(4).clamp(8, 14);
    let popup = centered_popup_rect(popup_width, popup_height, area);

    let lines = vec![
        Line::styled(
            "Shareable link",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Line::raw(""),
        Line::styled(link.to_string(), Style::default().fg(Color::Cyan)),
        Line::raw(""),
        Line::styled(
            "c/Enter copy again \u{2502} any other key closes",
            Style::default().fg(Color::Indexed(245)),
        ),
    ];

    let block = Block::default()
        .title("Share")
        .borders(Borders::ALL)
        .padding(Padding::uniform(1))
        .style(Style::default().bg(Color::Black).fg(Color::White));
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false }),
        popup,
    );
}

pub fn render_help_overlay(model: &Model, frame: &mut Frame, area: Rect) {
    let popup_width = area.width.saturating_sub(12).max(48);
    let popup_height = area.height.saturating_sub(4).max(12);
    let popup = centered_popup_rect(popup_width, popup_height, area);

    let global_cfg = model
        .config_global_path
        .as_ref()
        .map_or_else(|| "<unknown>".to_string(), |p| p.display().to_string());
    let local_cfg = model
        .config_local_path
        .as_ref()
        .map_or_else(|| "<none>".to_string(), |p| p.display().to_string());

    let section_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::styled("Editing", section_style));
    lines.push(Line::raw("  Arrows, Home/End    Move cursor"));
    lines.push(Line::raw("  PageUp/PageDown     Move one page"));
    lines.push(Line::raw("  Ctrl+Home/End       Start / end of source"));
    lines.push(Line::raw("  Tab                 Indent"));
    lines.push(Line::raw("  Ctrl-f              Pretty format"));
    lines.push(Line::raw("  Ctrl-y              Copy code"));
    lines.push(Line::raw("  Ctrl-x              Widen / narrow editor"));
    lines.push(Line::raw(""));

    lines.push(Line::styled("Diagram", section_style));
    lines.push(Line::raw("  Ctrl-t              Next theme"));
    lines.push(Line::raw("  Ctrl-o              Templates"));
    lines.push(Line::raw("  Ctrl-s              Share link (copied)"));
    lines.push(Line::raw("  Ctrl-e              Export diagram.svg"));
    lines.push(Line::raw("  Ctrl-p              Export diagram.png"));
    lines.push(Line::raw(""));

    lines.push(Line::styled("Other", section_style));
    lines.push(Line::raw("  F1                  Toggle help"));
    lines.push(Line::raw("  Ctrl-q / Ctrl-c     Quit"));
    lines.push(Line::raw(""));

    lines.push(Line::styled("Config", section_style));
    lines.push(Line::raw(format!("  Global: {global_cfg}")));
    lines.push(Line::raw(format!("  Local override: {local_cfg}")));
    lines.push(Line::raw(format!(
        "  Export dir: {}",
        model.export_dir.display()
    )));

    let block = Block::default()
        .title("Help")
        .borders(Borders::ALL)
        .padding(Padding::uniform(1))
        .style(Style::default().bg(Color::Black).fg(Color::White));

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

pub fn centered_popup_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w) / 2);
    let y = area.y + (area.height.saturating_sub(h) / 2);
    Rect::new(x, y, w, h)
}
