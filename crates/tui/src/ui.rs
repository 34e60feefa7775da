use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use seeker_core::events::{Level, StatusEvent};
use seeker_core::settings::FIELDS;
use crate::App;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = if app.log_visible {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(f.area())
    } else {
        Layout::default()
            .constraints([Constraint::Percentage(100)])
            .split(f.area())
    };

    // -- Left panel: state banner + settings --

    let (banner_label, banner_bg) = if app.controller.is_running() {
        ("RUNNING (Press S to stop)", Color::Green)
    } else {
        ("STOPPED (Press S to start)", Color::Red)
    };

    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let mut lines: Vec<Line> = vec![
        Line::from(vec![
            Span::raw(" "),
            key("j"),
            Span::raw("/"),
            key("k"),
            Span::raw(" select, "),
            key("enter"),
            Span::raw(" edit, "),
            key("l"),
            Span::raw(" log, "),
            key("q"),
            Span::raw(" quit"),
        ]),
        Line::from(""),
    ];

    let label_width = FIELDS.iter().map(|f| f.len()).max().unwrap_or(0);
    for (i, field) in FIELDS.iter().enumerate() {
        let is_selected = i == app.selected;
        let prefix = if is_selected { "> " } else { "  " };
        let value = match (&app.editing, is_selected) {
            (Some(buf), true) => Span::styled(
                format!("{}_", buf),
                Style::default().fg(Color::Black).bg(Color::Yellow),
            ),
            _ => Span::styled(
                app.config.field(field).unwrap_or_default(),
                Style::default().fg(Color::Cyan),
            ),
        };
        let name_style = if is_selected {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        lines.push(Line::from(vec![
            Span::raw(prefix),
            Span::styled(format!("{:<width$}  ", field, width = label_width), name_style),
            value,
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(" sampling column X={} only; threshold in %", app.config.color_x1),
        Style::default().fg(Color::DarkGray),
    )));

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(chunks[0]);

    let banner_width = left_chunks[0].width as usize;
    let pad_total = banner_width.saturating_sub(banner_label.len());
    let pad_left = pad_total / 2;
    let pad_right = pad_total - pad_left;
    let centered_banner = format!("{}{}{}", " ".repeat(pad_left), banner_label, " ".repeat(pad_right));
    let banner = Paragraph::new(Line::from(Span::styled(
        centered_banner,
        Style::default().fg(Color::Black).bg(banner_bg).add_modifier(Modifier::BOLD),
    )));
    f.render_widget(banner, left_chunks[0]);

    let settings = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
            .title(format!(" {} ", app.config_path.display()))
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(settings, left_chunks[1]);

    // -- Right panel: status log --
    if app.log_visible && chunks.len() > 1 {
        let visible_height = chunks[1].height.saturating_sub(2) as usize;
        let total = app.log_messages.len();
        let max_scroll = total.saturating_sub(visible_height);
        let scroll = app.log_scroll.min(max_scroll);
        let start = total.saturating_sub(visible_height + scroll);
        let end = total.saturating_sub(scroll);

        let log_lines: Vec<Line> = if total == 0 {
            vec![Line::from(Span::styled(
                "Press S to start automation...",
                Style::default().fg(Color::DarkGray),
            ))]
        } else {
            app.log_messages.range(start..end).map(event_line).collect()
        };

        let log_panel = Paragraph::new(log_lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Status ")
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(log_panel, chunks[1]);
    }

    if let Some(dialog) = &app.confirm {
        dialog.render(f);
    }
}

fn event_line(ev: &StatusEvent) -> Line<'_> {
    let (tag, color) = match ev.level {
        Level::Info => ("", Color::White),
        Level::Success => ("ok ", Color::Green),
        Level::Warning => ("warn ", Color::Yellow),
        Level::Error => ("error ", Color::Red),
    };

    let mut spans = vec![
        Span::styled(ev.time(), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
    ];
    if !tag.is_empty() {
        spans.push(Span::styled(tag, Style::default().fg(color)));
    }
    spans.push(Span::styled(ev.message.as_str(), Style::default().fg(color)));
    Line::from(spans)
}
