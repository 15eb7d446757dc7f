use std::time::Instant;

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::notify::{Phase, Severity};
use crate::settings::SettingsField;
use crate::transcript::{Author, Message};

const TOAST_WIDTH: u16 = 48;

/// Severity → toast colors.
fn severity_style(severity: Severity) -> Style {
    let bg = match severity {
        Severity::Info => Color::Blue,
        Severity::Success => Color::Green,
        Severity::Error => Color::Red,
    };
    Style::default().bg(bg).fg(Color::White).add_modifier(Modifier::BOLD)
}

fn author_style(author: Author) -> Style {
    match author {
        Author::User => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        Author::Assistant => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, transcript, input, footer
    let [header_area, transcript_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(app.input_height()),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_transcript(app, frame, transcript_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    // Overlays (in order of priority)
    if app.settings.open {
        render_settings(app, frame, area);
    }
    if app.busy.is_active() {
        render_busy(frame, area);
    }
    render_toasts(app, frame, footer_area.y);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let countdown = app
        .countdown
        .map(|c| c.state().label())
        .unwrap_or_default();

    let title = Line::from(vec![
        Span::styled(" 🏮 Lantern Chat ", Style::default().fg(Color::Red).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(countdown, Style::default().fg(Color::Yellow)),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn message_lines(msg: &Message, animation_frame: u8) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut heading = vec![Span::styled(
        format!("{} {}", msg.author.icon(), msg.author.label()),
        author_style(msg.author),
    )];
    if !msg.pending {
        heading.push(Span::styled(
            format!("  {}", msg.time_label()),
            Style::default().fg(Color::DarkGray),
        ));
    }
    lines.push(Line::from(heading));

    if msg.pending {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{} 🎇", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    } else {
        for line in msg.body.split('\n') {
            lines.push(Line::from(line.to_string()));
        }
    }

    lines.push(Line::default());
    lines
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Transcript ");
    let inner = block.inner(area);

    let text = if app.transcript.is_empty() {
        Text::from(Span::styled(
            "Say something to start the conversation...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(
            app.transcript
                .iter()
                .flat_map(|msg| message_lines(msg, app.animation_frame))
                .collect::<Vec<_>>(),
        )
    };

    // Height under the same wrapper that draws it
    let paragraph = Paragraph::new(text).wrap(Wrap { trim: false });
    let content_lines = paragraph.line_count(inner.width);

    app.transcript_area = Some(area);
    app.transcript_height = inner.height;
    app.transcript_lines = u16::try_from(content_lines).unwrap_or(u16::MAX);
    if app.transcript.take_scroll_request() {
        app.scroll_to_bottom();
    }

    let paragraph = paragraph.block(block).scroll((app.transcript_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let focused = !app.settings.open;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message ");
    let inner = block.inner(area);

    let (row, col) = app.input.cursor_position();
    let row = row as u16;
    // Keep the cursor row visible once the box stops growing
    let scroll = row.saturating_sub(inner.height.saturating_sub(1));

    let input = Paragraph::new(app.input.value())
        .block(block)
        .scroll((scroll, 0));
    frame.render_widget(input, area);

    if focused {
        let cursor_x = (col as u16).min(inner.width.saturating_sub(1));
        frame.set_cursor_position((inner.x + cursor_x, inner.y + row - scroll));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let (mode_text, mode_style) = if app.settings.open {
        (" SETTINGS ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    let hints = if app.settings.open {
        vec![
            Span::styled(" Tab ", key_style),
            Span::styled(" field ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" save ", label_style),
            Span::styled(" ^T ", key_style),
            Span::styled(" test ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" close ", label_style),
        ]
    } else {
        let mut hints = vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Alt+Enter ", key_style),
            Span::styled(" newline ", label_style),
            Span::styled(" PgUp/PgDn ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" ^S ", key_style),
            Span::styled(" settings ", label_style),
            Span::styled(" ^C ", key_style),
            Span::styled(" quit ", label_style),
        ];
        let waiting = app.chats_in_flight();
        if waiting > 0 {
            hints.push(Span::styled(
                format!(" {} waiting ", waiting),
                Style::default().bg(Color::Black).fg(Color::Yellow),
            ));
        }
        hints
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

/// Mask a key with asterisks, keeping the last four characters visible
fn mask_key(key: &str) -> String {
    let len = key.chars().count();
    if len <= 4 {
        "*".repeat(len)
    } else {
        let masked_len = len - 4;
        let last_four: String = key.chars().skip(masked_len).collect();
        format!("{}...{}", "*".repeat(masked_len.min(20)), last_four)
    }
}

fn render_settings(app: &App, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 70, 11);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Endpoint Settings ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let label_width = 10;
    let mut cursor = None;

    for (i, field) in SettingsField::all().into_iter().enumerate() {
        let y = inner.y + (i as u16) * 2;
        if y >= inner.y + inner.height {
            break;
        }
        let focused = app.settings.focus == field;
        let value = app.settings.field(field);

        let label_style = if focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        frame.render_widget(
            Paragraph::new(field.label()).style(label_style),
            Rect::new(inner.x, y, label_width, 1),
        );

        let value_area = Rect::new(
            inner.x + label_width,
            y,
            inner.width.saturating_sub(label_width),
            1,
        );
        let content = match field {
            SettingsField::ApiKey if value.is_empty() => Span::styled(
                app.settings.key_hint.clone().unwrap_or_default(),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ),
            SettingsField::ApiKey => Span::styled(mask_key(value.value()), Style::default().fg(Color::Cyan)),
            _ => Span::styled(value.value().to_string(), Style::default().fg(Color::White)),
        };
        frame.render_widget(Paragraph::new(Line::from(content)), value_area);

        if focused {
            let col = match field {
                // Masked text does not line up with the real cursor; park at the end
                SettingsField::ApiKey => mask_key(value.value()).chars().count(),
                _ => value.cursor(),
            };
            let cursor_x = (col as u16).min(value_area.width.saturating_sub(1));
            cursor = Some((value_area.x + cursor_x, y));
        }
    }

    let help = Paragraph::new("Enter saves, Ctrl+T tests the connection, Esc closes.")
        .style(Style::default().fg(Color::DarkGray));
    let help_y = inner.y + inner.height.saturating_sub(1);
    frame.render_widget(help, Rect::new(inner.x, help_y, inner.width, 1));

    if let Some(position) = cursor {
        if !app.busy.is_active() {
            frame.set_cursor_position(position);
        }
    }
}

fn render_busy(frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 18, 3);
    frame.render_widget(Clear, popup_area);

    let loader = Paragraph::new(Line::from(Span::styled(
        "Working...",
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    )
    .centered();
    frame.render_widget(loader, popup_area);
}

/// Toasts stack upward from just above the footer, newest at the bottom.
fn render_toasts(app: &App, frame: &mut Frame, bottom: u16) {
    let now = Instant::now();
    let area = frame.area();
    let width = TOAST_WIDTH.min(area.width);
    let x = area.x + (area.width.saturating_sub(width)) / 2;

    let mut y = bottom;
    for toast in app.notifier.iter().collect::<Vec<_>>().into_iter().rev() {
        if y == area.y {
            break;
        }
        y -= 1;

        let mut style = severity_style(toast.severity);
        if toast.phase(now) == Phase::Leaving {
            style = style.add_modifier(Modifier::DIM);
        }

        let toast_area = Rect::new(x, y, width, 1);
        frame.render_widget(Clear, toast_area);
        frame.render_widget(
            Paragraph::new(format!(" {} ", toast.text)).style(style).centered(),
            toast_area,
        );
    }
}
