use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap},
};
use dost::{Entry, MoodTier, Sender};
use crate::app::{App, InputMode};

/// Render `**bold**` spans; everything else is literal
fn parse_markdown_line(text: &str) -> Line<'static> {
    let parts: Vec<&str> = text.split("**").collect();
    // An odd number of parts means every ** has a partner
    if parts.len() % 2 == 0 {
        return Line::from(text.to_string());
    }

    let spans: Vec<Span<'static>> = parts
        .iter()
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| {
            if i % 2 == 1 {
                Span::styled(part.to_string(), Style::default().add_modifier(Modifier::BOLD))
            } else {
                Span::raw(part.to_string())
            }
        })
        .collect();

    Line::from(spans)
}

fn tier_color(tier: MoodTier) -> Color {
    match tier {
        MoodTier::Positive => Color::Green,
        MoodTier::Caution => Color::Yellow,
        MoodTier::Negative => Color::Red,
    }
}

/// Centered popup area clamped to the frame
fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    // Sidebar only when there is something to put in it
    let has_sidebar = app.controller.mood_gauge().is_some()
        || app.controller.consent().is_some()
        || app.controller.location_field().is_some();
    let [chat_area, sidebar_area] = if has_sidebar {
        Layout::horizontal([Constraint::Min(0), Constraint::Length(28)]).areas(body_area)
    } else {
        Layout::horizontal([Constraint::Min(0), Constraint::Length(0)]).areas(body_area)
    };

    render_chat(app, frame, chat_area);
    if has_sidebar {
        render_sidebar(app, frame, sidebar_area);
    }

    render_footer(app, frame, footer_area);

    // Crisis dialog sits above everything else
    if app.controller.crisis().is_some() {
        render_crisis_dialog(app, frame, area);
    } else if app.show_settings {
        render_settings(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Dost ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.endpoint.clone(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    if let Some(status) = &app.status {
        let line = Line::from(Span::styled(format!(" {} ", status), Style::default().fg(Color::Yellow)));
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let pairs: Vec<(&str, &str)> = if app.controller.crisis().is_some() {
        vec![("Esc", "close")]
    } else if app.show_settings {
        vec![("Enter", "save"), ("Esc", "cancel")]
    } else {
        match app.input_mode {
            InputMode::Editing => vec![("Enter", "send"), ("Esc", "normal mode")],
            InputMode::Normal => {
                let mut pairs = vec![("i", "type"), ("j/k", "scroll")];
                if app.controller.presets().is_some_and(|p| p.is_visible()) {
                    pairs.push(("1-9", "prompt"));
                }
                if app.controller.location_field().is_some() {
                    pairs.push(("s", "settings"));
                }
                if app.controller.consent().is_some() {
                    pairs.push(("c", "consent"));
                }
                pairs.push(("q", "quit"));
                pairs
            }
        }
    };

    let hints: Vec<Span> = pairs
        .into_iter()
        .flat_map(|(key, label)| {
            [
                Span::styled(format!(" {} ", key), key_style),
                Span::styled(format!(" {} ", label), label_style),
            ]
        })
        .collect();

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let preset_height = match app.controller.presets() {
        Some(panel) if panel.is_visible() => (panel.prompts().len().min(9) + 2) as u16,
        _ => 0,
    };

    let [transcript_area, preset_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(preset_height),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store for mouse hit-testing and scroll calculations (inner size minus borders)
    app.transcript_area = Some(transcript_area);
    app.transcript_height = transcript_area.height.saturating_sub(2);
    app.transcript_width = transcript_area.width.saturating_sub(2);
    app.follow_transcript();

    render_transcript(app, frame, transcript_area);
    if preset_height > 0 {
        render_presets(app, frame, preset_area);
    }
    render_input(app, frame, input_area);
}

fn render_transcript(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.input_mode == InputMode::Normal {
            Color::Cyan
        } else {
            Color::DarkGray
        }))
        .title(" Chat ");

    let you_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let bot_style = Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD);

    let transcript = app.controller.transcript();
    let text = if transcript.is_empty() {
        Text::from(Span::styled(
            "Hi, I'm Dost. How are you feeling today?",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();
        for entry in transcript.entries() {
            match entry {
                Entry::Message(msg) => match msg.sender {
                    Sender::User => {
                        lines.push(Line::from(Span::styled("You:", you_style)));
                        lines.extend(msg.text.lines().map(|l| Line::from(l.to_string())));
                    }
                    Sender::Bot => {
                        lines.push(Line::from(Span::styled("Dost:", bot_style)));
                        lines.extend(msg.text.lines().map(parse_markdown_line));
                    }
                },
                Entry::Typing(_) => {
                    lines.push(Line::from(Span::styled("Dost:", bot_style)));
                    // Animated dots: ".", "..", "..."
                    let dots = ".".repeat((app.animation_frame as usize) + 1);
                    lines.push(Line::from(Span::styled(
                        format!("typing{}", dots),
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                    )));
                }
            }
            lines.push(Line::default());
        }
        Text::from(lines)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.transcript_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_presets(app: &App, frame: &mut Frame, area: Rect) {
    let Some(panel) = app.controller.presets() else {
        return;
    };

    let items: Vec<ListItem> = panel
        .prompts()
        .iter()
        .take(9)
        .enumerate()
        .map(|(i, prompt)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {} ", i + 1), Style::default().bg(Color::DarkGray).fg(Color::White)),
                Span::raw(" "),
                Span::raw(prompt.clone()),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue))
            .title(" Try saying "),
    );

    frame.render_widget(list, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing && !app.show_settings;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(" Message ");

    // Horizontal scroll keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;
    let scroll_offset = if inner_width > 0 && cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .controller
        .input()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    if editing && app.controller.crisis().is_none() {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_sidebar(app: &App, frame: &mut Frame, area: Rect) {
    let [mood_area, info_area] = Layout::vertical([
        Constraint::Length(if app.controller.mood_gauge().is_some() { 5 } else { 0 }),
        Constraint::Min(0),
    ])
    .areas(area);

    if let Some(gauge) = app.controller.mood_gauge() {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Mood ");

        let widget = match gauge.tier() {
            Some(tier) => {
                let label = match gauge.last_mood() {
                    Some(mood) => format!("{} ({})", tier.display_name(), mood.as_str()),
                    None => tier.display_name().to_string(),
                };
                Gauge::default()
                    .block(block)
                    .gauge_style(Style::default().fg(tier_color(tier)).bg(Color::Black))
                    .ratio(tier.needle())
                    .label(label)
            }
            None => Gauge::default()
                .block(block)
                .gauge_style(Style::default().fg(Color::DarkGray).bg(Color::Black))
                .ratio(0.0)
                .label("No reading yet"),
        };
        frame.render_widget(widget, mood_area);
    }

    let mut lines: Vec<Line> = Vec::new();
    if let Some(consent) = app.controller.consent() {
        let (mark, style) = if consent {
            ("[x]", Style::default().fg(Color::Green))
        } else {
            ("[ ]", Style::default().fg(Color::DarkGray))
        };
        lines.push(Line::from(vec![
            Span::styled(mark, style),
            Span::raw(" Share for research"),
        ]));
        lines.push(Line::default());
    }
    if app.controller.location_field().is_some() {
        let location = app
            .controller
            .stored_location()
            .unwrap_or_else(|| "not set".to_string());
        lines.push(Line::from(Span::styled("Location", Style::default().bold())));
        lines.push(Line::from(location));
    }

    let info = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Settings "),
        );
    frame.render_widget(info, info_area);
}

fn render_settings(app: &App, frame: &mut Frame, area: Rect) {
    let Some(field) = app.controller.location_field() else {
        return;
    };

    let popup = popup_area(area, 60, 7);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Settings ");

    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let instructions = Paragraph::new("Your city or area, so replies can be more local. Leave empty to clear.")
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 2));

    let input_area = Rect::new(inner.x, inner.y + 3, inner.width, 1);
    let scroll_offset = app.settings_cursor.saturating_sub(input_area.width.saturating_sub(1) as usize);
    let visible: String = field.chars().skip(scroll_offset).collect();
    frame.render_widget(Paragraph::new(visible).style(Style::default().fg(Color::Cyan)), input_area);

    let cursor_x = (app.settings_cursor - scroll_offset) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}

fn render_crisis_dialog(app: &App, frame: &mut Frame, area: Rect) {
    let Some(alert) = app.controller.crisis() else {
        return;
    };

    let popup = popup_area(area, 56, 9);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
        .title(" You are not alone ");

    let mut lines = vec![
        Line::from("It sounds like you are going through something really hard."),
        Line::default(),
        Line::from("Please reach out to someone who can help right now:"),
    ];
    if let Some(helpline) = &alert.helpline {
        lines.push(Line::from(Span::styled(
            helpline.clone(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled("Press Esc to close", Style::default().fg(Color::DarkGray))));

    let dialog = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(dialog, popup);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold_markdown_is_styled() {
        let line = parse_markdown_line("take **small** breaks");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "small");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_unbalanced_markers_stay_literal() {
        let line = parse_markdown_line("5 ** 2");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "5 ** 2");
    }

    #[test]
    fn test_popup_area_is_centered_and_clamped() {
        let area = Rect::new(0, 0, 40, 10);
        let popup = popup_area(area, 60, 7);
        assert_eq!(popup.width, 36);
        assert_eq!(popup.x, 2);
        assert_eq!(popup.y, 1);
    }
}
