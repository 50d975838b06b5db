use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use crate::app::{App, InputMode, LandingButton};
use crate::conversation::{Controller, Message, Sender, View};

const BACK_LABEL: &str = " ← Home ";

/// Make text safe to hand to the terminal.
///
/// Control characters would otherwise be interpreted by the terminal (escape
/// sequences, cursor movement), so they are swapped for visible stand-ins.
/// Everything else, including `<`, `>` and `&`, is kept literally.
pub fn escape_control(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' => escaped.push_str("    "),
            '\u{0}'..='\u{1f}' => {
                escaped.push(char::from_u32(0x2400 + c as u32).unwrap_or(char::REPLACEMENT_CHARACTER))
            }
            '\u{7f}' => escaped.push('\u{2421}'),
            '\u{80}'..='\u{9f}' => escaped.push(char::REPLACEMENT_CHARACTER),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render one message as lines for the chat log.
///
/// Layout: a sender/time header, one line per line of content, then a blank
/// separator. User messages hug the right edge, tutor messages the left.
pub fn render_message(message: &Message) -> Vec<Line<'static>> {
    let (label, label_style, alignment) = match message.sender {
        Sender::User => (
            "You",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            Alignment::Right,
        ),
        Sender::Ai => (
            "Tutor",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            Alignment::Left,
        ),
    };
    let body_style = match message.sender {
        Sender::User => Style::default().fg(Color::Cyan),
        Sender::Ai => Style::default(),
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(label, label_style),
        Span::styled(
            format!(" · {}", message.timestamp.format("%H:%M")),
            Style::default().fg(Color::DarkGray),
        ),
    ])
    .alignment(alignment)];

    let mut content_lines = message.content.lines().peekable();
    if content_lines.peek().is_none() {
        lines.push(Line::default().alignment(alignment));
    }
    for line in content_lines {
        lines.push(Line::from(Span::styled(escape_control(line), body_style)).alignment(alignment));
    }

    lines.push(Line::default());
    lines
}

/// The conversation log as it is drawn, without its border or scroll offset.
pub fn chat_log(conversation: &Controller) -> Paragraph<'static> {
    let log_text = if conversation.messages().is_empty() {
        Text::from(Span::styled(
            "Type a sentence to check its grammar...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(
            conversation
                .messages()
                .iter()
                .flat_map(render_message)
                .collect::<Vec<_>>(),
        )
    };

    Paragraph::new(log_text).wrap(Wrap { trim: false })
}

fn display_width(text: &str) -> usize {
    Span::raw(text).width()
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

    match app.view() {
        View::Landing => render_landing(app, frame, body_area),
        View::Chat => render_chat(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let pending = app.conversation.in_flight();
    let pending_indicator = if pending > 0 {
        format!("[{} pending] ", pending)
    } else {
        String::new()
    };

    let title = Line::from(vec![
        Span::styled(" AI Grammar Tutor ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(pending_indicator, Style::default().fg(Color::Yellow)),
        Span::styled(format!("{} ", app.api_url), Style::default().fg(Color::Gray)),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match (app.view(), app.input_mode) {
        (View::Landing, _) => " HOME ",
        (View::Chat, InputMode::Normal) => " CHAT ",
        (View::Chat, InputMode::Editing) => " TYPE ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints: &[(&str, &str)] = match (app.view(), app.input_mode) {
        (View::Landing, _) => &[(" Tab ", " switch "), (" Enter ", " start "), (" q ", " quit ")],
        (View::Chat, InputMode::Normal) => &[
            (" i ", " type "),
            (" j/k ", " scroll "),
            (" g/G ", " top/bottom "),
            (" Esc ", " home "),
            (" q ", " quit "),
        ],
        (View::Chat, InputMode::Editing) => &[(" Enter ", " send "), (" Esc ", " stop typing ")],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style)];
    for (key, label) in hints {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(*label, label_style));
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_landing(app: &mut App, frame: &mut Frame, area: Rect) {
    let [hero_area, buttons_area] = Layout::vertical([
        Constraint::Length(11),
        Constraint::Length(3),
    ])
    .flex(Flex::Center)
    .areas(area);

    let accent = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let muted = Style::default().fg(Color::Gray);
    let hero = Text::from(vec![
        Line::from(Span::styled("Master English Grammar", accent)),
        Line::from(Span::styled("with your personal AI tutor", muted)),
        Line::default(),
        Line::from("Type any sentence and get it corrected, with the rule explained"),
        Line::from("in plain words and an example to remember it by."),
        Line::default(),
        Line::from(vec![Span::styled("• ", accent), Span::raw("Instant corrections")]),
        Line::from(vec![Span::styled("• ", accent), Span::raw("Clear explanations")]),
        Line::from(vec![Span::styled("• ", accent), Span::raw("Practice at your own pace")]),
    ])
    .alignment(Alignment::Center);
    frame.render_widget(Paragraph::new(hero).wrap(Wrap { trim: true }), hero_area);

    let [learning_area, journey_area] = Layout::horizontal([Constraint::Length(24), Constraint::Length(24)])
        .flex(Flex::Center)
        .spacing(2)
        .areas(buttons_area);

    for (button, button_area) in [
        (LandingButton::StartLearning, learning_area),
        (LandingButton::StartJourney, journey_area),
    ] {
        let selected = app.landing_selection == button;
        let style = if selected {
            Style::default().bg(Color::Cyan).fg(Color::Black).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        let widget = Paragraph::new(button.label())
            .alignment(Alignment::Center)
            .style(style)
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));
        frame.render_widget(widget, button_area);
    }

    app.start_learning_area = Some(learning_area);
    app.start_journey_area = Some(journey_area);
    app.chat_area = None;
    app.input_area = None;
    app.back_area = None;
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [log_area, typing_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(3),
    ])
    .areas(area);

    app.start_learning_area = None;
    app.start_journey_area = None;
    app.chat_area = Some(log_area);
    app.input_area = Some(input_area);

    // Right-aligned title on the top border, inside the corner
    let back_width = (display_width(BACK_LABEL) as u16).min(log_area.width.saturating_sub(2));
    app.back_area = Some(Rect::new(
        log_area.right().saturating_sub(1 + back_width),
        log_area.y,
        back_width,
        1,
    ));

    // Store log dimensions for scroll calculations (inner size minus borders)
    app.chat_height = log_area.height.saturating_sub(2);
    app.chat_width = log_area.width.saturating_sub(2);
    if app.follow_tail {
        app.scroll_to_bottom();
    }

    let log_focused = app.input_mode == InputMode::Normal;
    let log_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if log_focused { Color::Cyan } else { Color::DarkGray }))
        .title(" Conversation ")
        .title_top(Line::from(Span::styled(BACK_LABEL, Style::default().fg(Color::Cyan))).right_aligned());

    let log = chat_log(&app.conversation)
        .block(log_block)
        .scroll((app.chat_scroll, 0));
    frame.render_widget(log, log_area);

    if app.conversation.is_typing() {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        let typing = Paragraph::new(Span::styled(
            format!(" Tutor is checking your grammar{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ));
        frame.render_widget(typing, typing_area);
    }

    render_input(app, frame, input_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(" Your sentence (Enter to send) ");

    // Horizontal scrolling keeps the cursor inside the box. Offsets are in
    // display columns so wide characters take two cells.
    let input = app.conversation.input();
    let inner_width = area.width.saturating_sub(2) as usize;
    let before_cursor: String = input.text().chars().take(input.cursor()).collect();
    let cursor_col = display_width(&escape_control(&before_cursor));
    let scroll_offset = if inner_width == 0 {
        0
    } else {
        (cursor_col + 1).saturating_sub(inner_width)
    };

    let mut col = 0;
    let mut start_col = None;
    let mut visible_text = String::new();
    let mut buf = [0u8; 4];
    for c in escape_control(input.text()).chars() {
        let width = display_width(c.encode_utf8(&mut buf));
        if col >= scroll_offset {
            let start = *start_col.get_or_insert(col);
            if col + width > start + inner_width {
                break;
            }
            visible_text.push(c);
        }
        col += width;
    }
    let start_col = start_col.unwrap_or(cursor_col);

    let paragraph = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(paragraph, area);

    if editing {
        let cursor_x = cursor_col.saturating_sub(start_col) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}
