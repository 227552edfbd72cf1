//! Modal overlays

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::theme::Theme;

/// Calculate centered modal area
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Clear the area, draw a bordered frame and return its inner area
pub fn frame_modal(frame: &mut Frame, area: Rect, title: &str, theme: &Theme) -> Rect {
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme.modal_border);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    inner
}

/// Yes/no question
pub fn render_confirm(frame: &mut Frame, question: &str, theme: &Theme) {
    let area = centered_rect(50, 20, frame.area());
    let inner = frame_modal(frame, area, "Confirm", theme);

    let text = vec![
        Line::from(question.to_string()),
        Line::from(""),
        Line::from(vec![
            Span::styled("[y]", theme.highlight),
            Span::raw(" Yes  "),
            Span::styled("[N]", theme.highlight),
            Span::raw(" No"),
        ]),
    ];
    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        inner,
    );
}

/// Scrollable read-only text
pub fn render_text(frame: &mut Frame, title: &str, body: &str, scroll: u16, theme: &Theme) {
    let area = centered_rect(80, 80, frame.area());
    let inner = frame_modal(frame, area, title, theme);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    frame.render_widget(
        Paragraph::new(body.to_string())
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new("↑/↓ scroll  Esc close")
            .alignment(Alignment::Center)
            .style(Style::default().patch(theme.muted)),
        chunks[1],
    );
}
