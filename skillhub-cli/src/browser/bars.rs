//! Status and help lines at the bottom of each screen

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::task::TaskDesk;
use super::theme::{Theme, Tone};

/// Last message shown to the user
#[derive(Debug, Clone)]
pub struct StatusLine {
    pub text: String,
    pub tone: Tone,
}

impl StatusLine {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }
}

pub fn render_status(
    frame: &mut Frame,
    area: Rect,
    desk: &TaskDesk,
    status: Option<&StatusLine>,
    tick: usize,
    theme: &Theme,
) {
    let mut spans = vec![Span::raw(" ")];

    if let Some(label) = desk.busy_label() {
        spans.push(Span::styled(Theme::spinner(tick), theme.highlight));
        spans.push(Span::raw(format!(" {label}...")));
    } else if let Some(status) = status {
        spans.push(Span::styled(status.text.clone(), theme.tone(status.tone)));
    }

    let pending = desk.background_count();
    if pending > 0 {
        spans.push(Span::styled(
            format!("  ({pending} running in background)"),
            theme.muted,
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// `key description` pairs separated by bullets
pub fn render_help(frame: &mut Frame, area: Rect, keys: &[(&str, &str)], theme: &Theme) {
    let mut spans = vec![Span::raw(" ")];
    for (i, (key, description)) in keys.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("  •  ", theme.muted));
        }
        spans.push(Span::styled(*key, theme.highlight));
        spans.push(Span::raw(format!(" {description}")));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
