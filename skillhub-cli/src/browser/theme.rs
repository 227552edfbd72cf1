use ratatui::style::{Color, Modifier, Style};

/// Consistent styling for the browser screens
pub struct Theme {
    pub selected: Style,
    pub focused: Style,
    pub error: Style,
    pub success: Style,
    pub warning: Style,
    pub muted: Style,
    pub highlight: Style,
    pub modal_border: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            selected: Style::default()
                .bg(Color::Rgb(50, 50, 80))
                .add_modifier(Modifier::BOLD),
            focused: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            success: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            warning: Style::default().fg(Color::Yellow),
            muted: Style::default().fg(Color::DarkGray),
            highlight: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            modal_border: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        }
    }
}

/// Severity of a status line message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Error,
}

impl Theme {
    pub fn tone(&self, tone: Tone) -> Style {
        match tone {
            Tone::Info => self.highlight,
            Tone::Success => self.success,
            Tone::Warning => self.warning,
            Tone::Error => self.error,
        }
    }

    /// Braille spinner frame for a tick counter
    pub fn spinner(tick: usize) -> &'static str {
        const FRAMES: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];
        FRAMES[tick % FRAMES.len()]
    }
}
