//! Catalog search screen

use anyhow::Result;
use ratatui::{
    crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers},
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Tabs},
    Frame,
};
use std::sync::Arc;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use super::bars::{render_help, render_status, StatusLine};
use super::events::{AppEvent, Screen};
use super::list::ListPane;
use super::task::{describe, BackgroundTask, TaskDesk, TaskEvent};
use super::theme::{Theme, Tone};
use crate::context::HubContext;
use skillhub_core::catalog::{CatalogEntry, CatalogKind, SearchPage};

const TABS: [CatalogKind; 2] = [CatalogKind::Skills, CatalogKind::Repos];

pub struct SearchApp {
    ctx: Arc<HubContext>,
    theme: Theme,
    kind: CatalogKind,
    input: Input,
    page: usize,
    results: ListPane<String>,
    last_page: Option<SearchPage>,
    desk: TaskDesk,
    status: Option<StatusLine>,
    tick: usize,
    quit: bool,
}

impl SearchApp {
    pub fn new(ctx: Arc<HubContext>, query: String, notice: Option<String>) -> Result<Self> {
        let mut app = Self {
            ctx,
            theme: Theme::default(),
            kind: CatalogKind::Skills,
            input: Input::new(query),
            page: 1,
            results: ListPane::default(),
            last_page: None,
            desk: TaskDesk::default(),
            status: notice.map(|text| StatusLine::new(text, Tone::Warning)),
            tick: 0,
            quit: false,
        };
        app.reload()?;
        Ok(app)
    }

    /// Hand over unfinished tasks once the screen closes
    pub fn into_desk(self) -> TaskDesk {
        self.desk
    }

    fn reload(&mut self) -> skillhub_core::Result<()> {
        let page = self.ctx.catalog.search(
            self.kind,
            self.input.value(),
            self.page,
            self.ctx.config.page_size,
        )?;
        self.page = page.page;
        self.results = ListPane::new(page.items.clone());
        self.last_page = Some(page);
        Ok(())
    }

    fn refresh_results(&mut self) {
        if let Err(e) = self.reload() {
            self.status = Some(StatusLine::new(e.to_string(), Tone::Error));
        }
    }

    fn switch_tab(&mut self) {
        self.kind = match self.kind {
            CatalogKind::Skills => CatalogKind::Repos,
            CatalogKind::Repos => CatalogKind::Skills,
        };
        self.page = 1;
        self.refresh_results();
    }

    fn change_page(&mut self, forward: bool) {
        let Some(current) = &self.last_page else {
            return;
        };
        if forward && current.has_next() {
            self.page += 1;
        } else if !forward && self.page > 1 {
            self.page -= 1;
        } else {
            return;
        }
        self.refresh_results();
    }

    fn install_selected(&mut self) {
        let Some(line) = self.results.selected() else {
            return;
        };

        let entry = match CatalogEntry::parse(line) {
            Ok(entry) => entry,
            Err(e) => {
                self.status = Some(StatusLine::new(e.to_string(), Tone::Error));
                return;
            }
        };

        let label = entry.target.to_string();
        let ctx = Arc::clone(&self.ctx);
        let target = entry.target;
        self.desk.start(BackgroundTask::spawn(label, async move {
            ctx.cache.install(&target, false).await
        }));
    }

    fn poll_tasks(&mut self) {
        for event in self.desk.tick() {
            let (text, tone) = match event {
                TaskEvent::Finished { label, result } => describe(&label, &result),
                TaskEvent::MovedToBackground { label } => {
                    (format!("{label}: still running in background"), Tone::Warning)
                }
            };
            self.status = Some(StatusLine::new(text, tone));
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        {
            self.quit = true;
            return;
        }

        if self.desk.is_busy() {
            return;
        }

        match key.code {
            KeyCode::Tab | KeyCode::BackTab => self.switch_tab(),
            KeyCode::Up => self.results.previous(),
            KeyCode::Down => self.results.next(),
            KeyCode::PageDown => self.change_page(true),
            KeyCode::PageUp => self.change_page(false),
            KeyCode::Enter => self.install_selected(),
            _ => {
                let changed = self.input.handle_event(&Event::Key(key));
                if changed.is_some_and(|c| c.value) {
                    self.page = 1;
                    self.refresh_results();
                }
            }
        }
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles = TABS.iter().map(|kind| match kind {
            CatalogKind::Skills => " Skills ",
            CatalogKind::Repos => " Repos ",
        });
        let selected = TABS.iter().position(|k| *k == self.kind).unwrap_or(0);

        let tabs = Tabs::new(titles)
            .select(selected)
            .highlight_style(self.theme.focused)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" skill-hub search "),
            );
        frame.render_widget(tabs, area);
    }

    fn render_input(&self, frame: &mut Frame, area: Rect) {
        let width = area.width.max(3) - 3;
        let scroll = self.input.visual_scroll(width as usize);

        let input = Paragraph::new(self.input.value())
            .scroll((0, scroll as u16))
            .block(Block::default().borders(Borders::ALL).title(" Filter "));
        frame.render_widget(input, area);

        if !self.desk.is_busy() {
            let cursor = self.input.visual_cursor().max(scroll) - scroll;
            frame.set_cursor_position((area.x + cursor as u16 + 1, area.y + 1));
        }
    }

    fn render_results(&self, frame: &mut Frame, area: Rect) {
        let title = match &self.last_page {
            Some(page) => format!(
                " {} · page {}/{} · {} matches ",
                self.kind,
                page.page,
                page.page_count(),
                page.total
            ),
            None => format!(" {} ", self.kind),
        };
        let block = Block::default().borders(Borders::ALL).title(title);

        if self.results.is_empty() {
            let empty = Paragraph::new(Span::styled("No matches", self.theme.muted)).block(block);
            frame.render_widget(empty, area);
            return;
        }

        let items: Vec<ListItem> = self
            .results
            .items()
            .iter()
            .map(|line| ListItem::new(entry_line(line, &self.theme)))
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(self.theme.selected)
            .highlight_symbol("▶ ");
        let mut state = self.results.state();
        frame.render_stateful_widget(list, area, &mut state);
    }
}

/// Identifier in bold, metadata columns dimmed
fn entry_line<'a>(line: &'a str, theme: &Theme) -> Line<'a> {
    let mut fields = line.split('\t');
    let mut spans = vec![Span::styled(
        fields.next().unwrap_or_default(),
        theme.highlight,
    )];
    for field in fields.filter(|f| !f.trim().is_empty()) {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(field.trim(), theme.muted));
    }
    Line::from(spans)
}

impl Screen for SearchApp {
    fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(frame.area());

        self.render_tabs(frame, chunks[0]);
        self.render_input(frame, chunks[1]);
        self.render_results(frame, chunks[2]);
        render_status(
            frame,
            chunks[3],
            &self.desk,
            self.status.as_ref(),
            self.tick,
            &self.theme,
        );
        render_help(
            frame,
            chunks[4],
            &[
                ("↑↓", "Move"),
                ("PgUp/PgDn", "Page"),
                ("Tab", "Skills/Repos"),
                ("Enter", "Install"),
                ("Esc", "Quit"),
            ],
            &self.theme,
        );
    }

    fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Tick => {
                self.tick = self.tick.wrapping_add(1);
                self.poll_tasks();
            }
            AppEvent::Resize(..) => {}
        }
        Ok(())
    }

    fn should_quit(&self) -> bool {
        self.quit
    }
}
