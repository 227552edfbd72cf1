//! Installed bundle and tool link management screen

use anyhow::Result;
use ratatui::{
    crossterm::event::{KeyCode, KeyEvent, KeyModifiers},
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Tabs},
    Frame,
};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use super::bars::{render_help, render_status, StatusLine};
use super::events::{AppEvent, Screen};
use super::list::ListPane;
use super::modal::{centered_rect, frame_modal, render_confirm, render_text};
use super::task::{describe, BackgroundTask, TaskDesk, TaskEvent};
use super::theme::{Theme, Tone};
use crate::context::HubContext;
use skillhub_core::hub::InstalledBundle;
use skillhub_core::sync::LinkedSkill;
use skillhub_core::target::MANIFEST_FILE;
use skillhub_core::tools::Scope;
use skillhub_core::{BundleId, HubError, OperationReport, Outcome, Target};

const HUB_TAB: &str = "skill-hub";

/// One line in a tab
#[derive(Debug, Clone)]
enum Row {
    Bundle(InstalledBundle),
    Linked { tool: String, skill: LinkedSkill },
}

impl Row {
    fn directory(&self) -> &Path {
        match self {
            Row::Bundle(bundle) => &bundle.path,
            Row::Linked { skill, .. } => &skill.path,
        }
    }

    fn title(&self) -> String {
        match self {
            Row::Bundle(bundle) => bundle.id.to_string(),
            Row::Linked { skill, .. } => format!("{} ({})", skill.name, skill.scope),
        }
    }
}

struct ManageTab {
    title: String,
    rows: ListPane<Row>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    View,
    Update,
    Uninstall,
    SyncProject,
    SyncGlobal,
    RemoveLink,
}

impl Action {
    fn for_row(row: &Row) -> Vec<Action> {
        match row {
            Row::Bundle(_) => vec![
                Action::View,
                Action::Update,
                Action::Uninstall,
                Action::SyncProject,
                Action::SyncGlobal,
            ],
            Row::Linked { .. } => vec![Action::View, Action::RemoveLink],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::View => "View SKILL.md",
            Action::Update => "Update",
            Action::Uninstall => "Uninstall",
            Action::SyncProject => "Sync to project",
            Action::SyncGlobal => "Sync to global",
            Action::RemoveLink => "Remove link",
        };
        f.write_str(label)
    }
}

/// A tool offered in the sync picker
#[derive(Debug, Clone)]
struct ToolChoice {
    name: String,
    chosen: bool,
}

enum Mode {
    Browse,
    Actions(ListPane<Action>),
    Confirm(BundleId),
    View {
        title: String,
        body: String,
        scroll: u16,
    },
    PickTools {
        bundle: BundleId,
        scope: Scope,
        tools: ListPane<ToolChoice>,
        force: bool,
    },
    /// A forced sync would replace existing skill directories
    ConfirmForce {
        bundle: BundleId,
        scope: Scope,
        tools: Vec<String>,
        conflicts: Vec<String>,
    },
}

pub struct ManageApp {
    ctx: Arc<HubContext>,
    theme: Theme,
    tabs: Vec<ManageTab>,
    current: usize,
    mode: Mode,
    desk: TaskDesk,
    status: Option<StatusLine>,
    tick: usize,
    quit: bool,
}

impl ManageApp {
    pub fn new(ctx: Arc<HubContext>) -> Result<Self> {
        let tabs = build_tabs(&ctx)?;
        Ok(Self {
            ctx,
            theme: Theme::default(),
            tabs,
            current: 0,
            mode: Mode::Browse,
            desk: TaskDesk::default(),
            status: None,
            tick: 0,
            quit: false,
        })
    }

    /// Hand over unfinished tasks once the screen closes
    pub fn into_desk(self) -> TaskDesk {
        self.desk
    }

    /// Re-read the cache and tool directories, staying on the same tab
    fn rebuild(&mut self) {
        let title = self.tabs.get(self.current).map(|t| t.title.clone());
        let selected = self
            .tabs
            .get(self.current)
            .and_then(|t| t.rows.selected_index())
            .unwrap_or(0);

        match build_tabs(&self.ctx) {
            Ok(tabs) => {
                self.tabs = tabs;
                self.current = title
                    .and_then(|title| self.tabs.iter().position(|t| t.title == title))
                    .unwrap_or(0);
                if let Some(tab) = self.tabs.get_mut(self.current) {
                    for _ in 0..selected {
                        tab.rows.next();
                    }
                }
            }
            Err(e) => self.set_status(e.to_string(), Tone::Error),
        }
    }

    fn set_status(&mut self, text: impl Into<String>, tone: Tone) {
        self.status = Some(StatusLine::new(text, tone));
    }

    fn show_report(&mut self, label: &str, report: OperationReport) {
        let (text, tone) = describe(label, &Ok(report));
        self.set_status(text, tone);
    }

    fn current_tab(&self) -> Option<&ManageTab> {
        self.tabs.get(self.current)
    }

    fn selected_row(&self) -> Option<Row> {
        self.current_tab()
            .and_then(|tab| tab.rows.selected())
            .cloned()
    }

    fn poll_tasks(&mut self) {
        let mut finished = false;
        for event in self.desk.tick() {
            match event {
                TaskEvent::Finished { label, result } => {
                    let (text, tone) = describe(&label, &result);
                    self.set_status(text, tone);
                    finished = true;
                }
                TaskEvent::MovedToBackground { label } => self.set_status(
                    format!("{label}: still running in background"),
                    Tone::Warning,
                ),
            }
        }
        if finished {
            self.rebuild();
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit = true;
            return;
        }

        if self.desk.is_busy() {
            return;
        }

        let mode = std::mem::replace(&mut self.mode, Mode::Browse);
        self.mode = match mode {
            Mode::Browse => self.handle_browse_key(key),
            Mode::Actions(actions) => self.handle_actions_key(key, actions),
            Mode::Confirm(bundle) => self.handle_confirm_key(key, bundle),
            Mode::View {
                title,
                body,
                scroll,
            } => handle_view_key(key, title, body, scroll),
            Mode::PickTools {
                bundle,
                scope,
                tools,
                force,
            } => self.handle_pick_key(key, bundle, scope, tools, force),
            Mode::ConfirmForce {
                bundle,
                scope,
                tools,
                ..
            } => self.handle_force_key(key, bundle, scope, tools),
        };
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Mode {
        let tab_count = self.tabs.len().max(1);
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.quit = true,
            KeyCode::Tab | KeyCode::Right => self.current = (self.current + 1) % tab_count,
            KeyCode::BackTab | KeyCode::Left => {
                self.current = (self.current + tab_count - 1) % tab_count
            }
            KeyCode::Char('r') => self.rebuild(),
            KeyCode::Enter => {
                if let Some(row) = self.selected_row() {
                    return Mode::Actions(ListPane::new(Action::for_row(&row)));
                }
            }
            KeyCode::Up | KeyCode::Down | KeyCode::Home | KeyCode::End => {
                if let Some(tab) = self.tabs.get_mut(self.current) {
                    match key.code {
                        KeyCode::Up => tab.rows.previous(),
                        KeyCode::Down => tab.rows.next(),
                        KeyCode::Home => tab.rows.first(),
                        _ => tab.rows.last(),
                    }
                }
            }
            _ => {}
        }
        Mode::Browse
    }

    fn handle_actions_key(&mut self, key: KeyEvent, mut actions: ListPane<Action>) -> Mode {
        match key.code {
            KeyCode::Esc => Mode::Browse,
            KeyCode::Up => {
                actions.previous();
                Mode::Actions(actions)
            }
            KeyCode::Down => {
                actions.next();
                Mode::Actions(actions)
            }
            KeyCode::Enter => match (actions.selected().copied(), self.selected_row()) {
                (Some(action), Some(row)) => self.run_action(action, row),
                _ => Mode::Browse,
            },
            _ => Mode::Actions(actions),
        }
    }

    fn run_action(&mut self, action: Action, row: Row) -> Mode {
        match (action, row) {
            (Action::View, row) => {
                let path = row.directory().join(MANIFEST_FILE);
                match std::fs::read_to_string(&path) {
                    Ok(body) => Mode::View {
                        title: row.title(),
                        body,
                        scroll: 0,
                    },
                    Err(e) => {
                        self.set_status(format!("{}: {}", path.display(), e), Tone::Error);
                        Mode::Browse
                    }
                }
            }
            (Action::Update, Row::Bundle(bundle)) => {
                let ctx = Arc::clone(&self.ctx);
                let target = Target::Bundle(bundle.id.clone());
                self.desk.start(BackgroundTask::spawn(
                    format!("Updating {}", bundle.id),
                    async move { ctx.cache.update(&target, &ctx.catalog).await },
                ));
                Mode::Browse
            }
            (Action::Uninstall, Row::Bundle(bundle)) => Mode::Confirm(bundle.id),
            (Action::SyncProject, Row::Bundle(bundle)) => {
                self.open_picker(bundle.id, Scope::Project)
            }
            (Action::SyncGlobal, Row::Bundle(bundle)) => {
                self.open_picker(bundle.id, Scope::Global)
            }
            (Action::RemoveLink, Row::Linked { tool, skill }) => {
                let label = format!("{} ({})", skill.name, tool);
                match self.ctx.sync.remove_link(&tool, skill.scope, &skill.name) {
                    Ok(report) => self.show_report(&label, report),
                    Err(e) => self.set_status(format!("{label}: {e}"), Tone::Error),
                }
                self.rebuild();
                Mode::Browse
            }
            _ => Mode::Browse,
        }
    }

    fn open_picker(&mut self, bundle: BundleId, scope: Scope) -> Mode {
        let tools: Vec<ToolChoice> = self
            .ctx
            .sync
            .tools()
            .present_in(scope)
            .into_iter()
            .map(|name| ToolChoice {
                name,
                chosen: false,
            })
            .collect();

        if tools.is_empty() {
            self.set_status(format!("No tools found at {scope} scope"), Tone::Warning);
            return Mode::Browse;
        }

        Mode::PickTools {
            bundle,
            scope,
            tools: ListPane::new(tools),
            force: false,
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent, bundle: BundleId) -> Mode {
        if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
            let ctx = Arc::clone(&self.ctx);
            let label = format!("Uninstalling {bundle}");
            let target = Target::Bundle(bundle);
            self.desk.start(BackgroundTask::spawn(label, async move {
                ctx.cache.uninstall(&target).await
            }));
        }
        Mode::Browse
    }

    fn handle_pick_key(
        &mut self,
        key: KeyEvent,
        bundle: BundleId,
        scope: Scope,
        mut tools: ListPane<ToolChoice>,
        mut force: bool,
    ) -> Mode {
        match key.code {
            KeyCode::Esc => return Mode::Browse,
            KeyCode::Up => tools.previous(),
            KeyCode::Down => tools.next(),
            KeyCode::Char(' ') => {
                if let Some(choice) = tools.selected_mut() {
                    choice.chosen = !choice.chosen;
                }
            }
            KeyCode::Char('a') => {
                let all = tools.items().iter().all(|t| t.chosen);
                for choice in tools.items_mut() {
                    choice.chosen = !all;
                }
            }
            KeyCode::Char('f') => force = !force,
            KeyCode::Enter => {
                let chosen: Vec<String> = tools
                    .items()
                    .iter()
                    .filter(|t| t.chosen)
                    .map(|t| t.name.clone())
                    .collect();
                if chosen.is_empty() {
                    self.set_status("Select at least one tool with Space", Tone::Warning);
                } else {
                    let conflicts = if force {
                        self.conflicts(&bundle, scope, &chosen)
                    } else {
                        Vec::new()
                    };
                    if !conflicts.is_empty() {
                        return Mode::ConfirmForce {
                            bundle,
                            scope,
                            tools: chosen,
                            conflicts,
                        };
                    }
                    self.sync_to(&bundle, scope, &chosen, force);
                    self.rebuild();
                    return Mode::Browse;
                }
            }
            _ => {}
        }

        Mode::PickTools {
            bundle,
            scope,
            tools,
            force,
        }
    }

    /// `tool/skill` for every chosen tool already holding a skill directory
    /// under this bundle's name
    fn conflicts(&self, bundle: &BundleId, scope: Scope, tools: &[String]) -> Vec<String> {
        let names = [bundle.skill.clone()];
        tools
            .iter()
            .flat_map(|tool| {
                self.ctx
                    .sync
                    .find_conflicting(&names, tool, scope)
                    .unwrap_or_default()
                    .into_iter()
                    .map(move |name| format!("{tool}/{name}"))
            })
            .collect()
    }

    fn handle_force_key(
        &mut self,
        key: KeyEvent,
        bundle: BundleId,
        scope: Scope,
        tools: Vec<String>,
    ) -> Mode {
        if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
            self.sync_to(&bundle, scope, &tools, true);
            self.rebuild();
        } else {
            self.set_status(format!("Sync of {bundle} cancelled"), Tone::Warning);
        }
        Mode::Browse
    }

    fn sync_to(&mut self, bundle: &BundleId, scope: Scope, tools: &[String], force: bool) {
        let target = Target::Bundle(bundle.clone());
        let mut report = OperationReport::new();
        for tool in tools {
            match self.ctx.sync.sync(tool, &target, scope, force) {
                Ok(r) => report.merge(r),
                Err(e) => report.push(
                    format!("{bundle} ({tool})"),
                    Outcome::Failed(e.to_string()),
                ),
            }
        }
        self.show_report(&format!("Sync {bundle} ({scope})"), report);
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles = self.tabs.iter().map(|t| format!(" {} ", t.title));
        let tabs = Tabs::new(titles)
            .select(self.current)
            .highlight_style(self.theme.focused)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" skill-hub manage "),
            );
        frame.render_widget(tabs, area);
    }

    fn render_rows(&self, frame: &mut Frame, area: Rect) {
        let Some(tab) = self.current_tab() else {
            return;
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} · {} ", tab.title, tab.rows.items().len()));

        if tab.rows.is_empty() {
            let hint = if tab.title == HUB_TAB {
                "No bundles installed. Try `skill-hub search`."
            } else {
                "No skills linked for this tool."
            };
            frame.render_widget(
                Paragraph::new(Span::styled(hint, self.theme.muted)).block(block),
                area,
            );
            return;
        }

        let items: Vec<ListItem> = tab
            .rows
            .items()
            .iter()
            .map(|row| ListItem::new(self.row_line(row)))
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(self.theme.selected)
            .highlight_symbol("▶ ");
        let mut state = tab.rows.state();
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn row_line(&self, row: &Row) -> Line<'static> {
        let mut spans = vec![Span::styled(row.title(), self.theme.highlight)];
        match row {
            Row::Bundle(bundle) if bundle.legacy => {
                spans.push(Span::styled("  (legacy layout)", self.theme.muted));
            }
            Row::Bundle(_) => {}
            Row::Linked { skill, .. } => {
                if let Some(target) = &skill.target {
                    spans.push(Span::styled(
                        format!("  -> {}", target.display()),
                        self.theme.muted,
                    ));
                }
                if skill.is_dangling() {
                    spans.push(Span::styled("  [dangling]", self.theme.error));
                }
            }
        }
        Line::from(spans)
    }

    fn render_actions(&self, frame: &mut Frame, actions: &ListPane<Action>) {
        let area = centered_rect(40, 40, frame.area());
        let title = self
            .selected_row()
            .map(|row| row.title())
            .unwrap_or_default();
        let inner = frame_modal(frame, area, &title, &self.theme);

        let items: Vec<ListItem> = actions
            .items()
            .iter()
            .map(|a| ListItem::new(a.to_string()))
            .collect();
        let list = List::new(items)
            .highlight_style(self.theme.selected)
            .highlight_symbol("▶ ");
        let mut state = actions.state();
        frame.render_stateful_widget(list, inner, &mut state);
    }

    fn render_picker(
        &self,
        frame: &mut Frame,
        bundle: &BundleId,
        scope: Scope,
        tools: &ListPane<ToolChoice>,
        force: bool,
    ) {
        let area = centered_rect(50, 60, frame.area());
        let inner = frame_modal(frame, area, &format!("Sync {bundle} ({scope})"), &self.theme);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1), Constraint::Length(1)])
            .split(inner);

        let items: Vec<ListItem> = tools
            .items()
            .iter()
            .map(|choice| {
                let (mark, style) = if choice.chosen {
                    ("[✓] ", self.theme.success)
                } else {
                    ("[ ] ", self.theme.muted)
                };
                ListItem::new(Line::from(vec![
                    Span::styled(mark, style),
                    Span::raw(choice.name.clone()),
                ]))
            })
            .collect();
        let list = List::new(items).highlight_style(self.theme.selected);
        let mut state = tools.state();
        frame.render_stateful_widget(list, chunks[0], &mut state);

        let force_line = if force {
            Span::styled("force: on (replace existing entries)", self.theme.warning)
        } else {
            Span::styled("force: off", self.theme.muted)
        };
        frame.render_widget(Paragraph::new(force_line), chunks[1]);
        render_help(
            frame,
            chunks[2],
            &[("Space", "Toggle"), ("a", "All"), ("f", "Force"), ("Enter", "Sync")],
            &self.theme,
        );
    }
}

fn handle_view_key(key: KeyEvent, title: String, body: String, scroll: u16) -> Mode {
    let scroll = match key.code {
        KeyCode::Esc | KeyCode::Char('q') => return Mode::Browse,
        KeyCode::Up => scroll.saturating_sub(1),
        KeyCode::Down => scroll.saturating_add(1),
        KeyCode::PageUp => scroll.saturating_sub(10),
        KeyCode::PageDown => scroll.saturating_add(10),
        KeyCode::Home => 0,
        _ => scroll,
    };
    Mode::View {
        title,
        body,
        scroll,
    }
}

/// The hub tab followed by one tab per tool present on this machine
fn build_tabs(ctx: &HubContext) -> skillhub_core::Result<Vec<ManageTab>> {
    let bundles = ctx.cache.list()?.into_iter().map(Row::Bundle).collect();
    let mut tabs = vec![ManageTab {
        title: HUB_TAB.to_string(),
        rows: ListPane::new(bundles),
    }];

    for tool in ctx.sync.tools().present() {
        let mut rows = Vec::new();
        for scope in [Scope::Project, Scope::Global] {
            match ctx.sync.linked_skills(&tool, scope) {
                Ok(skills) => rows.extend(skills.into_iter().map(|skill| Row::Linked {
                    tool: tool.clone(),
                    skill,
                })),
                Err(HubError::ScopeNotConfigured { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        tabs.push(ManageTab {
            title: tool,
            rows: ListPane::new(rows),
        });
    }

    Ok(tabs)
}

impl Screen for ManageApp {
    fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(frame.area());

        self.render_tabs(frame, chunks[0]);
        self.render_rows(frame, chunks[1]);
        render_status(
            frame,
            chunks[2],
            &self.desk,
            self.status.as_ref(),
            self.tick,
            &self.theme,
        );
        render_help(
            frame,
            chunks[3],
            &[
                ("←→", "Tabs"),
                ("↑↓", "Move"),
                ("Enter", "Actions"),
                ("r", "Reload"),
                ("q", "Quit"),
            ],
            &self.theme,
        );

        match &self.mode {
            Mode::Browse => {}
            Mode::Actions(actions) => self.render_actions(frame, actions),
            Mode::Confirm(bundle) => {
                render_confirm(frame, &format!("Uninstall {bundle}?"), &self.theme)
            }
            Mode::View {
                title,
                body,
                scroll,
            } => render_text(frame, title, body, *scroll, &self.theme),
            Mode::PickTools {
                bundle,
                scope,
                tools,
                force,
            } => self.render_picker(frame, bundle, *scope, tools, *force),
            Mode::ConfirmForce { conflicts, .. } => render_confirm(
                frame,
                &format!("Replace existing {}?", conflicts.join(", ")),
                &self.theme,
            ),
        }
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
