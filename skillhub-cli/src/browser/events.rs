//! Terminal event loop shared by the browser screens

use anyhow::Result;
use ratatui::{
    crossterm::event::{self, Event, KeyEvent, KeyEventKind},
    DefaultTerminal, Frame,
};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::time;

/// Everything a screen reacts to
#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    /// Fired when no input arrived for a while; drives spinners and task polling
    Tick,
}

/// A full-screen view driven by [`run`]
pub trait Screen {
    fn render(&mut self, frame: &mut Frame);

    fn handle_event(&mut self, event: AppEvent) -> Result<()>;

    fn should_quit(&self) -> bool;
}

/// Take over the terminal until the screen quits
pub async fn run<S: Screen>(screen: &mut S) -> Result<()> {
    let mut terminal = ratatui::init();
    terminal.clear()?;

    let (event_tx, mut event_rx) = unbounded_channel();

    // Blocking reads live on a detached thread so runtime shutdown never
    // waits on a pending read
    std::thread::spawn(move || loop {
        let forwarded = match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                event_tx.send(AppEvent::Key(key))
            }
            Ok(Event::Resize(width, height)) => event_tx.send(AppEvent::Resize(width, height)),
            Ok(_) => Ok(()),
            Err(_) => break,
        };
        if forwarded.is_err() {
            break;
        }
    });

    let result = main_loop(screen, &mut terminal, &mut event_rx).await;

    ratatui::restore();
    result
}

async fn main_loop<S: Screen>(
    screen: &mut S,
    terminal: &mut DefaultTerminal,
    event_rx: &mut UnboundedReceiver<AppEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| screen.render(frame))?;

        match time::timeout(Duration::from_millis(100), event_rx.recv()).await {
            Ok(Some(event)) => screen.handle_event(event)?,
            Ok(None) => break,
            Err(_) => screen.handle_event(AppEvent::Tick)?,
        }

        if screen.should_quit() {
            break;
        }
    }

    Ok(())
}
