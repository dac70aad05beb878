pub mod corp;
pub mod kai;
pub mod types;
pub mod widgets;

use std::io;
use std::time::Duration;

use crossterm::cursor::Show;
use crossterm::event::Event;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{info, warn};

use crate::errors::CliError;

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self, CliError> {
        enable_raw_mode()
            .map_err(|e| CliError::Generic(format!("Failed to enable raw mode: {e}")))?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)
            .map_err(|e| CliError::Generic(format!("Failed to enter alternate screen: {e}")))?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, Show, LeaveAlternateScreen);
    }
}

/// One full-screen app. Background work reports back through `Msg`.
pub trait Screen {
    type Msg: Send + 'static;

    fn draw(&mut self, f: &mut Frame);

    /// Called once per frame before drawing.
    fn tick(&mut self);

    /// Redraw faster while something is animating or in flight.
    fn busy(&self) -> bool;

    fn should_quit(&self) -> bool;

    fn handle_event(
        &mut self,
        tx: &UnboundedSender<Self::Msg>,
        event: Event,
    ) -> Result<(), CliError>;

    fn handle_msg(&mut self, tx: &UnboundedSender<Self::Msg>, msg: Self::Msg);

    /// Surface an error from `handle_event` without leaving the app.
    fn report_error(&mut self, err: CliError);
}

pub fn reject_json(json: bool, command: &str) -> Result<(), CliError> {
    if json {
        return Err(CliError::Usage(format!(
            "`--json` is not supported for `autocorp {command}`."
        )));
    }
    Ok(())
}

pub fn run<S: Screen>(screen: &mut S) -> Result<(), CliError> {
    let guard = TerminalGuard::enter()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| CliError::Generic(format!("Failed to init terminal: {e}")))?;
    terminal
        .clear()
        .map_err(|e| CliError::Generic(format!("Failed to clear terminal: {e}")))?;
    terminal
        .hide_cursor()
        .map_err(|e| CliError::Generic(format!("Failed to hide cursor: {e}")))?;

    let (tx, mut rx) = mpsc::unbounded_channel::<S::Msg>();
    info!("tui started");

    loop {
        screen.tick();
        terminal
            .draw(|f| screen.draw(f))
            .map_err(|e| CliError::Generic(format!("Failed to draw: {e}")))?;

        if screen.should_quit() {
            break;
        }

        while let Ok(msg) = rx.try_recv() {
            screen.handle_msg(&tx, msg);
        }

        let poll_ms = if screen.busy() { 50 } else { 120 };
        if crossterm::event::poll(Duration::from_millis(poll_ms))
            .map_err(|e| CliError::Generic(format!("Event poll failed: {e}")))?
        {
            let event = crossterm::event::read()
                .map_err(|e| CliError::Generic(format!("Event read failed: {e}")))?;
            if let Err(err) = screen.handle_event(&tx, event) {
                warn!(error = %err, "tui action failed");
                screen.report_error(err);
            }
        }
    }

    terminal
        .show_cursor()
        .map_err(|e| CliError::Generic(format!("Failed to restore cursor: {e}")))?;
    drop(guard);
    info!("tui closed");
    Ok(())
}
