use std::path::Path;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tracing::info;

use super::async_ops::{spawn_architect_log, spawn_directive, spawn_feedback};
use super::types::{App, Mode, SettingsItem, TOOLBOX, TuiMsg, View};
use crate::engine::corp::MAX_META_LOG_CHARS;
use crate::engine::{TurnOverrides, attach_corp_file, read_attachment};
use crate::errors::CliError;
use crate::state::corp::FeedbackOutcome;
use crate::state::message::{AiMode, Feedback, ToolChoice};
use crate::tui::types::move_selection_wrap;

const RESET_BUSY: &str = "A task is still running. Reset once it finishes.";

pub fn handle_event(
    app: &mut App,
    tx: &mpsc::UnboundedSender<TuiMsg>,
    event: Event,
) -> Result<(), CliError> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key(app, tx, key),
        Event::Paste(text) => {
            paste(app, &text);
            Ok(())
        }
        _ => Ok(()),
    }
}

fn handle_key(
    app: &mut App,
    tx: &mpsc::UnboundedSender<TuiMsg>,
    key: KeyEvent,
) -> Result<(), CliError> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return Ok(());
    }

    if !app.state.is_authenticated {
        match key.code {
            KeyCode::Enter => sign_in(app),
            KeyCode::Esc => app.should_quit = true,
            _ => {}
        }
        return Ok(());
    }

    match app.mode {
        Mode::Help => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::F(1)) {
                app.mode = Mode::Normal;
            }
            Ok(())
        }
        Mode::Settings => {
            handle_settings_key(app, key);
            Ok(())
        }
        Mode::ConfirmReset => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => reset(app)?,
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.mode = Mode::Settings,
                _ => {}
            }
            Ok(())
        }
        Mode::Feedback => handle_feedback_key(app, tx, key),
        Mode::Attach => handle_attach_key(app, key),
        Mode::Normal => handle_normal_key(app, tx, key),
    }
}

fn sign_in(app: &mut App) {
    app.state.is_authenticated = true;
    app.save();
    app.status = "Signed in".to_string();
    info!("signed in");
}

/// Refused while a turn is in flight: its events would land on the fresh
/// charter.
fn reset(app: &mut App) -> Result<(), CliError> {
    if app.waiting {
        app.mode = Mode::Settings;
        app.status = RESET_BUSY.to_string();
        return Ok(());
    }
    app.state.reset();
    app.store.clear()?;
    app.mode = Mode::Normal;
    app.view = View::Chat;
    app.selected = None;
    app.feedback_request = None;
    app.mode_override = None;
    app.tool_choice = ToolChoice::AutoSelect;
    app.chat_input.clear();
    app.meta_input.clear();
    app.status = "Corporation reset".to_string();
    info!("corp state reset");
    Ok(())
}

fn handle_normal_key(
    app: &mut App,
    tx: &mpsc::UnboundedSender<TuiMsg>,
    key: KeyEvent,
) -> Result<(), CliError> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Esc if app.meta_focus => {
            app.meta_focus = false;
            return Ok(());
        }
        KeyCode::Esc if app.selected.is_some() => {
            app.selected = None;
            return Ok(());
        }
        KeyCode::Esc => {
            app.should_quit = true;
            return Ok(());
        }
        KeyCode::Tab => {
            app.view = app.view.next();
            app.meta_focus = false;
            return Ok(());
        }
        KeyCode::F(1) => {
            app.mode = Mode::Help;
            return Ok(());
        }
        KeyCode::F(2) => {
            app.view = View::Dashboard;
            return Ok(());
        }
        KeyCode::F(3) => {
            app.view = View::Chat;
            return Ok(());
        }
        KeyCode::F(4) => {
            app.view = View::Tools;
            return Ok(());
        }
        KeyCode::F(5) => {
            app.mode = Mode::Settings;
            return Ok(());
        }
        KeyCode::Char('s') if ctrl => {
            app.mode = Mode::Settings;
            return Ok(());
        }
        _ => {}
    }

    match app.view {
        View::Dashboard => Ok(()),
        View::Tools => handle_tools_key(app, tx, key),
        View::Chat => handle_chat_key(app, tx, key),
    }
}

fn handle_chat_key(
    app: &mut App,
    tx: &mpsc::UnboundedSender<TuiMsg>,
    key: KeyEvent,
) -> Result<(), CliError> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    match key.code {
        KeyCode::Enter if !alt => send_directive(app, tx),
        KeyCode::Up if alt => app.move_selected(-1),
        KeyCode::Down if alt => app.move_selected(1),
        KeyCode::PageUp => app.scroll_from_bottom = app.scroll_from_bottom.saturating_add(5),
        KeyCode::PageDown => app.scroll_from_bottom = app.scroll_from_bottom.saturating_sub(5),
        KeyCode::Char('d') if ctrl => app.mode_override = next_override(app.mode_override),
        KeyCode::Char('t') if ctrl => app.tool_choice = app.tool_choice.next(),
        KeyCode::Char('a') if ctrl => {
            app.attach_input.clear();
            app.mode = Mode::Attach;
        }
        KeyCode::Char('g') if ctrl => give_feedback(app, Feedback::Good),
        KeyCode::Char('b') if ctrl => give_feedback(app, Feedback::Bad),
        KeyCode::Char('o') if ctrl => open_sources(app)?,
        _ => {
            app.chat_input.handle_key(key);
        }
    }
    Ok(())
}

fn handle_tools_key(
    app: &mut App,
    tx: &mpsc::UnboundedSender<TuiMsg>,
    key: KeyEvent,
) -> Result<(), CliError> {
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    if app.meta_focus {
        match key.code {
            KeyCode::Enter if !alt => submit_architect_log(app, tx),
            _ => {
                app.meta_input.handle_key(key);
            }
        }
        return Ok(());
    }

    match key.code {
        KeyCode::Up => move_selection_wrap(&mut app.toolbox_state, -1, TOOLBOX.len()),
        KeyCode::Down => move_selection_wrap(&mut app.toolbox_state, 1, TOOLBOX.len()),
        KeyCode::Enter => {
            let idx = app.toolbox_state.selected().unwrap_or(0);
            if let Some(entry) = TOOLBOX.get(idx) {
                app.chat_input.set(entry.prompt);
                app.view = View::Chat;
                app.status = format!("{} ready", entry.label);
            }
        }
        KeyCode::Char('l') => app.meta_focus = true,
        _ => {}
    }
    Ok(())
}

fn handle_settings_key(app: &mut App, key: KeyEvent) {
    let len = SettingsItem::ALL.len();
    let item = SettingsItem::ALL[app.settings_state.selected().unwrap_or(0).min(len - 1)];
    match key.code {
        KeyCode::Esc | KeyCode::F(5) => app.mode = Mode::Normal,
        KeyCode::Up => move_selection_wrap(&mut app.settings_state, -1, len),
        KeyCode::Down => move_selection_wrap(&mut app.settings_state, 1, len),
        KeyCode::Left | KeyCode::Right | KeyCode::Enter => {
            let forward = key.code != KeyCode::Left;
            match item {
                SettingsItem::Theme => app.state.theme = app.state.theme.toggled(),
                SettingsItem::Temperature => {
                    let step = if forward { 0.1 } else { -0.1 };
                    let value = app.state.temperature + step;
                    app.state.set_temperature(value);
                }
                SettingsItem::Directive => {
                    app.state.ai_mode = if forward {
                        app.state.ai_mode.next()
                    } else {
                        app.state.ai_mode.next().next()
                    };
                }
                SettingsItem::Reset => {
                    if key.code == KeyCode::Enter {
                        app.mode = Mode::ConfirmReset;
                    }
                    return;
                }
            }
            app.save();
        }
        _ => {}
    }
}

fn handle_feedback_key(
    app: &mut App,
    tx: &mpsc::UnboundedSender<TuiMsg>,
    key: KeyEvent,
) -> Result<(), CliError> {
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    match key.code {
        KeyCode::Esc => {
            app.feedback_request = None;
            app.feedback_input.clear();
            app.mode = Mode::Normal;
        }
        KeyCode::Enter if !alt => {
            if app.waiting || app.feedback_input.is_blank() {
                return Ok(());
            }
            let Some(request) = app.feedback_request.take() else {
                app.mode = Mode::Normal;
                return Ok(());
            };
            let reason = app.feedback_input.take();
            app.mode = Mode::Normal;
            app.waiting = true;
            app.status = "Learning from feedback".to_string();
            spawn_feedback(app.engine.clone(), app.state.clone(), request, reason, tx.clone());
        }
        _ => {
            app.feedback_input.handle_key(key);
        }
    }
    Ok(())
}

fn handle_attach_key(app: &mut App, key: KeyEvent) -> Result<(), CliError> {
    match key.code {
        KeyCode::Esc => app.mode = Mode::Normal,
        KeyCode::Enter => {
            let path = app.attach_input.take();
            app.mode = Mode::Normal;
            let (name, content) = read_attachment(Path::new(path.trim()), true)?;
            let merged = attach_corp_file(&app.chat_input.text(), &name, &content);
            app.chat_input.set(&merged);
            app.status = format!("Attached {name}");
        }
        _ => {
            app.attach_input.handle_key(key);
        }
    }
    Ok(())
}

fn paste(app: &mut App, text: &str) {
    match (app.mode, app.view) {
        (Mode::Feedback, _) => app.feedback_input.insert_str(text),
        (Mode::Attach, _) => app.attach_input.insert_str(text.trim()),
        (Mode::Normal, View::Chat) => app.chat_input.insert_str(text),
        (Mode::Normal, View::Tools) if app.meta_focus => app.meta_input.insert_str(text),
        _ => {}
    }
}

fn next_override(current: Option<AiMode>) -> Option<AiMode> {
    match current {
        None => Some(AiMode::Safe),
        Some(AiMode::Hacker) => None,
        Some(mode) => Some(mode.next()),
    }
}

fn send_directive(app: &mut App, tx: &mpsc::UnboundedSender<TuiMsg>) {
    if app.waiting {
        app.status = "Still working on the last directive".to_string();
        return;
    }
    if app.chat_input.is_blank() {
        return;
    }
    let message = app.chat_input.take().trim().to_string();
    let overrides = TurnOverrides {
        mode: app.mode_override,
        tool: app.tool_choice,
    };
    app.tool_choice = ToolChoice::AutoSelect;
    app.selected = None;
    app.waiting = true;
    app.scroll_from_bottom = 0;
    app.status = "Executing directive".to_string();
    spawn_directive(app.engine.clone(), app.state.clone(), message, overrides, tx.clone());
}

fn submit_architect_log(app: &mut App, tx: &mpsc::UnboundedSender<TuiMsg>) {
    if app.waiting || app.meta_input.is_blank() {
        return;
    }
    if app.meta_input.text().trim().chars().count() > MAX_META_LOG_CHARS {
        app.status = format!("Error: Input exceeds {MAX_META_LOG_CHARS} characters.");
        return;
    }
    let log = app.meta_input.take();
    app.waiting = true;
    app.status = "Re-calibrating".to_string();
    spawn_architect_log(app.engine.clone(), app.state.clone(), log, tx.clone());
}

fn give_feedback(app: &mut App, feedback: Feedback) {
    let Some(index) = app.selected else {
        app.status = "Select a response with Alt+Up first".to_string();
        return;
    };
    match app.state.feedback(index, feedback) {
        FeedbackOutcome::Ignored => app.status = "Feedback already recorded".to_string(),
        FeedbackOutcome::Marked => {
            app.save();
            app.status = "Marked as helpful".to_string();
        }
        FeedbackOutcome::NeedsReason(request) => {
            app.feedback_request = Some(request);
            app.feedback_input.clear();
            app.mode = Mode::Feedback;
        }
    }
}

fn open_sources(app: &mut App) -> Result<(), CliError> {
    let Some(message) = app.selected.and_then(|i| app.state.chat_history.get(i)) else {
        return Ok(());
    };
    let Some(chunk) = message.grounding_chunks.first() else {
        app.status = "No sources on this response".to_string();
        return Ok(());
    };
    let uri = chunk.uri.clone();
    open::that(&uri).map_err(|e| CliError::Generic(format!("Failed to open {uri}: {e}")))?;
    app.status = format!("Opened {}", chunk.label());
    Ok(())
}
