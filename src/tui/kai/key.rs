use std::path::Path;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tracing::info;

use super::async_ops::{spawn_analyze, spawn_converse, spawn_create, spawn_summarize};
use super::types::{AnalyzeField, App, Mode, Module, TuiMsg};
use crate::engine::{attach_kai_file, read_attachment};
use crate::errors::CliError;
use crate::state::message::ChatMessage;
use crate::tui::types::{move_selection, move_selection_wrap};

/// Settings rows: theme toggle, then the reset button.
pub const SETTINGS_ROWS: usize = 2;
const RESET_BUSY: &str = "KAI is still working. Reset once the reply arrives.";

pub fn handle_event(
    app: &mut App,
    tx: &mpsc::UnboundedSender<TuiMsg>,
    event: Event,
) -> Result<(), CliError> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key(app, tx, key),
        Event::Paste(text) => {
            if let Some(input) = focused_input(app) {
                input.insert_str(&text);
            }
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
            KeyCode::Enter => {
                app.state.is_authenticated = true;
                app.save();
                app.status = "Signed in".to_string();
                info!("signed in");
            }
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
        }
        Mode::Settings => handle_settings_key(app, key),
        Mode::ConfirmReset => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => reset(app)?,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.mode = Mode::Settings,
            _ => {}
        },
        Mode::ConfirmDelete(id) => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                if app.state.delete_memory(id) {
                    app.save();
                    app.status = "Memory deleted".to_string();
                }
                app.mode = Mode::Normal;
                let len = app.visible_memories().len();
                move_selection(&mut app.memory_state, 0, len);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.mode = Mode::Normal,
            _ => {}
        },
        Mode::Attach => handle_attach_key(app, key)?,
        Mode::Normal => handle_normal_key(app, tx, key),
    }
    Ok(())
}

/// Refused while a reply is in flight: it would land in the wiped history.
fn reset(app: &mut App) -> Result<(), CliError> {
    if app.waiting {
        app.mode = Mode::Settings;
        app.status = RESET_BUSY.to_string();
        return Ok(());
    }
    app.state.reset();
    app.store.clear()?;
    app.mode = Mode::Normal;
    app.module = Module::Converse;
    app.selected = None;
    app.creation.clear();
    app.analysis.clear();
    app.search_input.clear();
    app.status = "KAI reset".to_string();
    info!("kai state reset");
    Ok(())
}

fn handle_settings_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::F(6) => app.mode = Mode::Normal,
        KeyCode::Up => move_selection_wrap(&mut app.settings_state, -1, SETTINGS_ROWS),
        KeyCode::Down => move_selection_wrap(&mut app.settings_state, 1, SETTINGS_ROWS),
        KeyCode::Enter | KeyCode::Left | KeyCode::Right => {
            if app.settings_state.selected().unwrap_or(0) == 0 {
                app.state.theme = app.state.theme.toggled();
                app.save();
            } else if key.code == KeyCode::Enter {
                app.mode = Mode::ConfirmReset;
            }
        }
        _ => {}
    }
}

fn handle_attach_key(app: &mut App, key: KeyEvent) -> Result<(), CliError> {
    match key.code {
        KeyCode::Esc => app.mode = Mode::Normal,
        KeyCode::Enter => {
            let path = app.attach_input.take();
            app.mode = Mode::Normal;
            let (name, content) = read_attachment(Path::new(path.trim()), false)?;
            let target = match app.module {
                Module::Analyze => &mut app.analyze_text,
                _ => &mut app.converse_input,
            };
            let merged = attach_kai_file(&target.text(), &name, &content);
            target.set(&merged);
            app.status = format!("Attached {name}");
        }
        _ => {
            app.attach_input.handle_key(key);
        }
    }
    Ok(())
}

fn handle_normal_key(app: &mut App, tx: &mpsc::UnboundedSender<TuiMsg>, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    match key.code {
        KeyCode::Esc if app.selected.is_some() => app.selected = None,
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab => app.module = app.module.next(),
        KeyCode::F(1) => app.mode = Mode::Help,
        KeyCode::F(n @ 2..=5) => app.module = Module::ALL[usize::from(n - 2)],
        KeyCode::F(6) => app.mode = Mode::Settings,
        KeyCode::Char('s') if ctrl => app.mode = Mode::Settings,
        KeyCode::Char('a') if ctrl && matches!(app.module, Module::Converse | Module::Analyze) => {
            app.attach_input.clear();
            app.mode = Mode::Attach;
        }
        _ => match app.module {
            Module::Converse => match key.code {
                KeyCode::Enter if !alt => send_converse(app, tx),
                KeyCode::Up if alt => app.move_selected(-1),
                KeyCode::Down if alt => app.move_selected(1),
                KeyCode::Char('k') if ctrl => commit_selected(app, tx),
                KeyCode::PageUp => app.scroll_from_bottom = app.scroll_from_bottom.saturating_add(5),
                KeyCode::PageDown => app.scroll_from_bottom = app.scroll_from_bottom.saturating_sub(5),
                _ => {
                    app.converse_input.handle_key(key);
                }
            },
            Module::Create => match key.code {
                KeyCode::Enter if !alt => send_create(app, tx),
                _ => {
                    app.create_input.handle_key(key);
                }
            },
            Module::Analyze => match key.code {
                KeyCode::BackTab | KeyCode::Up | KeyCode::Down if !alt => {
                    app.analyze_field = match app.analyze_field {
                        AnalyzeField::Text => AnalyzeField::Question,
                        AnalyzeField::Question => AnalyzeField::Text,
                    };
                }
                KeyCode::Enter if !alt => send_analyze(app, tx),
                _ => {
                    if let Some(input) = focused_input(app) {
                        input.handle_key(key);
                    }
                }
            },
            Module::Memory => handle_memory_key(app, key),
        },
    }
}

fn handle_memory_key(app: &mut App, key: KeyEvent) {
    let len = app.visible_memories().len();
    match key.code {
        KeyCode::Up => move_selection(&mut app.memory_state, -1, len),
        KeyCode::Down => move_selection(&mut app.memory_state, 1, len),
        KeyCode::Delete => {
            let id = app
                .memory_state
                .selected()
                .and_then(|i| app.visible_memories().get(i).map(|m| m.id));
            if let Some(id) = id {
                app.mode = Mode::ConfirmDelete(id);
            }
        }
        _ => {
            if app.search_input.handle_key(key) {
                let len = app.visible_memories().len();
                app.memory_state.select(if len == 0 { None } else { Some(0) });
            }
        }
    }
}

fn focused_input(app: &mut App) -> Option<&mut crate::tui::types::InputLine> {
    if app.mode == Mode::Attach {
        return Some(&mut app.attach_input);
    }
    if app.mode != Mode::Normal {
        return None;
    }
    Some(match app.module {
        Module::Converse => &mut app.converse_input,
        Module::Create => &mut app.create_input,
        Module::Analyze => match app.analyze_field {
            AnalyzeField::Text => &mut app.analyze_text,
            AnalyzeField::Question => &mut app.analyze_question,
        },
        Module::Memory => &mut app.search_input,
    })
}

fn send_converse(app: &mut App, tx: &mpsc::UnboundedSender<TuiMsg>) {
    if app.waiting || app.converse_input.is_blank() {
        return;
    }
    let text = app.converse_input.take().trim().to_string();
    app.state.push_message(ChatMessage::user(text));
    app.save();
    app.streaming = Some(String::new());
    app.selected = None;
    app.waiting = true;
    app.scroll_from_bottom = 0;
    app.status = "KAI is typing".to_string();
    spawn_converse(app.engine.clone(), app.state.chat_history.clone(), tx.clone());
}

fn send_create(app: &mut App, tx: &mpsc::UnboundedSender<TuiMsg>) {
    if app.waiting || app.create_input.is_blank() {
        return;
    }
    app.creation.clear();
    app.waiting = true;
    app.status = "Generating...".to_string();
    spawn_create(app.engine.clone(), app.create_input.text(), tx.clone());
}

fn send_analyze(app: &mut App, tx: &mpsc::UnboundedSender<TuiMsg>) {
    if app.waiting {
        return;
    }
    if app.analyze_text.is_blank() || app.analyze_question.is_blank() {
        app.status = "Provide text and a question".to_string();
        return;
    }
    app.analysis.clear();
    app.waiting = true;
    app.status = "Analyzing...".to_string();
    spawn_analyze(
        app.engine.clone(),
        app.analyze_text.text(),
        app.analyze_question.text(),
        tx.clone(),
    );
}

fn commit_selected(app: &mut App, tx: &mpsc::UnboundedSender<TuiMsg>) {
    if app.waiting {
        return;
    }
    let Some(text) = app
        .selected
        .and_then(|i| app.state.chat_history.get(i))
        .map(|m| m.text.clone())
    else {
        app.status = "Select a response with Alt+Up first".to_string();
        return;
    };
    app.waiting = true;
    app.status = "Committing to memory".to_string();
    spawn_summarize(app.engine.clone(), text, tx.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::KaiEngine;
    use crate::model::scripted::ScriptedBackend;
    use crate::state::StateStore;
    use crate::state::kai::KaiState;
    use crate::state::message::{Sender, Theme};
    use std::sync::Arc;

    fn app() -> (tempfile::TempDir, App) {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = KaiState {
            is_authenticated: true,
            ..KaiState::default()
        };
        let app = App::new(
            state,
            StateStore::new(dir.path()),
            KaiEngine::new(Arc::new(ScriptedBackend::new())),
        );
        (dir, app)
    }

    fn press(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
        let (tx, _rx) = mpsc::unbounded_channel();
        handle_event(app, &tx, Event::Key(KeyEvent::new(code, modifiers))).expect("key");
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch), KeyModifiers::NONE);
        }
    }

    #[test]
    fn f_keys_jump_between_modules() {
        let (_dir, mut app) = app();
        press(&mut app, KeyCode::F(4), KeyModifiers::NONE);
        assert_eq!(app.module, Module::Analyze);
        press(&mut app, KeyCode::F(5), KeyModifiers::NONE);
        assert_eq!(app.module, Module::Memory);
        press(&mut app, KeyCode::F(6), KeyModifiers::NONE);
        assert_eq!(app.mode, Mode::Settings);
    }

    #[tokio::test]
    async fn converse_appends_user_message_and_waits() {
        let (_dir, mut app) = app();
        type_text(&mut app, "  hello ");
        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);
        assert!(app.waiting);
        assert_eq!(app.streaming.as_deref(), Some(""));
        let last = app.state.chat_history.last().expect("message");
        assert_eq!(last.sender, Sender::User);
        assert_eq!(last.text, "hello");
    }

    #[test]
    fn blank_converse_input_is_ignored() {
        let (_dir, mut app) = app();
        type_text(&mut app, "   ");
        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);
        assert!(!app.waiting);
        assert!(app.state.chat_history.is_empty());
    }

    #[test]
    fn memory_delete_asks_first() {
        let (_dir, mut app) = app();
        app.state.commit_memory("one", "first");
        app.module = Module::Memory;
        press(&mut app, KeyCode::Down, KeyModifiers::NONE);
        press(&mut app, KeyCode::Delete, KeyModifiers::NONE);
        let id = app.state.memories[0].id;
        assert_eq!(app.mode, Mode::ConfirmDelete(id));
        press(&mut app, KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(app.state.memories.len(), 1);

        press(&mut app, KeyCode::Delete, KeyModifiers::NONE);
        press(&mut app, KeyCode::Char('y'), KeyModifiers::NONE);
        assert!(app.state.memories.is_empty());
        assert_eq!(app.memory_state.selected(), None);
    }

    #[test]
    fn typing_in_memory_module_searches() {
        let (_dir, mut app) = app();
        app.state.commit_memory("Rust", "lang");
        app.state.commit_memory("Tea", "drink");
        app.module = Module::Memory;
        type_text(&mut app, "tea");
        assert_eq!(app.visible_memories().len(), 1);
        assert_eq!(app.memory_state.selected(), Some(0));
    }

    #[test]
    fn analyze_switches_fields() {
        let (_dir, mut app) = app();
        app.module = Module::Analyze;
        type_text(&mut app, "body");
        press(&mut app, KeyCode::Down, KeyModifiers::NONE);
        type_text(&mut app, "why?");
        assert_eq!(app.analyze_text.text(), "body");
        assert_eq!(app.analyze_question.text(), "why?");
    }

    #[test]
    fn reset_clears_everything_after_confirmation() {
        let (_dir, mut app) = app();
        app.state.theme = Theme::Dark;
        app.state.commit_memory("x", "y");
        app.save();
        app.mode = Mode::Settings;
        press(&mut app, KeyCode::Down, KeyModifiers::NONE);
        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(app.mode, Mode::ConfirmReset);
        press(&mut app, KeyCode::Char('y'), KeyModifiers::NONE);
        assert_eq!(app.state, KaiState::default());
        assert!(!app.store.path().exists());
    }

    #[test]
    fn reset_waits_for_the_pending_reply() {
        let (_dir, mut app) = app();
        app.state.commit_memory("x", "y");
        app.save();
        app.waiting = true;
        app.mode = Mode::ConfirmReset;
        press(&mut app, KeyCode::Char('y'), KeyModifiers::NONE);
        assert_eq!(app.mode, Mode::Settings);
        assert_eq!(app.status, RESET_BUSY);
        assert_eq!(app.state.memories.len(), 1);
        assert!(app.store.path().exists());
    }

    #[test]
    fn kai_attachments_accept_any_text_file() {
        let (dir, mut app) = app();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Notes").expect("write");
        app.converse_input.set("Summarize");
        app.mode = Mode::Attach;
        app.attach_input.set(&path.display().to_string());
        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(
            app.converse_input.text(),
            "Summarize\n\n--- Content of notes.md ---\n# Notes"
        );
    }
}
