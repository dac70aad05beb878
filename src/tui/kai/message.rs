use tracing::{info, warn};

use super::types::{App, TuiMsg};
use crate::errors::CliError;

const CREATE_ERROR: &str = "Sorry, I couldn't generate a creative response right now. Please try again.";
const ANALYZE_ERROR: &str = "An error occurred during analysis. Please try again.";

pub fn handle_tui_msg(app: &mut App, msg: TuiMsg) {
    match msg {
        TuiMsg::Delta(delta) => {
            if let Some(buf) = app.streaming.as_mut() {
                buf.push_str(&delta);
            }
        }
        TuiMsg::Reply(reply) => {
            app.streaming = None;
            app.waiting = false;
            app.state.push_message(reply);
            app.scroll_from_bottom = 0;
            app.status = "Ready".to_string();
            app.save();
        }
        TuiMsg::Created(res) => {
            app.waiting = false;
            app.creation = result_text(app, res, CREATE_ERROR);
        }
        TuiMsg::Analyzed(res) => {
            app.waiting = false;
            app.analysis = result_text(app, res, ANALYZE_ERROR);
        }
        TuiMsg::Summarized { content, result } => {
            app.waiting = false;
            match result {
                Ok(summary) => {
                    let id = app.state.commit_memory(&content, &summary).id;
                    info!(id, "memory committed");
                    app.save();
                    app.status = format!("Saved to memory: {}", summary.trim());
                }
                Err(err) => {
                    warn!(error = %err, "commit to memory failed");
                    app.status = format!("Error: {err}");
                }
            }
        }
    }
}

/// Usage errors go to the status line; anything else shows the module's
/// apology in place of a result.
fn result_text(app: &mut App, res: Result<String, CliError>, apology: &str) -> String {
    match res {
        Ok(text) => {
            app.status = "Ready".to_string();
            text
        }
        Err(CliError::Usage(message)) => {
            app.status = message;
            String::new()
        }
        Err(err) => {
            warn!(error = %err, "kai request failed");
            app.status = "Error".to_string();
            apology.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::KaiEngine;
    use crate::model::scripted::ScriptedBackend;
    use crate::state::StateStore;
    use crate::state::kai::KaiState;
    use crate::state::message::ChatMessage;
    use std::sync::Arc;

    fn app() -> (tempfile::TempDir, App) {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = App::new(
            KaiState::default(),
            StateStore::new(dir.path()),
            KaiEngine::new(Arc::new(ScriptedBackend::new())),
        );
        (dir, app)
    }

    #[test]
    fn deltas_accumulate_until_reply() {
        let (_dir, mut app) = app();
        app.streaming = Some(String::new());
        app.waiting = true;
        handle_tui_msg(&mut app, TuiMsg::Delta("Hel".to_string()));
        handle_tui_msg(&mut app, TuiMsg::Delta("lo".to_string()));
        assert_eq!(app.streaming.as_deref(), Some("Hello"));

        handle_tui_msg(&mut app, TuiMsg::Reply(ChatMessage::ai("Hello")));
        assert!(app.streaming.is_none());
        assert!(!app.waiting);
        assert_eq!(app.state.chat_history.len(), 1);
    }

    #[test]
    fn summaries_become_memories() {
        let (_dir, mut app) = app();
        handle_tui_msg(
            &mut app,
            TuiMsg::Summarized {
                content: "Long answer".to_string(),
                result: Ok("Short title".to_string()),
            },
        );
        assert_eq!(app.state.memories.len(), 1);
        assert_eq!(app.state.memories[0].summary, "Short title");
    }

    #[test]
    fn failures_show_the_apology() {
        let (_dir, mut app) = app();
        handle_tui_msg(
            &mut app,
            TuiMsg::Created(Err(CliError::Network("down".to_string()))),
        );
        assert_eq!(app.creation, CREATE_ERROR);
        handle_tui_msg(
            &mut app,
            TuiMsg::Analyzed(Err(CliError::Usage("A question is required.".to_string()))),
        );
        assert_eq!(app.analysis, "");
        assert_eq!(app.status, "A question is required.");
    }
}
