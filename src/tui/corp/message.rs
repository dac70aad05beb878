use tracing::warn;

use super::types::{App, Task, TuiMsg};

pub fn handle_tui_msg(app: &mut App, msg: TuiMsg) {
    match msg {
        TuiMsg::Turn(event) => app.apply(event),
        TuiMsg::Done(task, res) => {
            app.waiting = false;
            app.status = match (task, res) {
                (Task::Directive, Ok(())) => "Directive complete".to_string(),
                (Task::ArchitectLog, Ok(())) => "Learning integrated".to_string(),
                (Task::Feedback, Ok(())) => "Feedback integrated".to_string(),
                (task, Err(err)) => {
                    warn!(?task, error = %err, "background task failed");
                    format!("Error: {err}")
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CorpEngine, TurnEvent};
    use crate::errors::CliError;
    use crate::model::scripted::ScriptedBackend;
    use crate::state::StateStore;
    use crate::state::corp::CorpState;
    use crate::state::message::ChatMessage;
    use std::sync::Arc;

    fn app() -> (tempfile::TempDir, App) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::new(dir.path());
        let engine = CorpEngine::new(Arc::new(ScriptedBackend::new()));
        (dir, App::new(CorpState::default(), store, engine))
    }

    #[test]
    fn turn_events_update_state_and_reset_scroll() {
        let (_dir, mut app) = app();
        app.scroll_from_bottom = 4;
        handle_tui_msg(&mut app, TuiMsg::Turn(TurnEvent::Append(ChatMessage::ai("hi"))));
        assert_eq!(app.state.chat_history.len(), 2);
        assert_eq!(app.scroll_from_bottom, 0);
    }

    #[test]
    fn done_clears_waiting_and_reports_errors() {
        let (_dir, mut app) = app();
        app.waiting = true;
        handle_tui_msg(
            &mut app,
            TuiMsg::Done(Task::Directive, Err(CliError::Model("bad reply".to_string()))),
        );
        assert!(!app.waiting);
        assert_eq!(app.status, "Error: bad reply");
    }
}
