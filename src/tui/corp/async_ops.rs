use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::types::{Task, TuiMsg};
use crate::engine::{CorpEngine, TurnEvent, TurnOverrides};
use crate::errors::CliError;
use crate::state::corp::{CorpState, FeedbackRequest};

/// Event channel for one engine call. Every event reaches the UI before the
/// matching `Done`.
fn pump_events(tx: mpsc::UnboundedSender<TuiMsg>) -> (mpsc::UnboundedSender<TurnEvent>, JoinHandle<()>) {
    let (etx, mut erx) = mpsc::unbounded_channel::<TurnEvent>();
    let pump = tokio::spawn(async move {
        while let Some(event) = erx.recv().await {
            let _ = tx.send(TuiMsg::Turn(event));
        }
    });
    (etx, pump)
}

async fn finish(
    tx: mpsc::UnboundedSender<TuiMsg>,
    task: Task,
    res: Result<(), CliError>,
    etx: mpsc::UnboundedSender<TurnEvent>,
    pump: JoinHandle<()>,
) {
    drop(etx);
    let _ = pump.await;
    let _ = tx.send(TuiMsg::Done(task, res));
}

pub fn spawn_directive(
    engine: CorpEngine,
    state: CorpState,
    message: String,
    overrides: TurnOverrides,
    tx: mpsc::UnboundedSender<TuiMsg>,
) {
    tokio::spawn(async move {
        let (etx, pump) = pump_events(tx.clone());
        let res = engine.send_message(&state, &message, overrides, &etx).await;
        finish(tx, Task::Directive, res, etx, pump).await;
    });
}

pub fn spawn_architect_log(
    engine: CorpEngine,
    state: CorpState,
    log: String,
    tx: mpsc::UnboundedSender<TuiMsg>,
) {
    tokio::spawn(async move {
        let (etx, pump) = pump_events(tx.clone());
        let res = engine.process_meta_log(&state, &log, &etx).await;
        finish(tx, Task::ArchitectLog, res, etx, pump).await;
    });
}

pub fn spawn_feedback(
    engine: CorpEngine,
    state: CorpState,
    request: FeedbackRequest,
    reason: String,
    tx: mpsc::UnboundedSender<TuiMsg>,
) {
    tokio::spawn(async move {
        let (etx, pump) = pump_events(tx.clone());
        let res = engine.submit_feedback(&state, &request, &reason, &etx).await;
        finish(tx, Task::Feedback, res, etx, pump).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::scripted::ScriptedBackend;
    use crate::state::message::Sender;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn events_arrive_before_done() {
        let backend = ScriptedBackend::new().reply(r#"{"response":"Expanding.","revenue_generated":5}"#);
        let engine = CorpEngine::new(Arc::new(backend)).with_retry_delay(Duration::ZERO);
        let (tx, mut rx) = mpsc::unbounded_channel();

        spawn_directive(
            engine,
            CorpState::default(),
            "grow".to_string(),
            TurnOverrides::default(),
            tx,
        );

        let mut state = CorpState::default();
        loop {
            match rx.recv().await {
                Some(TuiMsg::Turn(event)) => event.apply(&mut state),
                Some(TuiMsg::Done(task, res)) => {
                    assert_eq!(task, Task::Directive);
                    assert!(res.is_ok());
                    break;
                }
                None => panic!("channel closed before Done"),
            }
        }
        let last = state.chat_history.last().expect("reply");
        assert_eq!(last.sender, Sender::Ai);
        assert_eq!(last.text, "Expanding.");
        assert_eq!(state.financials.total_revenue, 1005.0);
    }
}
