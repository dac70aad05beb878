use tokio::sync::mpsc;

use super::types::TuiMsg;
use crate::engine::KaiEngine;
use crate::state::message::ChatMessage;

/// Stream a reply. Deltas arrive first, then the finished message.
pub fn spawn_converse(engine: KaiEngine, history: Vec<ChatMessage>, tx: mpsc::UnboundedSender<TuiMsg>) {
    tokio::spawn(async move {
        let (dtx, mut drx) = mpsc::unbounded_channel::<String>();
        let ui = tx.clone();
        let pump = tokio::spawn(async move {
            while let Some(delta) = drx.recv().await {
                let _ = ui.send(TuiMsg::Delta(delta));
            }
        });
        let reply = engine.converse(&history, dtx).await;
        let _ = pump.await;
        let _ = tx.send(TuiMsg::Reply(reply));
    });
}

pub fn spawn_create(engine: KaiEngine, prompt: String, tx: mpsc::UnboundedSender<TuiMsg>) {
    tokio::spawn(async move {
        let res = engine.create(&prompt).await;
        let _ = tx.send(TuiMsg::Created(res));
    });
}

pub fn spawn_analyze(
    engine: KaiEngine,
    text: String,
    question: String,
    tx: mpsc::UnboundedSender<TuiMsg>,
) {
    tokio::spawn(async move {
        let res = engine.analyze(&text, &question).await;
        let _ = tx.send(TuiMsg::Analyzed(res));
    });
}

pub fn spawn_summarize(engine: KaiEngine, content: String, tx: mpsc::UnboundedSender<TuiMsg>) {
    tokio::spawn(async move {
        let result = engine.summarize(&content).await;
        let _ = tx.send(TuiMsg::Summarized { content, result });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::scripted::ScriptedBackend;
    use std::sync::Arc;

    #[tokio::test]
    async fn converse_streams_then_replies() {
        let engine = KaiEngine::new(Arc::new(ScriptedBackend::new().reply("Hello there friend")));
        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_converse(engine, vec![ChatMessage::user("hi")], tx);

        let mut streamed = String::new();
        loop {
            match rx.recv().await {
                Some(TuiMsg::Delta(d)) => streamed.push_str(&d),
                Some(TuiMsg::Reply(reply)) => {
                    assert_eq!(reply.text, "Hello there friend");
                    break;
                }
                Some(other) => panic!("unexpected {other:?}"),
                None => panic!("closed early"),
            }
        }
        assert_eq!(streamed, "Hello there friend");
    }
}
