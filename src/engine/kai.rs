use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::errors::CliError;
use crate::model::ModelBackend;
use crate::model::kai;
use crate::state::kai::{KaiState, Memory};
use crate::state::message::ChatMessage;

pub const CONVERSE_ERROR: &str = "An error occurred. Please try again.";

#[derive(Clone)]
pub struct KaiEngine {
    backend: Arc<dyn ModelBackend>,
}

impl KaiEngine {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self { backend }
    }

    /// Reply to a history that already ends with the user's message. Always
    /// yields a message to append: the reply, or a system error.
    pub async fn converse(&self, history: &[ChatMessage], tx: UnboundedSender<String>) -> ChatMessage {
        match kai::converse(self.backend.as_ref(), history, tx).await {
            Ok(text) => ChatMessage::ai(text),
            Err(err) => {
                warn!(error = %err, "converse could not run");
                ChatMessage::error(CONVERSE_ERROR)
            }
        }
    }

    pub async fn create(&self, prompt: &str) -> Result<String, CliError> {
        let prompt = required(prompt, "A creative prompt is required.")?;
        info!(chars = prompt.len(), "create");
        Ok(kai::create(self.backend.as_ref(), prompt).await)
    }

    pub async fn analyze(&self, text: &str, question: &str) -> Result<String, CliError> {
        let text = required(text, "Text to analyze is required.")?;
        let question = required(question, "A question is required.")?;
        info!(chars = text.len(), "analyze");
        Ok(kai::analyze(self.backend.as_ref(), text, question).await)
    }

    pub async fn summarize(&self, text: &str) -> Result<String, CliError> {
        let text = required(text, "Nothing to remember.")?;
        Ok(kai::summarize_memory(self.backend.as_ref(), text).await)
    }

    /// Summarize `text` and store it as a memory.
    pub async fn commit_to_memory(&self, state: &mut KaiState, text: &str) -> Result<Memory, CliError> {
        let summary = self.summarize(text).await?;
        let memory = state.commit_memory(text.trim(), &summary).clone();
        info!(id = memory.id, "memory committed");
        Ok(memory)
    }
}

fn required<'a>(value: &'a str, message: &str) -> Result<&'a str, CliError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CliError::Usage(message.to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::kai::{ANALYZE_FALLBACK, SUMMARY_FALLBACK};
    use crate::model::scripted::ScriptedBackend;
    use crate::state::message::{MessageKind, Sender};
    use tokio::sync::mpsc;

    fn engine(backend: ScriptedBackend) -> KaiEngine {
        KaiEngine::new(Arc::new(backend))
    }

    #[tokio::test]
    async fn converse_returns_ai_message() {
        let kai = engine(ScriptedBackend::new().reply("Hello there!"));
        let (tx, _rx) = mpsc::unbounded_channel();
        let reply = kai.converse(&[ChatMessage::user("hi")], tx).await;
        assert_eq!(reply.sender, Sender::Ai);
        assert_eq!(reply.text, "Hello there!");
    }

    #[tokio::test]
    async fn converse_without_user_turn_is_a_system_error() {
        let kai = engine(ScriptedBackend::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let reply = kai.converse(&[ChatMessage::ai("hi")], tx).await;
        assert_eq!(reply.text, CONVERSE_ERROR);
        assert_eq!(reply.kind, Some(MessageKind::Error));
    }

    #[tokio::test]
    async fn blank_inputs_are_rejected_before_the_model() {
        let backend = Arc::new(ScriptedBackend::new());
        let kai = KaiEngine::new(backend.clone());
        assert!(kai.create("  ").await.is_err());
        assert!(kai.analyze("text", "").await.is_err());
        assert!(kai.analyze("", "why?").await.is_err());
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn analyze_uses_fallback_on_failure() {
        let kai = engine(ScriptedBackend::new().fail("boom"));
        assert_eq!(kai.analyze("t", "q").await.expect("analysis"), ANALYZE_FALLBACK);
    }

    #[tokio::test]
    async fn commit_stores_summary_and_content() {
        let kai = engine(ScriptedBackend::new().reply("Tea brewing temperature").fail("x"));
        let mut state = KaiState::default();

        let first = kai
            .commit_to_memory(&mut state, "  Brew green tea at 80C.  ")
            .await
            .expect("commit");
        assert_eq!(first.summary, "Tea brewing temperature");
        assert_eq!(first.content, "Brew green tea at 80C.");

        let second = kai.commit_to_memory(&mut state, "Another note").await.expect("commit");
        assert_eq!(second.summary, SUMMARY_FALLBACK);
        assert_eq!(state.memories.len(), 2);
        assert_eq!(state.memories[0].id, second.id);
    }
}
