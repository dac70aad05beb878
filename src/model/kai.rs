use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use super::prompts;
use super::{Content, GenerateRequest, ModelBackend};
use crate::errors::CliError;
use crate::state::message::{ChatMessage, Sender};

pub const CONVERSE_FALLBACK: &str = "I'm sorry, I encountered an error. Please try again.";
pub const CREATE_FALLBACK: &str = "I'm sorry, I couldn't generate a creative response at this moment.";
pub const ANALYZE_FALLBACK: &str = "I'm sorry, I was unable to complete the analysis.";
pub const SUMMARY_FALLBACK: &str = "Key insight recorded.";

/// Conversation turns for the model: system notices are dropped, AI turns
/// become `model` turns.
pub fn history_contents(history: &[ChatMessage]) -> Result<Vec<Content>, CliError> {
    let contents: Vec<Content> = history
        .iter()
        .filter_map(|m| match m.sender {
            Sender::User => Some(Content::user(&m.text)),
            Sender::Ai => Some(Content::model(&m.text)),
            Sender::System => None,
        })
        .collect();

    match contents.last() {
        Some(last) if last.role == super::Role::User => Ok(contents),
        _ => Err(CliError::Usage(
            "Conversation must end with a user message.".to_string(),
        )),
    }
}

/// Stream a reply to the conversation. Deltas go out on `tx`; on a model
/// failure the fallback is sent and returned instead.
pub async fn converse(
    backend: &dyn ModelBackend,
    history: &[ChatMessage],
    tx: UnboundedSender<String>,
) -> Result<String, CliError> {
    let contents = history_contents(history)?;
    let request = GenerateRequest {
        contents,
        ..GenerateRequest::default()
    }
    .system(prompts::KAI_CONVERSE_SYSTEM);

    match backend.generate_stream(request, tx.clone()).await {
        Ok(generation) => Ok(generation.text),
        Err(err) => {
            warn!(error = %err, "converse failed");
            let _ = tx.send(CONVERSE_FALLBACK.to_string());
            Ok(CONVERSE_FALLBACK.to_string())
        }
    }
}

pub async fn create(backend: &dyn ModelBackend, prompt: &str) -> String {
    let request = GenerateRequest::prompt(prompt)
        .system(prompts::KAI_CREATE_SYSTEM)
        .temperature(0.8);
    text_or(backend, request, CREATE_FALLBACK, "create").await
}

pub async fn analyze(backend: &dyn ModelBackend, text: &str, question: &str) -> String {
    let request = GenerateRequest::prompt(prompts::analyze_prompt(text, question))
        .system(prompts::KAI_ANALYZE_SYSTEM);
    text_or(backend, request, ANALYZE_FALLBACK, "analyze").await
}

pub async fn summarize_memory(backend: &dyn ModelBackend, text: &str) -> String {
    let request = GenerateRequest::prompt(prompts::summary_prompt(text))
        .system(prompts::KAI_SUMMARY_SYSTEM)
        .temperature(0.2)
        .stop("\n");
    let summary = text_or(backend, request, SUMMARY_FALLBACK, "summarize").await;
    summary.trim().to_string()
}

async fn text_or(
    backend: &dyn ModelBackend,
    request: GenerateRequest,
    fallback: &str,
    op: &'static str,
) -> String {
    match backend.generate(request).await {
        Ok(generation) => generation.text,
        Err(err) => {
            warn!(op, error = %err, "kai request failed, using fallback");
            fallback.to_string()
        }
    }
}
