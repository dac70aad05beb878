use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use super::{GenerateRequest, Generation, ModelBackend};
use crate::errors::CliError;
use crate::state::message::GroundingChunk;

/// Replays canned replies in order and records every request.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<Generation, String>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.push(Ok(Generation {
            text: text.to_string(),
            grounding: Vec::new(),
        }))
    }

    pub fn grounded(self, text: &str, sources: &[(&str, &str)]) -> Self {
        let grounding = sources
            .iter()
            .map(|(uri, title)| GroundingChunk {
                uri: uri.to_string(),
                title: title.to_string(),
            })
            .collect();
        self.push(Ok(Generation {
            text: text.to_string(),
            grounding,
        }))
    }

    pub fn fail(self, message: &str) -> Self {
        self.push(Err(message.to_string()))
    }

    fn push(self, reply: Result<Generation, String>) -> Self {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(reply);
        }
        self
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn next(&self, request: GenerateRequest) -> Result<Generation, CliError> {
        if let Ok(mut r) = self.requests.lock() {
            r.push(request);
        }
        let reply = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        match reply {
            Some(Ok(generation)) => Ok(generation),
            Some(Err(message)) => Err(CliError::Network(message)),
            None => Err(CliError::Network("script exhausted".to_string())),
        }
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn generate(&self, request: GenerateRequest) -> Result<Generation, CliError> {
        self.next(request)
    }

    async fn generate_stream(
        &self,
        request: GenerateRequest,
        tx: UnboundedSender<String>,
    ) -> Result<Generation, CliError> {
        let generation = self.next(request)?;
        for word in generation.text.split_inclusive(' ') {
            let _ = tx.send(word.to_string());
        }
        Ok(generation)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
