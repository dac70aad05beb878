pub mod corp;
pub mod kai;
pub mod prompts;

#[cfg(test)]
pub mod scripted;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::errors::CliError;
use crate::parse::response::{extract_block_reason, extract_grounding, extract_text};
use crate::state::message::GroundingChunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub role: Role,
    pub text: String,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// One generation call. Everything except `contents` is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    pub system_instruction: Option<String>,
    pub contents: Vec<Content>,
    pub temperature: Option<f64>,
    pub stop_sequences: Vec<String>,
    pub json_response: bool,
    pub google_search: bool,
}

impl GenerateRequest {
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            contents: vec![Content::user(text)],
            ..Self::default()
        }
    }

    pub fn system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn temperature(mut self, value: f64) -> Self {
        self.temperature = Some(value);
        self
    }

    pub fn json(mut self) -> Self {
        self.json_response = true;
        self
    }

    pub fn with_search(mut self) -> Self {
        self.google_search = true;
        self
    }

    pub fn stop(mut self, sequence: impl Into<String>) -> Self {
        self.stop_sequences.push(sequence.into());
        self
    }

    /// Request body for `generateContent` / `streamGenerateContent`.
    pub fn to_body(&self) -> Value {
        let contents: Vec<Value> = self
            .contents
            .iter()
            .map(|c| json!({"role": c.role, "parts": [{"text": c.text}]}))
            .collect();
        let mut body = json!({ "contents": contents });

        if let Some(instruction) = &self.system_instruction {
            body["systemInstruction"] = json!({"parts": [{"text": instruction}]});
        }

        let mut config = serde_json::Map::new();
        if let Some(t) = self.temperature {
            config.insert("temperature".into(), json!(t));
        }
        if !self.stop_sequences.is_empty() {
            config.insert("stopSequences".into(), json!(self.stop_sequences));
        }
        if self.json_response {
            config.insert("responseMimeType".into(), json!("application/json"));
        }
        if !config.is_empty() {
            body["generationConfig"] = Value::Object(config);
        }

        if self.google_search {
            body["tools"] = json!([{"googleSearch": {}}]);
        }
        body
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub text: String,
    pub grounding: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    pub display_name: String,
    pub input_token_limit: Option<u64>,
}

#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<Generation, CliError>;

    /// Forward text deltas on `tx` as they arrive; the returned generation
    /// holds the full text.
    async fn generate_stream(
        &self,
        request: GenerateRequest,
        tx: UnboundedSender<String>,
    ) -> Result<Generation, CliError>;

    fn model_name(&self) -> &str;
}

/// Gemini `generateContent` over the shared HTTP client.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    api: ApiClient,
    model: String,
}

impl GeminiBackend {
    pub fn new(api: ApiClient, model: impl Into<String>) -> Self {
        let model = model.into();
        let model = model
            .strip_prefix("models/")
            .map(str::to_string)
            .unwrap_or(model);
        Self { api, model }
    }

    fn path(&self, method: &str) -> String {
        format!("/v1beta/models/{}:{method}", self.model)
    }

    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, CliError> {
        let response = self.api.get_json("/v1beta/models", None).await?;
        Ok(parse_model_list(&response.json))
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    async fn generate(&self, request: GenerateRequest) -> Result<Generation, CliError> {
        let body = request.to_body();
        debug!(model = %self.model, json = request.json_response, search = request.google_search, turns = request.contents.len(), "generate");
        let response = self.api.post_json(&self.path("generateContent"), &body).await?;
        info!(model = %self.model, elapsed_ms = response.elapsed_ms as u64, "generation finished");
        generation_from_payload(&response.json)
    }

    async fn generate_stream(
        &self,
        request: GenerateRequest,
        tx: UnboundedSender<String>,
    ) -> Result<Generation, CliError> {
        let body = request.to_body();
        debug!(model = %self.model, turns = request.contents.len(), "generate stream");
        let mut rx = self
            .api
            .post_stream(&self.path("streamGenerateContent?alt=sse"), &body)
            .await?;

        let mut generation = Generation::default();
        let mut block_reason = None;
        while let Some(event) = rx.recv().await {
            let event = event?;
            let Ok(payload) = serde_json::from_str::<Value>(&event.data) else {
                continue;
            };
            if let Some(delta) = extract_text(&payload).filter(|d| !d.is_empty()) {
                generation.text.push_str(&delta);
                let _ = tx.send(delta);
            }
            let grounding = extract_grounding(&payload);
            if !grounding.is_empty() {
                generation.grounding = grounding;
            }
            block_reason = extract_block_reason(&payload).or(block_reason);
        }

        if generation.text.trim().is_empty() {
            return Err(empty_reply_error(block_reason));
        }
        info!(model = %self.model, chars = generation.text.len(), "stream finished");
        Ok(generation)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

pub fn generation_from_payload(payload: &Value) -> Result<Generation, CliError> {
    let text = extract_text(payload).unwrap_or_default();
    if text.trim().is_empty() {
        return Err(empty_reply_error(extract_block_reason(payload)));
    }
    Ok(Generation {
        text,
        grounding: extract_grounding(payload),
    })
}

fn empty_reply_error(block_reason: Option<String>) -> CliError {
    match block_reason {
        Some(reason) => CliError::Model(format!("The model returned no text (reason: {reason}).")),
        None => CliError::Model("The model returned no text.".to_string()),
    }
}

fn parse_model_list(payload: &Value) -> Vec<ModelInfo> {
    payload
        .get("models")
        .and_then(|v| v.as_array())
        .map(|models| {
            models
                .iter()
                .filter_map(|m| {
                    let name = m.get("name")?.as_str()?.to_string();
                    let display_name = m
                        .get("displayName")
                        .and_then(|v| v.as_str())
                        .unwrap_or(&name)
                        .to_string();
                    Some(ModelInfo {
                        display_name,
                        input_token_limit: m.get("inputTokenLimit").and_then(|v| v.as_u64()),
                        name,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn body_carries_every_option() {
        let request = GenerateRequest {
            contents: vec![Content::user("hi"), Content::model("hello"), Content::user("again")],
            ..GenerateRequest::default()
        }
        .system("be brief")
        .temperature(0.2)
        .stop("\n")
        .json()
        .with_search();

        let body = request.to_body();
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "again");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["generationConfig"]["temperature"], 0.2);
        assert_eq!(body["generationConfig"]["stopSequences"][0], "\n");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["tools"][0], json!({"googleSearch": {}}));
    }

    #[test]
    fn plain_prompt_has_no_config() {
        let body = GenerateRequest::prompt("hi").to_body();
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("systemInstruction").is_none());
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn blocked_reply_is_a_model_error() {
        let payload = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = generation_from_payload(&payload).expect_err("blocked");
        assert!(matches!(err, CliError::Model(_)));
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn model_prefix_is_stripped() {
        let api = ApiClient::new("http://localhost".into(), None, 1000, 0, false).expect("client");
        let backend = GeminiBackend::new(api, "models/gemini-2.5-flash");
        assert_eq!(backend.model_name(), "gemini-2.5-flash");
        assert_eq!(
            backend.path("generateContent"),
            "/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn interrupted_stream_is_an_error_not_a_short_reply() {
        use crate::api::test_server::{chunk, serve, sse_head};

        let first = br#"data: {"candidates":[{"content":{"parts":[{"text":"Half a "}]}}]}"#;
        let mut piece = first.to_vec();
        piece.extend_from_slice(b"\n\n");
        let base = serve(vec![vec![sse_head(), chunk(&piece)]]).await;
        let api = ApiClient::new(base, Some("k".into()), 5000, 0, false).expect("client");
        let backend = GeminiBackend::new(api, "gemini-2.5-flash");
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let request = GenerateRequest {
            contents: vec![Content::user("hi")],
            ..GenerateRequest::default()
        };
        let err = backend.generate_stream(request, tx).await.expect_err("cut short");
        assert!(matches!(err, CliError::Network(_)));
        assert_eq!(rx.recv().await.as_deref(), Some("Half a "));
    }

    #[test]
    fn model_list_uses_display_name_fallback() {
        let payload = json!({"models": [
            {"name": "models/a", "displayName": "Model A", "inputTokenLimit": 1048576},
            {"name": "models/b"}
        ]});
        let models = parse_model_list(&payload);
        assert_eq!(models[0].input_token_limit, Some(1_048_576));
        assert_eq!(models[1].display_name, "models/b");
    }
}
