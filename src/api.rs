use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::{CliError, redact_secret, with_debug_hint};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    retries: u32,
    debug: bool,
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub request_id: Option<String>,
    pub elapsed_ms: u128,
    pub json: Value,
}

impl ApiClient {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        timeout_ms: u64,
        retries: u32,
        debug: bool,
    ) -> Result<Self, CliError> {
        let timeout = Duration::from_millis(timeout_ms.max(1));
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
            retries,
            debug,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_json(
        &self,
        path: &str,
        query: Option<&[(String, String)]>,
    ) -> Result<ApiResponse, CliError> {
        self.request_json(Method::GET, path, query, None, true).await
    }

    /// POST a generation request. Generation has no server-side effects, so
    /// it is retried like a read.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<ApiResponse, CliError> {
        self.request_json(Method::POST, path, None, Some(body.clone()), true)
            .await
    }

    fn require_key(&self) -> Result<String, CliError> {
        self.api_key.clone().ok_or_else(|| {
            CliError::Auth(
                "Missing API key. Run `autocorp config init` or set AUTOCORP_API_KEY.".to_string(),
            )
        })
    }

    pub async fn request_json(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(String, String)]>,
        body: Option<Value>,
        idempotent: bool,
    ) -> Result<ApiResponse, CliError> {
        let key = self.require_key()?;
        let url = join_url(&self.base_url, path);
        let max_attempts = if idempotent {
            self.retries.saturating_add(1)
        } else {
            1
        };

        for attempt in 0..max_attempts {
            let started = Instant::now();
            let mut request = self
                .client
                .request(method.clone(), url.clone())
                .header(API_KEY_HEADER, &key);

            if let Some(query_items) = query {
                request = request.query(query_items);
            }

            if let Some(ref payload) = body {
                request = request.json(payload);
            }

            debug!(%method, path, attempt, "sending request");
            let response = request.send().await;
            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let request_id = resp
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .map(|s| s.to_string());

                    let text = resp.text().await.unwrap_or_default();
                    if is_retryable_status(status) && idempotent && attempt + 1 < max_attempts {
                        warn!(status = status.as_u16(), attempt, "retryable status, backing off");
                        sleep(backoff_delay_ms(attempt)).await;
                        continue;
                    }

                    let parsed = if text.trim().is_empty() {
                        json!({})
                    } else {
                        serde_json::from_str::<Value>(&text)
                            .unwrap_or_else(|_| json!({ "raw": text }))
                    };

                    if status.is_success() {
                        return Ok(ApiResponse {
                            request_id,
                            elapsed_ms: started.elapsed().as_millis(),
                            json: parsed,
                        });
                    }

                    return Err(self.http_error(status, request_id, parsed));
                }
                Err(err) => {
                    let transient = err.is_timeout() || err.is_connect() || err.is_request();
                    if transient && idempotent && attempt + 1 < max_attempts {
                        warn!(attempt, error = %err, "transient transport error, backing off");
                        sleep(backoff_delay_ms(attempt)).await;
                        continue;
                    }

                    let message = if err.is_timeout() {
                        "Request timed out.".to_string()
                    } else {
                        format!("Network request failed: {err}")
                    };
                    return Err(CliError::Network(with_debug_hint(&message, self.debug)));
                }
            }
        }

        Err(CliError::Network(with_debug_hint(
            "Request failed after retries.",
            self.debug,
        )))
    }

    fn http_error(
        &self,
        status: StatusCode,
        request_id: Option<String>,
        payload: Value,
    ) -> CliError {
        let mut details = error_message(&payload)
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

        if let Some(id) = request_id {
            details.push_str(&format!(" (request_id: {id})"));
        }
        if self.debug {
            let mut payload_text = payload.to_string();
            if let Some(key) = &self.api_key {
                payload_text = payload_text.replace(key, &redact_secret(key));
            }
            details.push_str(&format!(" payload={payload_text}"));
        } else {
            details = with_debug_hint(&details, false);
        }

        match status.as_u16() {
            400 => CliError::Usage(details),
            401 | 403 => CliError::Auth(details),
            429 => CliError::RateLimited(details),
            500..=599 => CliError::Server(details),
            _ => CliError::Generic(details),
        }
    }

    /// Start a streaming POST request (SSE format).
    /// Returns a receiver that yields the payload of every `data:` line. A
    /// transport failure mid-stream arrives as a final `Err` item.
    pub async fn post_stream(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<mpsc::UnboundedReceiver<Result<StreamEvent, CliError>>, CliError> {
        let key = self.require_key()?;
        let url = join_url(&self.base_url, path);
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, key)
            .json(body)
            .send()
            .await
            .map_err(|e| CliError::Network(format!("Stream request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let payload = response.json::<Value>().await.unwrap_or_else(|_| json!({}));
            return Err(self.http_error(status, None, payload));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let debug_hint = self.debug;

        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut lines = SseLines::default();

            while let Some(chunk_result) = stream.next().await {
                let chunk = match chunk_result {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        warn!(error = %err, "stream interrupted");
                        let message = format!("Stream interrupted: {err}");
                        let _ = tx.send(Err(CliError::Network(with_debug_hint(&message, debug_hint))));
                        return;
                    }
                };
                for data in lines.push(&chunk) {
                    if tx.send(Ok(StreamEvent { data })).is_err() {
                        return;
                    }
                }
            }

            if let Some(data) = lines.finish() {
                let _ = tx.send(Ok(StreamEvent { data }));
            }
        });

        Ok(rx)
    }
}

#[derive(Debug, Clone)]
pub struct StreamEvent {
    pub data: String,
}

/// Splits a byte stream into SSE `data:` payloads. Bytes are held until a
/// full line arrives, so a multi-byte character split across chunks is
/// decoded whole.
#[derive(Debug, Default)]
struct SseLines {
    pending: Vec<u8>,
}

impl SseLines {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(newline_pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(data) = parse_sse_data(line.trim()) {
                events.push(data);
            }
        }
        events
    }

    fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        parse_sse_data(String::from_utf8_lossy(&rest).trim())
    }
}

fn parse_sse_data(line: &str) -> Option<String> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(data.to_string())
}

/// Google APIs nest the message under `error.message`; other servers use a
/// flat string.
fn error_message(payload: &Value) -> Option<String> {
    payload
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|v| v.as_str())
        .or_else(|| payload.get("error").and_then(|v| v.as_str()))
        .or_else(|| payload.get("message").and_then(|v| v.as_str()))
        .map(|s| s.to_string())
}

fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn backoff_delay_ms(attempt: u32) -> Duration {
    let pow = attempt.min(6);
    let factor = 1u64 << pow;
    Duration::from_millis(200 * factor)
}


#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(
            join_url("https://generativelanguage.googleapis.com/", "/v1beta/models"),
            "https://generativelanguage.googleapis.com/v1beta/models"
        );
        assert_eq!(join_url("http://x", "https://y/z"), "https://y/z");
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_delay_ms(0), Duration::from_millis(200));
        assert_eq!(backoff_delay_ms(2), Duration::from_millis(800));
        assert_eq!(backoff_delay_ms(6), backoff_delay_ms(20));
    }

    #[test]
    fn nested_google_error_message_is_used() {
        let payload = json!({"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}});
        assert_eq!(error_message(&payload).as_deref(), Some("API key not valid."));
        assert_eq!(error_message(&json!({"message": "flat"})).as_deref(), Some("flat"));
        assert_eq!(error_message(&json!({})), None);
    }

    #[test]
    fn http_errors_map_to_variants() {
        let api = ApiClient::new("http://x".into(), Some("secret-key-123".into()), 1000, 0, false)
            .expect("client");
        let body = json!({"error": {"message": "nope"}});
        assert!(matches!(api.http_error(StatusCode::FORBIDDEN, None, body.clone()), CliError::Auth(_)));
        assert!(matches!(api.http_error(StatusCode::TOO_MANY_REQUESTS, None, body.clone()), CliError::RateLimited(_)));
        assert!(matches!(api.http_error(StatusCode::INTERNAL_SERVER_ERROR, None, body), CliError::Server(_)));
    }

    #[test]
    fn debug_payload_redacts_key() {
        let api = ApiClient::new("http://x".into(), Some("secret-key-123".into()), 1000, 0, true)
            .expect("client");
        let err = api.http_error(StatusCode::BAD_REQUEST, None, json!({"echo": "secret-key-123"}));
        let text = err.to_string();
        assert!(!text.contains("secret-key-123"));
        assert!(text.contains("sec********123"));
    }

    #[test]
    fn sse_data_lines_are_extracted() {
        assert_eq!(parse_sse_data("data: {\"a\":1}").as_deref(), Some("{\"a\":1}"));
        assert_eq!(parse_sse_data("data:[DONE]"), None);
        assert_eq!(parse_sse_data("event: ping"), None);
        assert_eq!(parse_sse_data(""), None);
    }

    #[test]
    fn split_multibyte_character_is_decoded_whole() {
        let mut lines = SseLines::default();
        let bytes = "data: {\"t\":\"café\"}\n\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xc3).expect("lead byte") + 1;
        assert!(lines.push(&bytes[..split]).is_empty());
        assert_eq!(lines.push(&bytes[split..]), vec!["{\"t\":\"café\"}".to_string()]);
        assert_eq!(lines.finish(), None);
    }

    #[test]
    fn unterminated_last_line_is_flushed() {
        let mut lines = SseLines::default();
        assert!(lines.push(b"data: tail").is_empty());
        assert_eq!(lines.finish().as_deref(), Some("tail"));
    }

    async fn collect(api: &ApiClient) -> Vec<Result<StreamEvent, CliError>> {
        let mut rx = api.post_stream("/stream", &json!({})).await.expect("stream opens");
        let mut items = Vec::new();
        while let Some(item) = rx.recv().await {
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn stream_keeps_characters_split_across_chunks() {
        use test_server::{END_CHUNKS, chunk, serve, sse_head};

        let event = "data: {\"t\":\"café ok\"}\n\n".as_bytes();
        let split = event.iter().position(|b| *b == 0xc3).expect("lead byte") + 1;
        let base = serve(vec![vec![
            sse_head(),
            chunk(&event[..split]),
            chunk(&event[split..]),
            END_CHUNKS.to_vec(),
        ]])
        .await;
        let api = ApiClient::new(base, Some("k".into()), 5000, 0, false).expect("client");

        let items = collect(&api).await;
        assert_eq!(items.len(), 1);
        let data = items[0].as_ref().map(|e| e.data.clone()).expect("event");
        assert_eq!(data, "{\"t\":\"café ok\"}");
    }

    #[tokio::test]
    async fn truncated_stream_ends_with_network_error() {
        use test_server::{chunk, serve, sse_head};

        let base = serve(vec![vec![sse_head(), chunk(b"data: {\"n\":1}\n\n")]]).await;
        let api = ApiClient::new(base, Some("k".into()), 5000, 0, false).expect("client");

        let items = collect(&api).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().map(|e| e.data.as_str()).ok(), Some("{\"n\":1}"));
        assert!(matches!(items[1], Err(CliError::Network(_))));
    }

    #[tokio::test]
    async fn unavailable_is_retried_then_succeeds() {
        use test_server::{json_response, serve};

        let base = serve(vec![
            json_response("503 Service Unavailable", r#"{"error":{"message":"busy"}}"#),
            json_response("200 OK", r#"{"ok":true}"#),
        ])
        .await;
        let api = ApiClient::new(base, Some("k".into()), 5000, 1, false).expect("client");

        let response = api.post_json("/gen", &json!({})).await.expect("second attempt");
        assert_eq!(response.json, json!({"ok": true}));
    }

    #[tokio::test]
    async fn rate_limit_surfaces_once_retries_run_out() {
        use test_server::{json_response, serve};

        let limited = json_response("429 Too Many Requests", r#"{"error":{"message":"slow down"}}"#);
        let base = serve(vec![limited.clone(), limited]).await;
        let api = ApiClient::new(base, Some("k".into()), 5000, 1, false).expect("client");

        let started = Instant::now();
        let err = api.get_json("/models", None).await.expect_err("limited");
        assert!(matches!(err, CliError::RateLimited(ref m) if m.contains("slow down")));
        assert!(started.elapsed() >= backoff_delay_ms(0));
    }

    #[tokio::test]
    async fn missing_key_is_auth_error() {
        let api = ApiClient::new("http://127.0.0.1:9".into(), None, 1000, 0, false).expect("client");
        let err = api.get_json("/v1beta/models", None).await.expect_err("no key");
        assert!(matches!(err, CliError::Auth(_)));
    }
}
