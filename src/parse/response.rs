// Shared extraction over generateContent payloads. Used by the one-shot
// commands, the TUIs and the streaming reader alike.

use serde_json::Value;

use crate::state::message::GroundingChunk;

fn first_candidate(payload: &Value) -> Option<&Value> {
    payload
        .get("candidates")
        .and_then(|v| v.as_array())
        .and_then(|c| c.first())
}

/// Concatenate the text parts of the first candidate.
pub fn extract_text(payload: &Value) -> Option<String> {
    let parts = first_candidate(payload)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    Some(text)
}

/// Web sources the model grounded its answer on. Chunks without a URI are
/// skipped.
pub fn extract_grounding(payload: &Value) -> Vec<GroundingChunk> {
    let Some(chunks) = first_candidate(payload)
        .and_then(|c| c.get("groundingMetadata"))
        .and_then(|m| m.get("groundingChunks"))
        .and_then(|v| v.as_array())
    else {
        return Vec::new();
    };

    chunks
        .iter()
        .filter_map(|chunk| {
            let web = chunk.get("web")?;
            let uri = web.get("uri")?.as_str()?.to_string();
            let title = web
                .get("title")
                .and_then(|t| t.as_str())
                .unwrap_or_default()
                .to_string();
            Some(GroundingChunk { uri, title })
        })
        .collect()
}

pub fn extract_block_reason(payload: &Value) -> Option<String> {
    payload
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .or_else(|| {
            first_candidate(payload)
                .and_then(|c| c.get("finishReason"))
                .and_then(|v| v.as_str())
                .filter(|r| *r != "STOP")
                .map(|s| s.to_string())
        })
}

/// Token usage as a display string.
pub fn extract_usage_line(payload: &Value) -> String {
    if let Some(usage) = payload.get("usageMetadata") {
        let input = usage
            .get("promptTokenCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let output = usage
            .get("candidatesTokenCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let total = usage
            .get("totalTokenCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(input + output);
        return format!("usage(input={input}, output={output}, total={total})");
    }
    "usage(unknown)".to_string()
}
