use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::info;

use super::prompts;
use super::{GenerateRequest, ModelBackend};
use crate::errors::CliError;
use crate::parse::json::parse_json_reply;
use crate::state::corp::CorpState;
use crate::state::message::{AiMode, AiTool, GroundingChunk, ToolChoice};
use crate::state::traits::{TraitAdjustments, Traits};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DirectiveReply {
    pub response: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub reasoning: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub plan: Vec<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub tool_used: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "loose_number")]
    pub revenue_generated: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub new_project_name: Option<String>,
    #[serde(default)]
    pub trait_adjustments: TraitAdjustments,
}

impl DirectiveReply {
    /// The tool the model says it ran. Unknown names and "None" map to no tool.
    pub fn tool(&self) -> Option<AiTool> {
        self.tool_used.as_deref().and_then(AiTool::parse)
    }

    pub fn revenue(&self) -> f64 {
        self.revenue_generated
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchReply {
    pub text: String,
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CorrectionReply {
    pub root_cause: String,
    pub corrected_plan: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LearningReply {
    #[serde(default)]
    pub response: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub learning_summary: Option<String>,
    #[serde(default)]
    pub trait_adjustments: TraitAdjustments,
}

pub async fn process_user_input(
    backend: &dyn ModelBackend,
    message: &str,
    state: &CorpState,
    mode: AiMode,
    tool: ToolChoice,
) -> Result<DirectiveReply, CliError> {
    let request = GenerateRequest::prompt(prompts::directive_prompt(message, state, mode, tool))
        .system(prompts::CORP_SYSTEM)
        .temperature(state.temperature)
        .json();
    let generation = backend.generate(request).await?;
    let reply: DirectiveReply = parse_json_reply(&generation.text)?;
    info!(mode = %mode, tool = ?reply.tool(), revenue = reply.revenue(), "directive processed");
    Ok(reply)
}

/// Grounded web search. Plain text; search grounding and JSON output cannot
/// be combined.
pub async fn process_search_query(
    backend: &dyn ModelBackend,
    message: &str,
) -> Result<SearchReply, CliError> {
    let request = GenerateRequest::prompt(message)
        .system(prompts::SEARCH_SYSTEM)
        .with_search();
    let generation = backend.generate(request).await?;
    info!(sources = generation.grounding.len(), "search processed");
    Ok(SearchReply {
        text: generation.text.trim().to_string(),
        grounding_chunks: generation.grounding,
    })
}

pub async fn run_self_correction(
    backend: &dyn ModelBackend,
    message: &str,
    error: &str,
) -> Result<CorrectionReply, CliError> {
    let request = GenerateRequest::prompt(prompts::correction_prompt(message, error))
        .system(prompts::CORP_SYSTEM)
        .json();
    let generation = backend.generate(request).await?;
    parse_json_reply(&generation.text)
}

pub async fn process_meta_cognition(
    backend: &dyn ModelBackend,
    log: &str,
    traits: &Traits,
) -> Result<LearningReply, CliError> {
    let request = GenerateRequest::prompt(prompts::meta_cognition_prompt(log, traits))
        .system(prompts::CORP_SYSTEM)
        .json();
    let generation = backend.generate(request).await?;
    parse_json_reply(&generation.text)
}

pub async fn process_user_feedback(
    backend: &dyn ModelBackend,
    user_prompt: &str,
    ai_response: &str,
    reason: &str,
    traits: &Traits,
) -> Result<LearningReply, CliError> {
    let request = GenerateRequest::prompt(prompts::feedback_prompt(
        user_prompt,
        ai_response,
        reason,
        traits,
    ))
    .system(prompts::CORP_SYSTEM)
    .json();
    let generation = backend.generate(request).await?;
    parse_json_reply(&generation.text)
}

fn blank_as_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn string_or_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.trim().is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    })
}

fn loose_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s
            .trim()
            .trim_start_matches('$')
            .trim_end_matches(['k', 'K'])
            .replace(',', "")
            .parse()
            .ok(),
        _ => None,
    })
}
