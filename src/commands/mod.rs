pub mod config;
pub mod directive;
pub mod kai;
pub mod models;
pub mod state;

use std::io::{self, Read};

use crate::errors::CliError;
use crate::output::money;
use crate::state::message::{ChatMessage, MessageKind, Sender};

/// Prompt text from the positional argument, or all of stdin with `--stdin`.
pub fn resolve_prompt(prompt: Option<&str>, stdin: bool, usage: &str) -> Result<String, CliError> {
    if stdin {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .map_err(|e| CliError::Generic(format!("Failed reading stdin: {e}")))?;
        let trimmed = input.trim().to_string();
        if trimmed.is_empty() {
            return Err(CliError::Usage(
                "No prompt provided via stdin. Pipe text or pass a prompt argument.".to_string(),
            ));
        }
        return Ok(trimmed);
    }

    match prompt {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(CliError::Usage(usage.to_string())),
    }
}

/// Plain-text rendering of one transcript entry for terminal output.
pub fn format_message(msg: &ChatMessage) -> String {
    let mut out = Vec::new();
    match (msg.sender, msg.kind) {
        (Sender::User, _) => out.push(format!("> {}", msg.text)),
        (Sender::System, Some(MessageKind::Error)) => out.push(format!("! {}", msg.text)),
        (Sender::System, _) => out.push(format!("· {}", msg.text)),
        (Sender::Ai, Some(MessageKind::Correction)) => {
            out.push(format!("[Self-Correction] {}", msg.text))
        }
        (Sender::Ai, Some(MessageKind::Meta)) => {
            out.push(format!("[Self-Awareness Update] {}", msg.text))
        }
        (Sender::Ai, _) => {
            if let Some(tool) = msg.tool() {
                out.push(format!("OPERATION: {}", tool.as_str()));
            }
            if let Some(reasoning) = msg.reasoning.as_deref().filter(|r| !r.trim().is_empty()) {
                out.push(format!("Reasoning: {reasoning}"));
            }
            if !msg.plan.is_empty() {
                out.push("Action Plan:".to_string());
                for (i, step) in msg.plan.iter().enumerate() {
                    out.push(format!("  {}. {step}", i + 1));
                }
            }
            out.push(msg.text.clone());
            if let Some(code) = msg.code.as_deref().filter(|c| !c.trim().is_empty()) {
                out.push(format!("```\n{}\n```", code.trim_end()));
            }
            if msg.revenue() > 0.0 {
                out.push(format!("Revenue Generated: {}", money(msg.revenue())));
            }
            if !msg.grounding_chunks.is_empty() {
                out.push("Sources:".to_string());
                for chunk in &msg.grounding_chunks {
                    out.push(format!("  {} <{}>", chunk.label(), chunk.uri));
                }
            }
        }
    }
    out.join("\n")
}
