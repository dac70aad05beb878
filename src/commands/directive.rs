use std::path::PathBuf;

use clap::Args;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::info;

use super::{format_message, resolve_prompt};
use crate::app::Runtime;
use crate::engine::{CorpEngine, TurnEvent, TurnOverrides, attach_corp_file, read_attachment};
use crate::errors::CliError;
use crate::state::corp::CorpState;
use crate::state::message::{AiMode, ChatMessage, ToolChoice};

#[derive(Debug, Args)]
pub struct DirectiveArgs {
    /// Directive text
    pub prompt: Option<String>,
    /// Override the operating mode for this directive: safe, edge or hacker
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<AiMode>,
    /// Force a tool ("Google Search", "Debugger", ...), "auto" or "none"
    #[arg(long, value_parser = parse_tool)]
    pub tool: Option<ToolChoice>,
    /// Read the directive from stdin
    #[arg(long)]
    pub stdin: bool,
    /// Append a .txt, .js or .py file to the directive
    #[arg(long)]
    pub attach: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct LearnArgs {
    /// Architect log entry (at most 500 characters)
    pub log: Option<String>,
    /// Read the log entry from stdin
    #[arg(long)]
    pub stdin: bool,
}

fn parse_mode(value: &str) -> Result<AiMode, String> {
    AiMode::parse(value).ok_or_else(|| format!("unknown mode '{value}' (safe, edge, hacker)"))
}

fn parse_tool(value: &str) -> Result<ToolChoice, String> {
    ToolChoice::parse(value).ok_or_else(|| {
        let names: Vec<&str> = ToolChoice::all().into_iter().map(ToolChoice::label).collect();
        format!("unknown tool '{value}' ({})", names.join(", "))
    })
}

pub async fn directive(runtime: &Runtime, args: DirectiveArgs) -> Result<(), CliError> {
    let mut prompt = resolve_prompt(
        args.prompt.as_deref(),
        args.stdin,
        "Missing directive. Use `autocorp directive \"...\"` or pass `--stdin`.",
    )?;
    if let Some(path) = &args.attach {
        let (name, content) = read_attachment(path, true)?;
        runtime
            .output
            .print_verbose(&format!("attached {name} ({} bytes)", content.len()));
        prompt = attach_corp_file(&prompt, &name, &content);
    }

    let overrides = TurnOverrides {
        mode: args.mode,
        tool: args.tool.unwrap_or_default(),
    };
    let engine = CorpEngine::new(runtime.backend()?);
    run_turn(runtime, move |state, tx| async move {
        engine.send_message(&state, &prompt, overrides, &tx).await
    })
    .await
}

pub async fn learn(runtime: &Runtime, args: LearnArgs) -> Result<(), CliError> {
    let log = resolve_prompt(
        args.log.as_deref(),
        args.stdin,
        "Missing log entry. Use `autocorp learn \"...\"` or pass `--stdin`.",
    )?;
    let engine = CorpEngine::new(runtime.backend()?);
    run_turn(runtime, move |state, tx| async move {
        engine.process_meta_log(&state, &log, &tx).await
    })
    .await
}

/// Load Corp state, run one engine call against it, apply and save whatever
/// it produced, then report. The state is saved even when the turn fails so
/// error messages stay in the transcript.
async fn run_turn<F, Fut>(runtime: &Runtime, turn: F) -> Result<(), CliError>
where
    F: FnOnce(CorpState, mpsc::UnboundedSender<TurnEvent>) -> Fut,
    Fut: Future<Output = Result<(), CliError>>,
{
    let store = runtime.store::<CorpState>()?;
    let mut state = store.load();
    // Running a command is signing in.
    state.is_authenticated = true;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let result = turn(state.clone(), tx).await;

    let mut added: Vec<ChatMessage> = Vec::new();
    let learned_before = state.metacognition_log.len();
    while let Some(event) = rx.recv().await {
        match &event {
            TurnEvent::Append(m) => added.push(m.clone()),
            TurnEvent::ReplaceLast(m) => {
                added.pop();
                added.push(m.clone());
            }
            _ => {}
        }
        event.apply(&mut state);
    }
    store.save(&state)?;
    info!(messages = added.len(), ok = result.is_ok(), "turn saved");

    let learned = &state.metacognition_log[learned_before..];
    if runtime.output.json {
        runtime.output.print_json(&json!({
            "ok": result.is_ok(),
            "messages": added,
            "learned": learned,
            "traits": state.traits,
            "financials": state.financials,
        }))?;
    } else {
        for msg in &added {
            runtime.output.print_human(&format_message(msg));
            runtime.output.print_human("");
        }
        for event in learned {
            runtime.output.print_human(&format!("Learned: {}", event.learning_summary));
            for (name, delta) in event.adjustments.visible() {
                let arrow = if delta > 0.0 { "↑" } else { "↓" };
                runtime
                    .output
                    .print_human(&format!("  {arrow} {name} {delta:+}"));
            }
        }
        runtime.output.print_verbose(&format!(
            "revenue=${}k projects={}",
            state.financials.total_revenue,
            state.active_projects.len()
        ));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::message::AiTool;

    #[test]
    fn mode_and_tool_flags_parse() {
        assert_eq!(parse_mode("EDGE"), Ok(AiMode::Edge));
        assert!(parse_mode("reckless").is_err());
        assert_eq!(parse_tool("auto"), Ok(ToolChoice::AutoSelect));
        assert_eq!(parse_tool("none"), Ok(ToolChoice::None));
        assert_eq!(
            parse_tool("google search"),
            Ok(ToolChoice::Tool(AiTool::GoogleSearch))
        );
        assert!(parse_tool("hammer").unwrap_err().contains("Auto-Select"));
    }
}
