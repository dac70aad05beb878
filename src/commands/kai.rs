use std::io::{self, Write};
use std::path::PathBuf;

use chrono::Local;
use clap::{Args, Subcommand};
use serde_json::json;
use tokio::sync::mpsc;

use super::resolve_prompt;
use crate::app::Runtime;
use crate::engine::{KaiEngine, attach_kai_file, read_attachment};
use crate::errors::CliError;
use crate::state::kai::{KaiState, Memory};
use crate::state::message::{ChatMessage, Sender};

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Message for KAI
    pub prompt: Option<String>,
    /// Read the message from stdin
    #[arg(long)]
    pub stdin: bool,
    /// Append a text file to the message
    #[arg(long)]
    pub attach: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Creative prompt
    pub prompt: Option<String>,
    #[arg(long)]
    pub stdin: bool,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Question about the text
    pub question: String,
    /// Text to analyze
    #[arg(long, conflicts_with = "file")]
    pub text: Option<String>,
    /// Read the text to analyze from a file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum MemoryCommand {
    /// List every saved memory, newest first
    List,
    /// Case-insensitive search over summaries and content
    Search { term: String },
    /// Delete a memory by id
    Delete { id: i64 },
    /// Summarize text and save it as a memory
    Add {
        text: Option<String>,
        #[arg(long)]
        stdin: bool,
    },
}

fn engine(runtime: &Runtime) -> Result<KaiEngine, CliError> {
    Ok(KaiEngine::new(runtime.backend()?))
}

/// One Converse turn appended to the stored KAI history.
pub async fn chat(runtime: &Runtime, args: ChatArgs) -> Result<(), CliError> {
    let mut prompt = resolve_prompt(
        args.prompt.as_deref(),
        args.stdin,
        "Missing message. Use `autocorp chat \"...\"` or pass `--stdin`.",
    )?;
    if let Some(path) = &args.attach {
        let (name, content) = read_attachment(path, false)?;
        prompt = attach_kai_file(&prompt, &name, &content);
    }

    let engine = engine(runtime)?;
    let store = runtime.store::<KaiState>()?;
    let mut state = store.load();
    state.is_authenticated = true;
    state.push_message(ChatMessage::user(prompt));

    let stream = !runtime.output.json && !runtime.output.quiet;
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let printer = async move {
        let mut stdout = io::stdout();
        while let Some(delta) = rx.recv().await {
            if stream {
                let _ = write!(stdout, "{delta}");
                let _ = stdout.flush();
            }
        }
    };
    let (reply, ()) = tokio::join!(engine.converse(&state.chat_history, tx), printer);

    let failed = reply.sender == Sender::System;
    state.push_message(reply.clone());
    store.save(&state)?;

    if runtime.output.json {
        runtime.output.print_json(&json!({ "reply": reply }))?;
    } else if !failed {
        runtime.output.print_human("");
    }

    if failed {
        return Err(CliError::Model(reply.text));
    }
    Ok(())
}

pub async fn create(runtime: &Runtime, args: CreateArgs) -> Result<(), CliError> {
    let prompt = resolve_prompt(
        args.prompt.as_deref(),
        args.stdin,
        "Missing prompt. Use `autocorp create \"...\"` or pass `--stdin`.",
    )?;
    let text = engine(runtime)?.create(&prompt).await?;
    print_text(runtime, "creation", &text)
}

pub async fn analyze(runtime: &Runtime, args: AnalyzeArgs) -> Result<(), CliError> {
    let text = match (args.text, &args.file) {
        (Some(text), _) => text,
        (None, Some(path)) => read_attachment(path, false)?.1,
        (None, None) => {
            return Err(CliError::Usage(
                "Nothing to analyze. Pass `--text` or `--file`.".to_string(),
            ));
        }
    };
    let analysis = engine(runtime)?.analyze(&text, &args.question).await?;
    print_text(runtime, "analysis", &analysis)
}

fn print_text(runtime: &Runtime, key: &str, text: &str) -> Result<(), CliError> {
    if runtime.output.json {
        let mut payload = serde_json::Map::new();
        payload.insert(key.to_string(), json!(text));
        runtime.output.print_json(&payload)?;
    } else {
        runtime.output.print_human(text);
    }
    Ok(())
}

pub async fn memory(runtime: &Runtime, command: MemoryCommand) -> Result<(), CliError> {
    let store = runtime.store::<KaiState>()?;
    let mut state = store.load();

    match command {
        MemoryCommand::List => print_memories(runtime, &state.search(""), None),
        MemoryCommand::Search { term } => print_memories(runtime, &state.search(&term), Some(term.as_str())),
        MemoryCommand::Delete { id } => {
            if !state.delete_memory(id) {
                return Err(CliError::Usage(format!("No memory with id {id}.")));
            }
            state.is_authenticated = true;
            store.save(&state)?;
            if runtime.output.json {
                runtime.output.print_json(&json!({ "ok": true, "id": id }))?;
            } else {
                runtime.output.print_human(&format!("Deleted memory {id}."));
            }
            Ok(())
        }
        MemoryCommand::Add { text, stdin } => {
            let text = resolve_prompt(
                text.as_deref(),
                stdin,
                "Missing text. Use `autocorp memory add \"...\"` or pass `--stdin`.",
            )?;
            let memory = engine(runtime)?.commit_to_memory(&mut state, &text).await?;
            state.is_authenticated = true;
            store.save(&state)?;
            if runtime.output.json {
                runtime.output.print_json(&memory)?;
            } else {
                runtime
                    .output
                    .print_human(&format!("Saved memory {}: {}", memory.id, memory.summary));
            }
            Ok(())
        }
    }
}

fn print_memories(runtime: &Runtime, memories: &[&Memory], term: Option<&str>) -> Result<(), CliError> {
    if runtime.output.json {
        return runtime.output.print_json(&json!({ "memories": memories }));
    }
    if memories.is_empty() {
        let message = match term {
            Some(term) => format!("No memories found for \"{term}\""),
            None => "Memory is Empty".to_string(),
        };
        runtime.output.print_human(&message);
        return Ok(());
    }
    for memory in memories {
        runtime.output.print_human(&format_memory(memory));
    }
    Ok(())
}

fn format_memory(memory: &Memory) -> String {
    format!(
        "#{}  {}  {}\n    {}",
        memory.id,
        memory.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        memory.summary,
        memory.content.replace('\n', "\n    ")
    )
}
