use clap::{Subcommand, ValueEnum};
use serde_json::json;
use tracing::info;

use crate::app::Runtime;
use crate::errors::CliError;
use crate::output::money;
use crate::state::corp::CorpState;
use crate::state::kai::KaiState;
use crate::state::store::Persisted;

#[derive(Debug, Subcommand)]
pub enum StateCommand {
    /// Print stored state (both apps unless one is named)
    Show { app: Option<AppKind> },
    /// Delete stored state and sign out
    Reset {
        app: Option<AppKind>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AppKind {
    Corp,
    Kai,
}

impl AppKind {
    fn selected(app: Option<AppKind>) -> Vec<AppKind> {
        match app {
            Some(one) => vec![one],
            None => vec![AppKind::Corp, AppKind::Kai],
        }
    }
}

pub async fn handle(runtime: &Runtime, command: StateCommand) -> Result<(), CliError> {
    match command {
        StateCommand::Show { app } => show(runtime, app),
        StateCommand::Reset { app, yes } => reset(runtime, app, yes),
    }
}

fn show(runtime: &Runtime, app: Option<AppKind>) -> Result<(), CliError> {
    let apps = AppKind::selected(app);
    let corp = apps
        .contains(&AppKind::Corp)
        .then(|| runtime.store::<CorpState>().map(|s| s.load()))
        .transpose()?;
    let kai = apps
        .contains(&AppKind::Kai)
        .then(|| runtime.store::<KaiState>().map(|s| s.load()))
        .transpose()?;

    if runtime.output.json {
        return runtime.output.print_json(&json!({ "corp": corp, "kai": kai }));
    }
    if let Some(state) = &corp {
        runtime.output.print_human(&corp_summary(state));
    }
    if let Some(state) = &kai {
        runtime.output.print_human(&kai_summary(state));
    }
    Ok(())
}

fn corp_summary(state: &CorpState) -> String {
    let mut out = vec![
        format!("Autonomous Corp{}", signed_in(state.is_authenticated)),
        format!(
            "  mode: {}  theme: {}  temperature: {:.1}",
            state.ai_mode.as_str(),
            state.theme.as_str(),
            state.temperature
        ),
        format!(
            "  revenue: {}  costs: {}  profit: {}",
            money(state.financials.total_revenue),
            money(state.financials.operational_costs),
            money(state.financials.net_profit)
        ),
        format!(
            "  foundry: {} {:.0}%",
            state.llm_status.model_name, state.llm_status.training_progress
        ),
    ];
    let traits: Vec<String> = state
        .traits
        .iter()
        .map(|(name, value)| format!("{name} {value:.1}"))
        .collect();
    out.push(format!("  traits: {}", traits.join(", ")));
    for project in &state.active_projects {
        out.push(format!("  project: {} ({})", project.name, project.status.as_str()));
    }
    out.push(format!(
        "  messages: {}  learning events: {}",
        state.chat_history.len(),
        state.metacognition_log.len()
    ));
    out.join("\n")
}

fn kai_summary(state: &KaiState) -> String {
    format!(
        "KAI{}\n  theme: {}\n  messages: {}  memories: {}",
        signed_in(state.is_authenticated),
        state.theme.as_str(),
        state.chat_history.len(),
        state.memories.len()
    )
}

fn signed_in(authenticated: bool) -> &'static str {
    if authenticated { "" } else { " (signed out)" }
}

fn reset(runtime: &Runtime, app: Option<AppKind>, yes: bool) -> Result<(), CliError> {
    let apps = AppKind::selected(app);
    let names: Vec<&str> = apps
        .iter()
        .map(|a| match a {
            AppKind::Corp => "Autonomous Corp",
            AppKind::Kai => "KAI",
        })
        .collect();

    if !yes {
        let question = format!(
            "Reset {}? This clears all stored history and cannot be undone.",
            names.join(" and ")
        );
        if !runtime.output.confirm(&question)? {
            return Err(CliError::Usage(
                "Reset not confirmed. Pass `--yes` to skip the prompt.".to_string(),
            ));
        }
    }

    let mut cleared = Vec::new();
    for app in apps {
        let path = match app {
            AppKind::Corp => clear::<CorpState>(runtime)?,
            AppKind::Kai => clear::<KaiState>(runtime)?,
        };
        cleared.push(path);
    }

    if runtime.output.json {
        runtime
            .output
            .print_json(&json!({ "ok": true, "cleared": cleared }))?;
    } else {
        runtime
            .output
            .print_human(&format!("Reset {}.", names.join(" and ")));
    }
    Ok(())
}

fn clear<T: Persisted>(runtime: &Runtime) -> Result<String, CliError> {
    let store = runtime.store::<T>()?;
    store.clear()?;
    info!(path = %store.path().display(), "state reset from cli");
    Ok(store.path().display().to_string())
}
