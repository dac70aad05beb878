use crate::app::Runtime;
use crate::errors::CliError;

pub async fn handle(runtime: &Runtime) -> Result<(), CliError> {
    let backend = runtime.gemini()?;
    let models = backend.list_models().await?;
    runtime
        .output
        .print_verbose(&format!("active model: {}", runtime.resolved_model()));

    if runtime.output.json {
        runtime.output.print_json(&models)?;
        return Ok(());
    }

    if models.is_empty() {
        runtime.output.print_human("No models available.");
        return Ok(());
    }

    let active = runtime.resolved_model();
    for model in models {
        let id = model.name.strip_prefix("models/").unwrap_or(&model.name);
        let marker = if id == active { "*" } else { " " };
        let limit = model
            .input_token_limit
            .map(|n| format!("  ({n} input tokens)"))
            .unwrap_or_default();
        runtime
            .output
            .print_human(&format!("{marker} {id}  {}{limit}", model.display_name));
    }
    Ok(())
}
