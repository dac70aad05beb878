use clap::{Subcommand, ValueEnum};
use serde_json::json;

use crate::app::Runtime;
use crate::config::{ensure_profile, profile_mut, profile_ref, save_config, validate_url};
use crate::errors::{CliError, redact_secret};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Initialize config file and profile. The global `--api-url` and
    /// `--model` are stored on the profile.
    Init {
        #[arg(long = "api-key")]
        api_key: Option<String>,
    },
    /// Read a config key from the active profile
    Get {
        key: ConfigKey,
        #[arg(long)]
        show_key: bool,
    },
    /// Set a config key on the active profile
    Set { key: ConfigKey, value: String },
    /// List all profiles
    Profiles,
    /// Switch active profile
    Use { profile: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigKey {
    #[value(name = "apiUrl")]
    ApiUrl,
    #[value(name = "apiKey")]
    ApiKey,
    #[value(name = "model")]
    Model,
}

impl ConfigKey {
    fn name(self) -> &'static str {
        match self {
            ConfigKey::ApiUrl => "apiUrl",
            ConfigKey::ApiKey => "apiKey",
            ConfigKey::Model => "model",
        }
    }
}

pub async fn handle(runtime: &mut Runtime, command: ConfigCommand) -> Result<(), CliError> {
    match command {
        ConfigCommand::Init { api_key } => init(runtime, api_key),
        ConfigCommand::Get { key, show_key } => get(runtime, key, show_key),
        ConfigCommand::Set { key, value } => set(runtime, key, value),
        ConfigCommand::Profiles => profiles(runtime),
        ConfigCommand::Use { profile } => use_profile(runtime, profile),
    }
}

fn init(runtime: &mut Runtime, api_key: Option<String>) -> Result<(), CliError> {
    let profile_name = runtime.active_profile();
    let api_url = runtime.api_url_override.clone();
    let model = runtime.model_override.clone();
    let interactive = !is_ci() && !runtime.output.json && !runtime.output.quiet;
    ensure_profile(&mut runtime.config, &profile_name);
    if let Some(profile) = profile_mut(&mut runtime.config, &profile_name) {
        if let Some(url) = api_url {
            validate_url(&url)?;
            profile.api_url = url;
        }
        if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
            profile.model = model.trim().to_string();
        }

        if let Some(value) = api_key {
            profile.api_key = Some(value);
        } else if interactive {
            let maybe_key = rpassword::prompt_password("API key (optional, Enter to skip): ")
                .map_err(|e| CliError::Generic(format!("Failed reading API key: {e}")))?;
            if !maybe_key.trim().is_empty() {
                profile.api_key = Some(maybe_key.trim().to_string());
            }
        }
    }

    runtime.config.profile = profile_name;
    let path = save_config(&runtime.config)?;
    runtime.config_path = path.clone();

    if runtime.output.json {
        runtime
            .output
            .print_json(&json!({ "ok": true, "path": path }))?;
    } else {
        runtime
            .output
            .print_human(&format!("Config initialized: {}", path.display()));
    }
    Ok(())
}

fn get(runtime: &Runtime, key: ConfigKey, show_key: bool) -> Result<(), CliError> {
    let profile_name = runtime.active_profile();
    let profile = profile_ref(&runtime.config, &profile_name).ok_or_else(|| {
        CliError::Usage(format!(
            "Profile '{profile_name}' not found. Run `autocorp config init` first."
        ))
    })?;

    let value = match key {
        ConfigKey::ApiUrl => Some(profile.api_url.clone()),
        ConfigKey::Model => Some(runtime.resolved_model()),
        ConfigKey::ApiKey => runtime.resolved_api_key().map(|k| {
            if show_key { k } else { redact_secret(&k) }
        }),
    };

    if runtime.output.json {
        runtime.output.print_json(&json!({
            "key": key.name(),
            "value": value
        }))?;
    } else {
        runtime
            .output
            .print_human(value.as_deref().unwrap_or("(not set)"));
    }
    Ok(())
}

fn set(runtime: &mut Runtime, key: ConfigKey, value: String) -> Result<(), CliError> {
    let profile_name = runtime.active_profile();
    ensure_profile(&mut runtime.config, &profile_name);
    let profile = profile_mut(&mut runtime.config, &profile_name).ok_or_else(|| {
        CliError::Generic(format!(
            "Failed to resolve profile '{profile_name}' while setting config."
        ))
    })?;

    match key {
        ConfigKey::ApiUrl => {
            validate_url(&value)?;
            profile.api_url = value;
        }
        ConfigKey::ApiKey => {
            profile.api_key = Some(value);
        }
        ConfigKey::Model => {
            let model = value.trim();
            if model.is_empty() {
                return Err(CliError::Usage("Model name cannot be empty.".to_string()));
            }
            profile.model = model.to_string();
        }
    }

    let path = save_config(&runtime.config)?;
    runtime.config_path = path;

    if runtime.output.json {
        runtime.output.print_json(&json!({ "ok": true }))?;
    } else {
        runtime.output.print_human("Config updated.");
    }
    Ok(())
}

fn profiles(runtime: &Runtime) -> Result<(), CliError> {
    let active = runtime.active_profile();
    let mut names: Vec<String> = runtime.config.profiles.keys().cloned().collect();
    names.sort();

    if runtime.output.json {
        let payload = names
            .iter()
            .map(|name| {
                let profile = runtime.config.profiles.get(name);
                json!({
                    "name": name,
                    "active": name == &active,
                    "apiUrl": profile.map(|p| p.api_url.clone()).unwrap_or_default(),
                    "model": profile.map(|p| p.model.clone()).unwrap_or_default(),
                    "hasApiKey": profile
                        .and_then(|p| p.api_key.as_ref())
                        .is_some_and(|k| !k.is_empty())
                })
            })
            .collect::<Vec<_>>();
        runtime.output.print_json(&json!({ "profiles": payload }))?;
        return Ok(());
    }

    for name in names {
        let marker = if name == active { "*" } else { " " };
        let model = runtime
            .config
            .profiles
            .get(&name)
            .map(|p| p.model.as_str())
            .unwrap_or("-");
        runtime.output.print_human(&format!("{marker} {name}  ({model})"));
    }
    Ok(())
}

fn use_profile(runtime: &mut Runtime, profile_name: String) -> Result<(), CliError> {
    ensure_profile(&mut runtime.config, &profile_name);
    runtime.config.profile = profile_name.clone();
    let path = save_config(&runtime.config)?;
    runtime.config_path = path;

    if runtime.output.json {
        runtime
            .output
            .print_json(&json!({ "ok": true, "profile": profile_name }))?;
    } else {
        runtime
            .output
            .print_human(&format!("Active profile: {profile_name}"));
    }
    Ok(())
}

fn is_ci() -> bool {
    std::env::var("CI")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;

    #[test]
    fn keys_use_camel_case_names() {
        assert!(matches!(ConfigKey::from_str("apiKey", false), Ok(ConfigKey::ApiKey)));
        assert!(matches!(ConfigKey::from_str("model", false), Ok(ConfigKey::Model)));
        assert!(ConfigKey::from_str("token", false).is_err());
        assert_eq!(ConfigKey::ApiUrl.name(), "apiUrl");
    }
}
