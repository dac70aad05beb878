use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::CliError;

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const API_KEY_ENV: &str = "AUTOCORP_API_KEY";
const LEGACY_API_KEY_ENV: &str = "API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Where state files and the log live. Defaults to the OS data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            model: default_model(),
            data_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub profile: String,
    pub profiles: HashMap<String, ProfileConfig>,
}

impl Default for CliConfig {
    fn default() -> Self {
        let mut profiles = HashMap::new();
        profiles.insert("default".to_string(), ProfileConfig::default());
        Self {
            profile: "default".to_string(),
            profiles,
        }
    }
}

pub fn config_path() -> Result<PathBuf, CliError> {
    let base = dirs::config_dir().ok_or_else(|| {
        CliError::Generic("Could not resolve config directory for this OS.".to_string())
    })?;
    Ok(base.join("autocorp").join("config.json"))
}

pub fn load_config() -> Result<CliConfig, CliError> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(CliConfig::default());
    }

    let text = fs::read_to_string(&path)?;
    let mut config: CliConfig = serde_json::from_str(&text)?;
    let profile = config.profile.clone();
    ensure_profile(&mut config, &profile);
    Ok(config)
}

pub fn save_config(config: &CliConfig) -> Result<PathBuf, CliError> {
    let path = config_path()?;
    let parent = path
        .parent()
        .ok_or_else(|| CliError::Generic("Invalid config path.".to_string()))?;
    fs::create_dir_all(parent)?;
    fs::write(&path, serde_json::to_string_pretty(config)?)?;
    Ok(path)
}

pub fn active_profile_name(config: &CliConfig, profile_override: Option<&str>) -> String {
    profile_override
        .map(|s| s.to_string())
        .unwrap_or_else(|| config.profile.clone())
}

pub fn ensure_profile(config: &mut CliConfig, profile_name: &str) {
    if !config.profiles.contains_key(profile_name) {
        config
            .profiles
            .insert(profile_name.to_string(), ProfileConfig::default());
    }
}

pub fn profile_ref<'a>(config: &'a CliConfig, profile_name: &str) -> Option<&'a ProfileConfig> {
    config.profiles.get(profile_name)
}

pub fn profile_mut<'a>(
    config: &'a mut CliConfig,
    profile_name: &str,
) -> Option<&'a mut ProfileConfig> {
    config.profiles.get_mut(profile_name)
}

pub fn resolve_api_url(
    config: &CliConfig,
    profile_name: &str,
    api_override: Option<&str>,
) -> Result<String, CliError> {
    if let Some(url) = api_override {
        validate_url(url)?;
        return Ok(url.to_string());
    }

    let profile = profile_ref(config, profile_name)
        .ok_or_else(|| CliError::Usage(format!("Profile '{profile_name}' does not exist.")))?;
    validate_url(&profile.api_url)?;
    Ok(profile.api_url.clone())
}

pub fn resolve_api_key(config: &CliConfig, profile_name: &str) -> Option<String> {
    let from_env = [API_KEY_ENV, LEGACY_API_KEY_ENV]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty());
    if let Some(key) = from_env {
        return Some(key.trim().to_string());
    }

    profile_ref(config, profile_name)
        .and_then(|p| p.api_key.clone())
        .filter(|k| !k.trim().is_empty())
}

pub fn resolve_model(config: &CliConfig, profile_name: &str, model_override: Option<&str>) -> String {
    if let Some(model) = model_override.map(str::trim).filter(|m| !m.is_empty()) {
        return model.to_string();
    }
    profile_ref(config, profile_name)
        .map(|p| p.model.clone())
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(default_model)
}

pub fn data_dir(config: &CliConfig, profile_name: &str) -> Result<PathBuf, CliError> {
    if let Some(dir) = profile_ref(config, profile_name).and_then(|p| p.data_dir.as_deref()) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let base = dirs::data_dir().ok_or_else(|| {
        CliError::Generic("Could not resolve data directory for this OS.".to_string())
    })?;
    Ok(base.join("autocorp"))
}

pub fn validate_url(value: &str) -> Result<(), CliError> {
    let parsed = Url::parse(value)?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(CliError::Usage(
            "API URL must use http:// or https://.".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_targets_gemini() {
        let config = CliConfig::default();
        let url = resolve_api_url(&config, "default", None).expect("url");
        assert_eq!(url, DEFAULT_API_URL);
        assert_eq!(resolve_model(&config, "default", None), DEFAULT_MODEL);
    }

    #[test]
    fn overrides_win_over_profile() {
        let config = CliConfig::default();
        let url = resolve_api_url(&config, "default", Some("http://localhost:8080")).expect("url");
        assert_eq!(url, "http://localhost:8080");
        assert_eq!(resolve_model(&config, "default", Some("gemini-2.5-pro")), "gemini-2.5-pro");
        assert_eq!(resolve_model(&config, "default", Some("  ")), DEFAULT_MODEL);
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(matches!(validate_url("ftp://example.com"), Err(CliError::Usage(_))));
        assert!(matches!(validate_url("not a url"), Err(CliError::Usage(_))));
    }

    #[test]
    fn unknown_profile_is_usage_error() {
        let config = CliConfig::default();
        assert!(matches!(
            resolve_api_url(&config, "work", None),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn old_config_without_model_gets_default() {
        let raw = r#"{"profile":"default","profiles":{"default":{"api_url":"https://example.com"}}}"#;
        let config: CliConfig = serde_json::from_str(raw).expect("parse");
        assert_eq!(config.profiles["default"].model, DEFAULT_MODEL);
        assert!(config.profiles["default"].api_key.is_none());
    }

    /// Sets or clears both key variables for one check.
    fn with_key_env(primary: Option<&str>, legacy: Option<&str>, check: impl FnOnce()) {
        let saved = [API_KEY_ENV, LEGACY_API_KEY_ENV].map(|name| (name, std::env::var(name).ok()));
        for (name, value) in [(API_KEY_ENV, primary), (LEGACY_API_KEY_ENV, legacy)] {
            // SAFETY: the only test in the crate that touches these variables.
            unsafe {
                match value {
                    Some(value) => std::env::set_var(name, value),
                    None => std::env::remove_var(name),
                }
            }
        }
        check();
        for (name, value) in saved {
            // SAFETY: as above.
            unsafe {
                match value {
                    Some(value) => std::env::set_var(name, value),
                    None => std::env::remove_var(name),
                }
            }
        }
    }

    #[test]
    fn api_key_precedence_is_env_then_legacy_env_then_profile() {
        let mut config = CliConfig::default();
        if let Some(p) = profile_mut(&mut config, "default") {
            p.api_key = Some("from-profile".to_string());
        }
        let key = || resolve_api_key(&config, "default");

        with_key_env(Some(" primary "), Some("legacy"), || {
            assert_eq!(key().as_deref(), Some("primary"));
        });
        with_key_env(Some("  "), Some("legacy"), || {
            assert_eq!(key().as_deref(), Some("legacy"));
        });
        with_key_env(None, Some(""), || {
            assert_eq!(key().as_deref(), Some("from-profile"));
        });
        with_key_env(None, None, || {
            assert_eq!(resolve_api_key(&CliConfig::default(), "default"), None);
            assert_eq!(resolve_api_key(&config, "work"), None);
        });
    }

    #[test]
    fn data_dir_prefers_profile_override() {
        let mut config = CliConfig::default();
        if let Some(p) = profile_mut(&mut config, "default") {
            p.data_dir = Some("/tmp/autocorp-test".to_string());
        }
        assert_eq!(
            data_dir(&config, "default").expect("dir"),
            PathBuf::from("/tmp/autocorp-test")
        );
    }
}
