use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::corp::CorpState;
use super::kai::KaiState;
use crate::errors::CliError;

/// A state type that lives in its own JSON file.
pub trait Persisted: Serialize + DeserializeOwned + Default {
    const FILE_NAME: &'static str;

    /// Nothing is written before the user signs in.
    fn is_authenticated(&self) -> bool;

    /// Bring restored values back inside their valid ranges.
    fn normalize(&mut self) {}
}

impl Persisted for CorpState {
    const FILE_NAME: &'static str = "autonomous_ai_state.json";

    fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    fn normalize(&mut self) {
        self.set_temperature(self.temperature);
    }
}

impl Persisted for KaiState {
    const FILE_NAME: &'static str = "kai_state.json";

    fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }
}

#[derive(Debug, Clone)]
pub struct StateStore<T> {
    path: PathBuf,
    _state: PhantomData<T>,
}

impl<T: Persisted> StateStore<T> {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(T::FILE_NAME),
            _state: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing, unreadable or corrupt files all give defaults. Fields that do
    /// not fit the schema are dropped one by one so the rest still restores.
    pub fn load(&self) -> T {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return T::default(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "state file unreadable, using defaults");
                return T::default();
            }
        };

        let stored = match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                warn!(path = %self.path.display(), "state file is not a JSON object, using defaults");
                return T::default();
            }
        };

        let mut state: T = restore_partial(stored);
        state.normalize();
        state
    }

    pub fn save(&self, state: &T) -> Result<bool, CliError> {
        if !state.is_authenticated() {
            debug!(path = %self.path.display(), "not signed in, skipping save");
            return Ok(false);
        }
        let dir = self
            .path
            .parent()
            .ok_or_else(|| CliError::Storage("Invalid state path.".to_string()))?;
        fs::create_dir_all(dir).map_err(|e| storage_error("create state directory", e))?;

        let tmp = self.path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(state)?;
        fs::write(&tmp, text).map_err(|e| storage_error("write state", e))?;
        fs::rename(&tmp, &self.path).map_err(|e| storage_error("replace state", e))?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<(), CliError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "state cleared");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_error("remove state", err)),
        }
    }
}

fn storage_error(action: &str, err: std::io::Error) -> CliError {
    CliError::Storage(format!("Failed to {action}: {err}"))
}

fn restore_partial<T: Persisted>(stored: Map<String, Value>) -> T {
    let Ok(Value::Object(mut merged)) = serde_json::to_value(T::default()) else {
        return T::default();
    };

    let whole = overlay(&merged, &stored);
    if let Ok(state) = serde_json::from_value::<T>(Value::Object(whole)) {
        return state;
    }

    for (key, value) in stored {
        let mut candidate = merged.clone();
        candidate.insert(key.clone(), value);
        if serde_json::from_value::<T>(Value::Object(candidate.clone())).is_ok() {
            merged = candidate;
        } else {
            warn!(field = %key, "dropping stored field that no longer fits");
        }
    }

    serde_json::from_value(Value::Object(merged)).unwrap_or_default()
}

fn overlay(base: &Map<String, Value>, top: &Map<String, Value>) -> Map<String, Value> {
    let mut out = base.clone();
    for (k, v) in top {
        out.insert(k.clone(), v.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::message::{AiMode, Theme};
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::<CorpState>::new(dir.path());
        assert_eq!(store.load(), CorpState::default());
    }

    #[test]
    fn unauthenticated_state_is_not_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::<CorpState>::new(dir.path());
        let saved = store.save(&CorpState::default()).expect("save");
        assert!(!saved);
        assert!(!store.path().exists());
    }

    #[test]
    fn save_then_load_restores_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::<CorpState>::new(&dir.path().join("nested"));
        let mut state = CorpState::default();
        state.is_authenticated = true;
        state.ai_mode = AiMode::Edge;
        state.start_project("Quantum Ledger");
        state.add_revenue(80.0, true);

        assert!(store.save(&state).expect("save"));
        assert_eq!(store.load(), state);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::<KaiState>::new(dir.path());
        fs::write(store.path(), "{not json").expect("write");
        assert_eq!(store.load(), KaiState::default());
    }

    #[test]
    fn bad_field_is_dropped_but_others_survive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::<CorpState>::new(dir.path());
        fs::write(
            store.path(),
            r#"{"theme":"dark","traits":"broken","temperature":0.3,"isAuthenticated":true}"#,
        )
        .expect("write");

        let state = store.load();
        assert_eq!(state.theme, Theme::Dark);
        assert_eq!(state.temperature, 0.3);
        assert_eq!(state.traits, CorpState::default().traits);
        assert!(state.is_authenticated);
    }

    #[test]
    fn out_of_range_temperature_is_snapped_on_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::<CorpState>::new(dir.path());
        fs::write(store.path(), r#"{"temperature":7.5,"isAuthenticated":true}"#).expect("write");
        assert_eq!(store.load().temperature, 1.0);

        fs::write(store.path(), r#"{"temperature":0.349}"#).expect("write");
        assert_eq!(store.load().temperature, 0.3);
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::<KaiState>::new(dir.path());
        let state = KaiState {
            is_authenticated: true,
            ..KaiState::default()
        };
        store.save(&state).expect("save");
        store.clear().expect("clear");
        store.clear().expect("clear again");
        assert!(!store.path().exists());
    }
}
