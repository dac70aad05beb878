use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "AUTOCORP_LOG";
pub const LOG_FILE: &str = "autocorp.log";

/// Route `tracing` events to `<data_dir>/autocorp.log`. The terminal belongs
/// to the TUI, so nothing goes to stdout or stderr. Returns the log path, or
/// `None` when logging could not be set up.
pub fn init(data_dir: &Path, debug: bool) -> Option<PathBuf> {
    fs::create_dir_all(data_dir).ok()?;
    let path = data_dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .ok()?;

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .ok()?;
    Some(path)
}

fn default_directive(debug: bool) -> &'static str {
    if debug {
        "autocorp=debug,info"
    } else {
        "info"
    }
}
