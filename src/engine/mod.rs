//! Turn orchestration. Engines talk to a `ModelBackend` and describe the
//! resulting state changes as events; whoever owns the state applies them.

pub mod corp;
pub mod kai;

pub use corp::{CorpEngine, TurnEvent, TurnOverrides};
pub use kai::KaiEngine;

use std::path::Path;

use crate::errors::CliError;

pub const CORP_ATTACHMENT_EXTENSIONS: [&str; 3] = ["txt", "js", "py"];

/// Append an uploaded file to a Corp directive.
pub fn attach_corp_file(input: &str, name: &str, content: &str) -> String {
    format!(
        "{input}\n\n--- START OF UPLOADED FILE: {name} ---\n{content}\n--- END OF UPLOADED FILE ---"
    )
}

/// Append a text file to a KAI prompt.
pub fn attach_kai_file(input: &str, name: &str, content: &str) -> String {
    format!("{input}\n\n--- Content of {name} ---\n{content}")
}

/// Read a file for attaching. Corp only takes `.txt`, `.js` and `.py`; KAI
/// takes any UTF-8 text.
pub fn read_attachment(path: &Path, corp: bool) -> Result<(String, String), CliError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::Usage(format!("Not a file: {}", path.display())))?;

    if corp {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !CORP_ATTACHMENT_EXTENSIONS.contains(&ext.as_str()) {
            return Err(CliError::Usage(
                "Only .txt, .js and .py files can be attached.".to_string(),
            ));
        }
    }

    let bytes = std::fs::read(path)?;
    let content = String::from_utf8(bytes)
        .map_err(|_| CliError::Usage(format!("{name} is not a UTF-8 text file.")))?;
    Ok((name, content))
}
