use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::errors::CliError;

const EXCERPT_CHARS: usize = 160;

static TRAILING_COMMA: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").ok());

/// Parse a JSON object out of a model reply. Models wrap JSON in fences, add
/// chatter around it, or leave trailing commas; each is tolerated in turn.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T, CliError> {
    let clean = strip_markdown_fences(text);
    let fragment = extract_object(clean).unwrap_or(clean);

    let first_err = match serde_json::from_str::<T>(fragment) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    let repaired = repair(fragment);
    serde_json::from_str::<T>(&repaired).map_err(|_| {
        CliError::Model(format!(
            "Model returned malformed JSON ({first_err}). Reply: {}",
            excerpt(text)
        ))
    })
}

pub fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// First balanced `{...}` in `text`. Braces inside strings do not count.
pub fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn repair(json: &str) -> String {
    let mut fixed = json
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    if let Some(re) = TRAILING_COMMA.as_ref() {
        fixed = re.replace_all(&fixed, "$1").into_owned();
    }
    fixed
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t' | '\r'))
        .collect()
}

fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= EXCERPT_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
    format!("{cut}...")
}
