//! Light transcript markup: fenced code, `**bold**`, `-`/`*` bullets and line
//! breaks. Nothing else is interpreted.

use std::sync::LazyLock;

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use regex::Regex;
use unicode_width::UnicodeWidthStr;

static CODE_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"```(\w+)?\n([\s\S]*?)\n```").ok());
static BOLD: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").ok());
static BULLET: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^\s*[-*]\s+").ok());
static FENCE_OPEN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"```(\w+)?\n?").ok());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Code { language: String, code: String },
}

/// Split text around fenced code blocks.
pub fn segments(text: &str) -> Vec<Segment> {
    let Some(re) = CODE_BLOCK.as_ref() else {
        return vec![Segment::Text(text.to_string())];
    };

    let mut out = Vec::new();
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            out.push(Segment::Text(text[last..whole.start()].to_string()));
        }
        out.push(Segment::Code {
            language: caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
            code: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
        });
        last = whole.end();
    }
    if last < text.len() {
        out.push(Segment::Text(text[last..].to_string()));
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inline {
    pub text: String,
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Line(Vec<Inline>),
    Bullet(Vec<Inline>),
}

pub fn inlines(line: &str) -> Vec<Inline> {
    let Some(re) = BOLD.as_ref() else {
        return vec![plain(line)];
    };
    let mut out = Vec::new();
    let mut last = 0;
    for caps in re.captures_iter(line) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            out.push(plain(&line[last..whole.start()]));
        }
        out.push(Inline {
            text: inner.as_str().to_string(),
            bold: true,
        });
        last = whole.end();
    }
    if last < line.len() || out.is_empty() {
        out.push(plain(&line[last..]));
    }
    out
}

fn plain(text: &str) -> Inline {
    Inline {
        text: text.to_string(),
        bold: false,
    }
}

/// One block per source line; bullet markers are removed.
pub fn blocks(text: &str) -> Vec<Block> {
    text.replace("\r\n", "\n")
        .split('\n')
        .map(|line| match BULLET.as_ref().and_then(|re| re.find(line)) {
            Some(marker) => Block::Bullet(inlines(&line[marker.end()..])),
            None => Block::Line(inlines(line)),
        })
        .collect()
}

/// Code from a Corp `code` field: fences removed, language label defaulting
/// to `code`.
pub fn clean_code(raw: &str) -> (String, String) {
    let language = FENCE_OPEN
        .as_ref()
        .and_then(|re| re.captures(raw))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "code".to_string());
    let body = match FENCE_OPEN.as_ref() {
        Some(re) => re.replace_all(raw, "").into_owned(),
        None => raw.to_string(),
    };
    (language, body.trim_end_matches('\n').to_string())
}

/// Styled, wrapped lines for a message body.
pub fn render(text: &str, width: usize, base: Style, code: Style) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut out = Vec::new();
    for segment in segments(text) {
        match segment {
            Segment::Text(t) => {
                for block in blocks(&t) {
                    out.extend(render_block(block, width, base));
                }
            }
            Segment::Code { language, code: body } => {
                out.extend(code_lines(&language, &body, width, code));
            }
        }
    }
    // Fences leave blank edges behind; trim them.
    while out.first().is_some_and(is_blank) {
        out.remove(0);
    }
    while out.last().is_some_and(is_blank) {
        out.pop();
    }
    out
}

/// A code block: label row then the code, hard-wrapped but never reflowed.
pub fn code_lines(language: &str, code: &str, width: usize, style: Style) -> Vec<Line<'static>> {
    let label = if language.is_empty() { "code" } else { language };
    let mut out = vec![Line::from(Span::styled(
        format!(" {label} "),
        style.add_modifier(Modifier::DIM),
    ))];
    for line in code.split('\n') {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            out.push(Line::from(Span::styled(" ".to_string(), style)));
            continue;
        }
        for chunk in chars.chunks(width.saturating_sub(1).max(1)) {
            out.push(Line::from(Span::styled(
                format!(" {}", chunk.iter().collect::<String>()),
                style,
            )));
        }
    }
    out
}

fn is_blank(line: &Line<'_>) -> bool {
    line.spans.iter().all(|s| s.content.trim().is_empty())
}

fn render_block(block: Block, width: usize, base: Style) -> Vec<Line<'static>> {
    let (first_prefix, rest_prefix, items) = match block {
        Block::Line(items) => ("", "", items),
        Block::Bullet(items) => ("• ", "  ", items),
    };
    let words = words(&items, base);
    let avail = width.saturating_sub(first_prefix.width()).max(1);
    let rows = wrap_words(words, avail);
    if rows.is_empty() {
        return vec![Line::from(Span::styled(first_prefix.to_string(), base))];
    }
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            let prefix = if i == 0 { first_prefix } else { rest_prefix };
            let mut spans = Vec::with_capacity(row.len() + 1);
            if !prefix.is_empty() {
                spans.push(Span::styled(prefix.to_string(), base));
            }
            spans.extend(row);
            Line::from(spans)
        })
        .collect()
}

struct Word {
    text: String,
    style: Style,
    /// Continues the previous word without a space, e.g. `**bold**,`.
    attached: bool,
}

fn words(items: &[Inline], base: Style) -> Vec<Word> {
    let mut out = Vec::new();
    let mut open = false;
    for item in items {
        let style = if item.bold {
            base.add_modifier(Modifier::BOLD)
        } else {
            base
        };
        let leading_space = item.text.starts_with(char::is_whitespace);
        for (i, word) in item.text.split_whitespace().enumerate() {
            out.push(Word {
                text: word.to_string(),
                style,
                attached: i == 0 && open && !leading_space,
            });
        }
        open = !item.text.is_empty() && !item.text.ends_with(char::is_whitespace);
    }
    out
}

fn wrap_words(words: Vec<Word>, width: usize) -> Vec<Vec<Span<'static>>> {
    let mut rows: Vec<Vec<Span<'static>>> = Vec::new();
    let mut row: Vec<Span<'static>> = Vec::new();
    let mut used = 0usize;

    for word in words {
        let w = word.text.width();
        if !row.is_empty() && !word.attached {
            if used + 1 + w > width {
                rows.push(std::mem::take(&mut row));
                used = 0;
            } else {
                row.push(Span::styled(" ".to_string(), word.style));
                used += 1;
            }
        }
        used += w;
        row.push(Span::styled(word.text, word.style));
    }
    if !row.is_empty() {
        rows.push(row);
    }
    rows
}

pub fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_code_fences() {
        let text = "Here:\n```rust\nfn main() {}\n```\nDone.";
        assert_eq!(
            segments(text),
            vec![
                Segment::Text("Here:\n".into()),
                Segment::Code {
                    language: "rust".into(),
                    code: "fn main() {}".into()
                },
                Segment::Text("\nDone.".into()),
            ]
        );
    }

    #[test]
    fn fence_without_language() {
        let segs = segments("```\nx = 1\n```");
        assert_eq!(
            segs,
            vec![Segment::Code {
                language: String::new(),
                code: "x = 1".into()
            }]
        );
    }

    #[test]
    fn bold_and_bullets() {
        let parsed = blocks("**Plan:**\n- first **step**\n  * second\nend");
        assert_eq!(
            parsed[0],
            Block::Line(vec![Inline {
                text: "Plan:".into(),
                bold: true
            }])
        );
        assert!(matches!(&parsed[1], Block::Bullet(items) if items[0].text == "first " && items[1].bold));
        assert!(matches!(&parsed[2], Block::Bullet(items) if items[0].text == "second"));
        assert!(matches!(&parsed[3], Block::Line(_)));
    }

    #[test]
    fn code_field_is_cleaned() {
        assert_eq!(
            clean_code("```python\nprint('hi')\n```"),
            ("python".to_string(), "print('hi')".to_string())
        );
        assert_eq!(clean_code("let x = 1;"), ("code".to_string(), "let x = 1;".to_string()));
    }

    #[test]
    fn render_wraps_and_marks_bullets() {
        let lines = render("- alpha beta gamma", 10, Style::default(), Style::default());
        let text: Vec<String> = lines.iter().map(line_text).collect();
        assert_eq!(text, vec!["• alpha", "  beta", "  gamma"]);
    }

    #[test]
    fn bold_keeps_trailing_punctuation_attached() {
        let lines = render("a **b**, c", 40, Style::default(), Style::default());
        assert_eq!(line_text(&lines[0]), "a b, c");
    }

    #[test]
    fn render_labels_code() {
        let lines = render("```js\nlet a;\n```", 40, Style::default(), Style::default());
        let text: Vec<String> = lines.iter().map(line_text).collect();
        assert_eq!(text, vec![" js ", " let a;"]);
    }
}
