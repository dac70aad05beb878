use chrono::Local;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, List, ListItem, Paragraph, Wrap};

use super::key::SETTINGS_ROWS;
use super::types::{AnalyzeField, App, Mode, Module};
use crate::markup;
use crate::state::kai::Memory;
use crate::state::message::{ChatMessage, MessageKind, Sender};
use crate::theme::{Palette, c_err};
use crate::tui::widgets::{
    centered_rect, compose_lr_line, panel, plain_lines, popup, render_confirm, render_input,
    render_login, scroll_window, truncate_to_width,
};

const SIDEBAR_WIDTH: u16 = 18;
const RESET_QUESTION: &str = "Are you sure you want to reset KAI? This will clear all chat history and memories and cannot be undone.";
const DELETE_QUESTION: &str = "Are you sure you want to delete this memory?";

pub fn ui(f: &mut Frame<'_>, app: &mut App) {
    let palette = app.palette();
    if !app.state.is_authenticated {
        render_login(f, &palette, "KAI", "Your Personal AI Companion");
        return;
    }

    let size = f.area();
    f.render_widget(Block::default().style(palette.base()), size);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(size);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(1)])
        .split(rows[0]);

    render_sidebar(f, app, &palette, cols[0]);
    match app.module {
        Module::Converse => render_converse(f, app, &palette, cols[1]),
        Module::Create => render_create(f, app, &palette, cols[1]),
        Module::Analyze => render_analyze(f, app, &palette, cols[1]),
        Module::Memory => render_memory(f, app, &palette, cols[1]),
    }
    render_footer(f, app, &palette, rows[1]);

    match app.mode {
        Mode::Normal => {}
        Mode::Help => render_help(f, &palette, centered_rect(70, 60, size)),
        Mode::Settings => render_settings(f, app, &palette, centered_rect(45, 40, size)),
        Mode::ConfirmReset => {
            render_confirm(f, centered_rect(50, 30, size), "Reset KAI", RESET_QUESTION, &palette)
        }
        Mode::ConfirmDelete(_) => {
            render_confirm(f, centered_rect(50, 25, size), "Delete", DELETE_QUESTION, &palette)
        }
        Mode::Attach => {
            let area = centered_rect(60, 20, size);
            let inner = popup(f, area, "Attach text file", &palette);
            render_input(
                f,
                inner,
                &app.attach_input,
                "Path to file, Enter to attach",
                Block::default(),
                &palette,
                true,
            );
        }
    }
}

fn render_sidebar(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let mut items = vec![
        ListItem::new(Line::from(Span::styled(
            " ● KAI",
            palette.title().add_modifier(Modifier::BOLD),
        ))),
        ListItem::new(""),
    ];
    for (i, module) in Module::ALL.iter().enumerate() {
        let active = *module == app.module;
        let style = if active {
            palette.title().add_modifier(Modifier::REVERSED)
        } else {
            Style::default().fg(palette.fg)
        };
        items.push(ListItem::new(Line::from(vec![
            Span::styled(format!(" F{} ", i + 2), palette.dim()),
            Span::styled(format!(" {} ", module.title()), style),
        ])));
    }
    f.render_widget(List::new(items).block(panel("", palette, false)), area);
}

fn render_footer(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let hints = match app.module {
        Module::Converse => "Enter send · Alt+↑↓ select · Ctrl+K commit to memory · Ctrl+A attach",
        Module::Create => "Enter generate",
        Module::Analyze => "↑↓ switch field · Enter analyze · Ctrl+A attach",
        Module::Memory => "type to search · ↑↓ select · Del delete",
    };
    let mut right = Vec::new();
    if app.waiting {
        right.push(Span::styled(format!("{} ", app.spinner.frame()), palette.title()));
    }
    right.push(Span::styled(app.status.clone(), Style::default().fg(palette.fg)));
    right.push(Span::styled(" · F1 help · F6 settings ", palette.dim()));
    let left = vec![Span::styled(format!(" {hints}"), palette.dim())];
    f.render_widget(
        Paragraph::new(compose_lr_line(area.width as usize, &left, &right)),
        area,
    );
}

fn render_converse(f: &mut Frame, app: &mut App, palette: &Palette, area: Rect) {
    let input_rows = (app.converse_input.text().matches('\n').count() as u16 + 1).clamp(1, 6);
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(input_rows + 2)])
        .split(area);
    let focused = app.mode == Mode::Normal;

    let width = parts[0].width.saturating_sub(2).max(1) as usize;
    let height = parts[0].height.saturating_sub(2).max(1) as usize;
    let lines = transcript_lines(app, palette, width);
    let visible = scroll_window(lines, height, &mut app.scroll_from_bottom);
    f.render_widget(
        Paragraph::new(visible).block(panel("Converse", palette, false)),
        parts[0],
    );

    render_input(
        f,
        parts[1],
        &app.converse_input,
        "Ask KAI anything...",
        panel("Message", palette, focused),
        palette,
        focused,
    );
}

fn transcript_lines(app: &App, palette: &Palette, width: usize) -> Vec<Line<'static>> {
    let mut out = Vec::new();
    let body_w = width.saturating_sub(2).max(1);
    for (i, msg) in app.state.chat_history.iter().enumerate() {
        out.extend(message_lines(msg, palette, body_w, app.selected == Some(i)));
        out.push(Line::from(""));
    }
    if let Some(partial) = &app.streaming {
        out.push(speaker("KAI", palette.accent, false));
        if partial.is_empty() {
            out.push(Line::from(Span::styled(
                format!("  {} ", app.spinner.frame()),
                palette.title(),
            )));
        } else {
            out.extend(indent(markup::render(
                partial,
                body_w,
                Style::default().fg(palette.ai),
                palette.code(),
            )));
        }
    }
    out
}

fn speaker(name: &str, color: ratatui::style::Color, selected: bool) -> Line<'static> {
    let marker = if selected { "▶ " } else { "" };
    Line::from(Span::styled(
        format!("{marker}{name}"),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn message_lines(
    msg: &ChatMessage,
    palette: &Palette,
    width: usize,
    selected: bool,
) -> Vec<Line<'static>> {
    let mut out = Vec::new();
    match msg.sender {
        Sender::User => {
            out.push(speaker("You", palette.user, false));
            out.extend(plain_lines(&msg.text, width + 2, "  ", Style::default().fg(palette.fg)));
        }
        Sender::Ai => {
            out.push(speaker("KAI", palette.accent, selected));
            out.extend(indent(markup::render(
                &msg.text,
                width,
                Style::default().fg(palette.ai),
                palette.code(),
            )));
        }
        Sender::System => {
            let color = if msg.kind == Some(MessageKind::Error) {
                c_err()
            } else {
                palette.muted
            };
            out.extend(
                plain_lines(&msg.text, width + 2, "", Style::default().fg(color))
                    .into_iter()
                    .map(|l| l.alignment(Alignment::Center)),
            );
        }
    }
    out
}

fn indent(lines: Vec<Line<'static>>) -> Vec<Line<'static>> {
    lines
        .into_iter()
        .map(|line| {
            let mut spans = vec![Span::raw("  ")];
            spans.extend(line.spans);
            Line::from(spans)
        })
        .collect()
}

fn module_header(title: &str, tagline: &str, palette: &Palette) -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled(
            title.to_string(),
            palette.title().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(tagline.to_string(), palette.dim())),
    ]
}

fn render_result(
    f: &mut Frame,
    app: &App,
    (title, text, busy_label): (&str, &str, &str),
    palette: &Palette,
    area: Rect,
) {
    let width = area.width.saturating_sub(2).max(1) as usize;
    let lines = if app.waiting && text.is_empty() {
        vec![Line::from(vec![
            Span::styled(format!("{} ", app.spinner.frame()), palette.title()),
            Span::styled(busy_label.to_string(), palette.dim()),
        ])]
    } else {
        markup::render(text, width, Style::default().fg(palette.fg), palette.code())
    };
    f.render_widget(
        Paragraph::new(lines).block(panel(title, palette, false)),
        area,
    );
}

fn render_create(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Min(3),
        ])
        .split(area);
    let focused = app.mode == Mode::Normal;

    f.render_widget(
        Paragraph::new(module_header(
            "Create",
            "Bring your ideas to life. Write a prompt and let KAI do the rest.",
            palette,
        )),
        parts[0],
    );
    render_input(
        f,
        parts[1],
        &app.create_input,
        "e.g., A short story about a robot who discovers music...",
        panel("Your Prompt", palette, focused),
        palette,
        focused,
    );
    render_result(f, app, ("Result", &app.creation, "Generating..."), palette, parts[2]);
}

fn render_analyze(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(8),
            Constraint::Length(4),
            Constraint::Min(3),
        ])
        .split(area);
    let normal = app.mode == Mode::Normal;
    let text_focus = normal && app.analyze_field == AnalyzeField::Text;
    let question_focus = normal && app.analyze_field == AnalyzeField::Question;

    f.render_widget(
        Paragraph::new(module_header(
            "Analyze",
            "Get insights from text. Provide content and ask a question.",
            palette,
        )),
        parts[0],
    );
    render_input(
        f,
        parts[1],
        &app.analyze_text,
        "Paste any text, article, or code snippet here...",
        panel("Text to Analyze", palette, text_focus),
        palette,
        text_focus,
    );
    render_input(
        f,
        parts[2],
        &app.analyze_question,
        "e.g., Summarize the main points, explain this function, what is the sentiment?",
        panel("Your Question", palette, question_focus),
        palette,
        question_focus,
    );
    render_result(f, app, ("Analysis", &app.analysis, "Analyzing..."), palette, parts[3]);
}

fn render_memory(f: &mut Frame, app: &mut App, palette: &Palette, area: Rect) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
        ])
        .split(area);
    let focused = app.mode == Mode::Normal;

    f.render_widget(
        Paragraph::new(module_header(
            "Memory",
            "A searchable archive of all the key insights you've saved.",
            palette,
        )),
        parts[0],
    );
    render_input(
        f,
        parts[1],
        &app.search_input,
        "Search memories...",
        panel("Search", palette, focused),
        palette,
        focused,
    );

    let term = app.search_input.text();
    let width = parts[2].width.saturating_sub(2).max(1) as usize;
    let memories = app.visible_memories();
    if let Some(empty) = empty_state(app.state.memories.is_empty(), memories.is_empty(), &term) {
        let lines: Vec<Line> = empty
            .into_iter()
            .map(|l| Line::from(Span::styled(l, palette.dim())))
            .collect();
        f.render_widget(
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(panel("Archive", palette, false)),
            parts[2],
        );
        return;
    }

    let selected = app.memory_state.selected();
    let items: Vec<ListItem> = memories
        .iter()
        .enumerate()
        .map(|(i, m)| ListItem::new(memory_lines(m, palette, width, selected == Some(i))))
        .collect();
    let list = List::new(items).block(panel("Archive", palette, false));
    f.render_stateful_widget(list, parts[2], &mut app.memory_state);
}

/// Text for an empty archive or a search with no hits.
fn empty_state(archive_empty: bool, no_hits: bool, term: &str) -> Option<Vec<String>> {
    if archive_empty {
        return Some(vec![
            String::new(),
            "Memory is Empty".to_string(),
            "In the 'Converse' module, select an AI response and press Ctrl+K to save it here."
                .to_string(),
        ]);
    }
    if no_hits {
        return Some(vec![String::new(), format!("No memories found for \"{term}\"")]);
    }
    None
}

fn memory_lines(
    memory: &Memory,
    palette: &Palette,
    width: usize,
    selected: bool,
) -> Vec<Line<'static>> {
    let title_style = if selected {
        palette.title().add_modifier(Modifier::REVERSED)
    } else {
        palette.title()
    };
    let mut out = vec![Line::from(Span::styled(
        truncate_to_width(&memory.summary, width),
        title_style,
    ))];
    let preview: Vec<Line<'static>> =
        plain_lines(&memory.content, width, "  ", Style::default().fg(palette.fg));
    let more = preview.len() > 3;
    out.extend(preview.into_iter().take(3));
    if more {
        out.push(Line::from(Span::styled("  …", palette.dim())));
    }
    out.push(Line::from(Span::styled(
        format!(
            "  ◷ {}",
            memory.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ),
        palette.dim(),
    )));
    out.push(Line::from(""));
    out
}

fn render_settings(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let inner = popup(f, area, "Settings", palette);
    let selected = app.settings_state.selected().unwrap_or(0).min(SETTINGS_ROWS - 1);
    let marker = |row: usize| if row == selected { "▶ " } else { "  " };
    let lines = vec![
        Line::from(vec![
            Span::styled(marker(0), palette.title()),
            Span::styled("Appearance      ", Style::default().fg(palette.fg)),
            Span::styled(format!("◀ {} ▶", app.state.theme.as_str()), palette.title()),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  Danger Zone",
            Style::default().fg(c_err()).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "  This action is permanent and cannot be undone.",
            palette.dim(),
        )),
        Line::from(vec![
            Span::styled(marker(1), palette.title()),
            Span::styled(
                "Reset KAI (Clear All Data)",
                Style::default().fg(c_err()).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled("↑↓ select · Enter choose · Esc close", palette.dim())),
    ];
    f.render_widget(Paragraph::new(lines), inner);
}

fn render_help(f: &mut Frame, palette: &Palette, area: Rect) {
    let inner = popup(f, area, "Help", palette);
    let rows = [
        ("Tab / F2-F5", "Switch module"),
        ("Enter", "Send, generate or analyze"),
        ("Alt+Enter", "New line"),
        ("Alt+↑ / Alt+↓", "Select a KAI response"),
        ("Ctrl+K", "Commit the selected response to memory"),
        ("Ctrl+A", "Attach a text file"),
        ("PgUp / PgDn", "Scroll the conversation"),
        ("Del (Memory)", "Delete the selected memory"),
        ("F6 / Ctrl+S", "Settings"),
        ("Esc / Ctrl+C", "Quit"),
    ];
    let lines: Vec<Line> = rows
        .iter()
        .map(|(key, what)| {
            Line::from(vec![
                Span::styled(format!("{key:<16}"), palette.title()),
                Span::styled(what.to_string(), Style::default().fg(palette.fg)),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::KaiEngine;
    use crate::markup::line_text;
    use crate::model::scripted::ScriptedBackend;
    use crate::state::StateStore;
    use crate::state::kai::KaiState;
    use crate::state::message::Theme;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;

    fn app() -> (tempfile::TempDir, App) {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = KaiState {
            is_authenticated: true,
            ..KaiState::default()
        };
        let app = App::new(
            state,
            StateStore::new(dir.path()),
            KaiEngine::new(Arc::new(ScriptedBackend::new())),
        );
        (dir, app)
    }

    fn screen_text(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).expect("terminal");
        terminal.draw(|f| ui(f, app)).expect("draw");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn empty_states_match_archive_contents() {
        assert_eq!(
            empty_state(true, true, "").map(|l| l[1].clone()),
            Some("Memory is Empty".to_string())
        );
        assert_eq!(
            empty_state(false, true, "rust").map(|l| l[1].clone()),
            Some("No memories found for \"rust\"".to_string())
        );
        assert_eq!(empty_state(false, false, "rust"), None);
    }

    #[test]
    fn streaming_reply_is_shown_under_kai() {
        let (_dir, mut app) = app();
        app.state.push_message(ChatMessage::user("hi"));
        app.streaming = Some("Hello **there**".to_string());
        let palette = Palette::for_theme(Theme::Light);
        let lines: Vec<String> = transcript_lines(&app, &palette, 40)
            .iter()
            .map(line_text)
            .collect();
        assert_eq!(lines.last().map(String::as_str), Some("  Hello there"));
        assert!(lines.contains(&"KAI".to_string()));
    }

    #[test]
    fn memory_items_show_summary_and_preview() {
        let palette = Palette::for_theme(Theme::Dark);
        let mut state = KaiState::default();
        let memory = state.commit_memory("line one\nline two", "Pair of lines").clone();
        let lines: Vec<String> = memory_lines(&memory, &palette, 40, false)
            .iter()
            .map(line_text)
            .collect();
        assert_eq!(lines[0], "Pair of lines");
        assert_eq!(lines[1], "  line one");
        assert!(lines[3].starts_with("  ◷ "));
    }

    #[test]
    fn every_module_and_modal_renders() {
        let (_dir, mut app) = app();
        for module in Module::ALL {
            app.module = module;
            let text = screen_text(&mut app);
            assert!(text.contains(module.title()));
        }
        app.module = Module::Memory;
        assert!(screen_text(&mut app).contains("Memory is Empty"));
        app.mode = Mode::Settings;
        assert!(screen_text(&mut app).contains("Reset KAI (Clear All Data)"));
    }

    #[test]
    fn login_screen_until_signed_in() {
        let (_dir, mut app) = app();
        app.state.is_authenticated = false;
        let text = screen_text(&mut app);
        assert!(text.contains("Your Personal AI Companion"));
    }
}
