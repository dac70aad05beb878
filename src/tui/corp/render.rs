use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::block::{Position, Title};
use ratatui::widgets::{Block, List, ListItem, Paragraph, Wrap};

use super::types::{App, Mode, SettingsItem, TOOLBOX, View};
use crate::engine::corp::MAX_META_LOG_CHARS;
use crate::markup;
use crate::model::prompts::directive;
use crate::output::money;
use crate::state::corp::MetaCognitionEvent;
use crate::state::message::{AiTool, ChatMessage, Feedback, MessageKind, Sender};
use crate::state::traits::Traits;
use crate::theme::{
    Palette, c_err, c_money, c_ok, load_color, project_status_icon, trait_color,
};
use crate::tui::widgets::{
    bar_line, centered_rect, compose_lr_line, panel, plain_lines, popup, render_confirm,
    render_input, render_login, scroll_window, truncate_to_width,
};

/// Columns needed to show all three views at once.
const WIDE_LAYOUT: u16 = 150;
const SELF_CORRECTOR: &str = "Self-Corrector: Autonomously fixes its own logical errors.";
const ARCHITECT_PLACEHOLDER: &str =
    "Architect's Log: Describe recent changes to my architecture...";
const RESET_QUESTION: &str = "Are you sure you want to reset the corporation? This will clear all chat history, learning and finances and cannot be undone.";

pub fn ui(f: &mut Frame<'_>, app: &mut App) {
    let palette = app.palette();
    if !app.state.is_authenticated {
        render_login(f, &palette, "Autonomous Corp", "Autonomous Corporation Console");
        return;
    }

    let size = f.area();
    f.render_widget(Block::default().style(palette.base()), size);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(size);

    render_header(f, app, &palette, rows[0]);

    if rows[1].width >= WIDE_LAYOUT {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(27),
                Constraint::Percentage(46),
                Constraint::Percentage(27),
            ])
            .split(rows[1]);
        render_dashboard(f, app, &palette, cols[0]);
        render_chat_view(f, app, &palette, cols[1]);
        render_tools(f, app, &palette, cols[2]);
    } else {
        match app.view {
            View::Dashboard => render_dashboard(f, app, &palette, rows[1]),
            View::Chat => render_chat_view(f, app, &palette, rows[1]),
            View::Tools => render_tools(f, app, &palette, rows[1]),
        }
    }

    render_footer(f, app, &palette, rows[2]);

    match app.mode {
        Mode::Normal => {}
        Mode::Help => render_help(f, &palette, centered_rect(70, 70, size)),
        Mode::Settings => render_settings(f, app, &palette, centered_rect(50, 50, size)),
        Mode::ConfirmReset => render_confirm(
            f,
            centered_rect(50, 30, size),
            "Reset",
            RESET_QUESTION,
            &palette,
        ),
        Mode::Feedback => render_feedback(f, app, &palette, centered_rect(60, 40, size)),
        Mode::Attach => {
            let area = centered_rect(60, 20, size);
            let inner = popup(f, area, "Attach file (.txt, .js, .py)", &palette);
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

fn render_header(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let left = vec![
        Span::styled(" ◆ Autonomous Corp ", palette.title()),
        Span::styled(format!("· {}", app.view.title()), palette.dim()),
    ];
    let mut right = vec![Span::styled(
        format!(
            "{} · temp {:.1} ",
            app.state.ai_mode.as_str().to_uppercase(),
            app.state.temperature
        ),
        palette.dim(),
    )];
    if app.waiting {
        right.insert(
            0,
            Span::styled(format!("{} ", app.spinner.frame()), palette.title()),
        );
    }
    let line = compose_lr_line(area.width as usize, &left, &right);
    f.render_widget(Paragraph::new(line), area);
}

fn render_footer(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let hints = match app.view {
        View::Chat => "Enter send · Ctrl+D directive · Ctrl+T tool · Ctrl+A attach · Alt+↑↓ select · Ctrl+G/B feedback",
        View::Tools if app.meta_focus => "Enter trigger learning · Esc leave log",
        View::Tools => "↑↓ toolbox · Enter use · l architect log",
        View::Dashboard => "Tab views",
    };
    let left = vec![Span::styled(format!(" {hints}"), palette.dim())];
    let right = vec![
        Span::styled(app.status.clone(), Style::default().fg(palette.fg)),
        Span::styled(" · F1 help · F5 settings ", palette.dim()),
    ];
    f.render_widget(
        Paragraph::new(compose_lr_line(area.width as usize, &left, &right)),
        area,
    );
}

/// One bar per trait. The dominant trait's label is bold in its own color.
fn trait_lines(traits: &Traits, width: usize, palette: &Palette) -> Vec<Line<'static>> {
    let dominant = traits.dominant();
    traits
        .iter()
        .map(|(name, value)| {
            let color = Style::default().fg(trait_color(name));
            let mut line = bar_line(name.as_str(), value * 10.0, width, color, palette);
            if name == dominant {
                if let Some(label) = line.spans.first_mut() {
                    label.style = color.add_modifier(Modifier::BOLD);
                }
            }
            line
        })
        .collect()
}

fn render_dashboard(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Min(3),
        ])
        .split(area);
    let focused = app.view == View::Dashboard;

    let inner_w = sections[0].width.saturating_sub(2) as usize;
    let traits = trait_lines(&app.state.traits, inner_w, palette);
    f.render_widget(
        Paragraph::new(traits).block(panel("Core Logic Matrix", palette, focused)),
        sections[0],
    );

    let fin = app.state.financials;
    let treasury = vec![
        stat_line("Total Revenue", &money(fin.total_revenue), palette),
        stat_line("Operational Costs", &money(fin.operational_costs), palette),
        stat_line("Net Profit", &money(fin.net_profit), palette),
    ];
    f.render_widget(
        Paragraph::new(treasury).block(panel("Corporate Treasury", palette, focused)),
        sections[1],
    );

    let cloud = app.state.cloud_infra;
    let infra = [
        ("CPU Utilization", cloud.cpu),
        ("GPU Compute", cloud.gpu),
        ("Storage", cloud.storage),
    ]
    .into_iter()
    .map(|(label, pct)| bar_line(label, pct, inner_w, Style::default().fg(load_color(pct)), palette))
    .collect::<Vec<_>>();
    f.render_widget(
        Paragraph::new(infra).block(panel("Cloud Infrastructure", palette, focused)),
        sections[2],
    );

    let llm = &app.state.llm_status;
    let foundry = vec![
        stat_line("Current Model", &llm.model_name, palette),
        Line::from(Span::styled(
            format!("Next-Gen Model Training {:.2}%", llm.training_progress),
            palette.dim(),
        )),
        bar_line(
            "",
            llm.training_progress,
            inner_w,
            Style::default().fg(palette.meta),
            palette,
        ),
    ];
    f.render_widget(
        Paragraph::new(foundry).block(panel("LLM Foundry", palette, focused)),
        sections[3],
    );

    let projects: Vec<ListItem> = if app.state.active_projects.is_empty() {
        vec![ListItem::new(Span::styled("No active ventures.", palette.dim()))]
    } else {
        app.state
            .active_projects
            .iter()
            .map(|p| {
                let (icon, color) = project_status_icon(p.status);
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{icon} "), Style::default().fg(color)),
                    Span::styled(
                        truncate_to_width(&p.name, inner_w.saturating_sub(4)),
                        Style::default().fg(palette.fg),
                    ),
                    Span::styled(format!("  {}", p.status.as_str()), palette.dim()),
                ]))
            })
            .collect()
    };
    f.render_widget(
        List::new(projects).block(panel("Project Nexus", palette, focused)),
        sections[4],
    );
}

fn stat_line(label: &str, value: &str, palette: &Palette) -> Line<'static> {
    let value_style = if value.starts_with('$') {
        Style::default().fg(c_money()).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.fg).add_modifier(Modifier::BOLD)
    };
    Line::from(vec![
        Span::styled(format!("{label:<18}"), palette.dim()),
        Span::styled(value.to_string(), value_style),
    ])
}

fn render_chat_view(f: &mut Frame, app: &mut App, palette: &Palette, area: Rect) {
    let input_rows = (app.chat_input.text().matches('\n').count() as u16 + 1).clamp(1, 6);
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(input_rows + 2),
        ])
        .split(area);
    let focused = app.view == View::Chat && app.mode == Mode::Normal;

    let width = parts[0].width.saturating_sub(2).max(1) as usize;
    let height = parts[0].height.saturating_sub(2).max(1) as usize;
    let lines = build_chat_lines(app, palette, width);
    let visible = scroll_window(lines, height, &mut app.scroll_from_bottom);

    let mut block = panel("Chat", palette, focused);
    if app.scroll_from_bottom > 0 {
        block = block.title(
            Title::from(Line::from(Span::styled(
                format!(" ↑ {} ", app.scroll_from_bottom),
                palette.dim(),
            )))
            .alignment(Alignment::Right)
            .position(Position::Top),
        );
    }
    f.render_widget(Paragraph::new(visible).block(block), parts[0]);

    let directive = app
        .mode_override
        .map(|m| m.as_str())
        .unwrap_or("Default");
    let selectors = Line::from(vec![
        Span::styled(" Directive Override: ", palette.dim()),
        Span::styled(directive.to_string(), palette.title()),
        Span::styled("   Tool Override: ", palette.dim()),
        Span::styled(app.tool_choice.label().to_string(), palette.title()),
    ]);
    f.render_widget(Paragraph::new(selectors), parts[1]);

    render_input(
        f,
        parts[2],
        &app.chat_input,
        "Issue directive...",
        panel("Directive", palette, focused),
        palette,
        focused,
    );
}

fn build_chat_lines(app: &App, palette: &Palette, width: usize) -> Vec<Line<'static>> {
    let mut out: Vec<Line<'static>> = Vec::new();
    let history = &app.state.chat_history;
    let body_w = width.saturating_sub(2).max(1);

    for (i, msg) in history.iter().enumerate() {
        let is_last = i + 1 == history.len();
        let selected = app.selected == Some(i);
        match (msg.sender, msg.kind) {
            (Sender::User, _) => {
                out.push(Line::from(Span::styled(
                    "You",
                    Style::default().fg(palette.user).add_modifier(Modifier::BOLD),
                )));
                out.extend(plain_lines(
                    &msg.text,
                    width,
                    "  ",
                    Style::default().fg(palette.fg),
                ));
            }
            (Sender::System, _) => {
                let color = if msg.kind == Some(MessageKind::Error) {
                    c_err()
                } else {
                    palette.muted
                };
                out.extend(
                    plain_lines(&msg.text, width, "", Style::default().fg(color))
                        .into_iter()
                        .map(|l| l.alignment(Alignment::Center)),
                );
            }
            (Sender::Ai, Some(MessageKind::Correction)) => {
                let style = Style::default().fg(palette.correction);
                out.push(Line::from(Span::styled(
                    "⚠ Self-Correction Subroutine",
                    style.add_modifier(Modifier::BOLD),
                )));
                out.extend(indent(markup::render(&msg.text, body_w, style, palette.code())));
            }
            (Sender::Ai, Some(MessageKind::Meta)) => {
                let style = Style::default().fg(palette.meta);
                out.push(Line::from(Span::styled(
                    "✦ Self-Awareness Update",
                    style.add_modifier(Modifier::BOLD),
                )));
                out.extend(indent(markup::render(
                    &msg.text,
                    body_w,
                    style.add_modifier(Modifier::ITALIC),
                    palette.code(),
                )));
            }
            (Sender::Ai, _) => {
                let expanded = selected || (is_last && !app.waiting);
                out.extend(ai_message_lines(msg, palette, width, selected, expanded));
            }
        }
        out.push(Line::from(""));
    }

    let last_is_ai = history.last().is_some_and(|m| m.sender == Sender::Ai);
    if app.waiting && !last_is_ai {
        out.push(Line::from(vec![
            Span::styled(format!("{} ", app.spinner.frame()), palette.title()),
            Span::styled("Processing directive...", palette.dim()),
        ]));
    }
    out
}

fn ai_message_lines(
    msg: &ChatMessage,
    palette: &Palette,
    width: usize,
    selected: bool,
    expanded: bool,
) -> Vec<Line<'static>> {
    let mut out = Vec::new();
    let body_w = width.saturating_sub(2).max(1);

    let mut header = vec![
        Span::styled(
            if selected { "▶ " } else { "◆ " },
            palette.title(),
        ),
        Span::styled(
            "Corp",
            Style::default().fg(palette.ai).add_modifier(Modifier::BOLD),
        ),
    ];
    match msg.feedback {
        Some(Feedback::Good) => header.push(Span::styled("  ✓ helpful", Style::default().fg(c_ok()))),
        Some(Feedback::Bad) => header.push(Span::styled("  ✗ not helpful", Style::default().fg(c_err()))),
        None => {}
    }
    out.push(Line::from(header));

    if msg.has_thought_process() {
        if expanded {
            out.push(Line::from(Span::styled("  ▾ AI Cognitive Process", palette.dim())));
            if let Some(tool) = msg.tool() {
                out.push(Line::from(Span::styled(
                    format!("    {} OPERATION: {}", tool_icon(tool), tool.as_str().to_uppercase()),
                    palette.dim().add_modifier(Modifier::BOLD),
                )));
            }
            if let Some(reasoning) = &msg.reasoning {
                out.push(Line::from(Span::styled(
                    "    Reasoning",
                    Style::default().fg(palette.fg).add_modifier(Modifier::BOLD),
                )));
                out.extend(plain_lines(reasoning, width, "    ", palette.dim()));
            }
            if !msg.plan.is_empty() {
                out.push(Line::from(Span::styled(
                    "    Action Plan:",
                    Style::default().fg(palette.fg).add_modifier(Modifier::BOLD),
                )));
                for (n, step) in msg.plan.iter().enumerate() {
                    let lines = plain_lines(step, width, "       ", palette.dim());
                    for (j, line) in lines.into_iter().enumerate() {
                        if j == 0 {
                            let mut spans = vec![Span::styled(format!("    {:>2}.", n + 1), palette.dim())];
                            spans.extend(line.spans.into_iter().skip(1));
                            spans.insert(1, Span::raw(" "));
                            out.push(Line::from(spans));
                        } else {
                            out.push(line);
                        }
                    }
                }
            }
        } else {
            out.push(Line::from(Span::styled("  ▸ AI Cognitive Process", palette.dim())));
        }
    }

    if !msg.text.is_empty() {
        out.extend(indent(markup::render(
            &msg.text,
            body_w,
            Style::default().fg(palette.ai),
            palette.code(),
        )));
    }

    if let Some(code) = &msg.code {
        let (language, body) = markup::clean_code(code);
        out.extend(indent(markup::code_lines(&language, &body, body_w, palette.code())));
    }

    let revenue = msg.revenue();
    if revenue > 0.0 {
        out.push(Line::from(Span::styled(
            format!("  $ Revenue Generated: {}", money(revenue)),
            Style::default().fg(c_money()).add_modifier(Modifier::BOLD),
        )));
    }

    if !msg.grounding_chunks.is_empty() {
        out.push(Line::from(Span::styled("  Sources:", palette.dim().add_modifier(Modifier::BOLD))));
        for chunk in &msg.grounding_chunks {
            out.push(Line::from(Span::styled(
                format!("    ↗ {}", truncate_to_width(&chunk.label(), body_w.saturating_sub(4))),
                Style::default().fg(palette.accent),
            )));
        }
    }
    out
}

fn tool_icon(tool: AiTool) -> &'static str {
    match tool {
        AiTool::StrategicPlanner => "▣",
        AiTool::GoogleSearch => "⌕",
        AiTool::CodeInterpreter => "⌨",
        AiTool::Debugger => "⚒",
        AiTool::MarketingAnalyst => "↗",
        AiTool::SalesStrategist => "$",
        AiTool::TradingBot => "≋",
    }
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

fn render_tools(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),
            Constraint::Length(TOOLBOX.len() as u16 + 2),
            Constraint::Length(AiTool::ALL.len() as u16 + 3),
            Constraint::Min(4),
            Constraint::Length(6),
        ])
        .split(area);
    let focused = app.view == View::Tools && app.mode == Mode::Normal;

    let mut text = app.directive.visible();
    if !app.directive.done() || app.spinner.step % 2 == 0 {
        text.push('▌');
    }
    f.render_widget(
        Paragraph::new(text)
            .style(palette.dim())
            .wrap(Wrap { trim: false })
            .block(panel("Active Directive", palette, false)),
        sections[0],
    );

    let selected = app.toolbox_state.selected().unwrap_or(0);
    let toolbox: Vec<ListItem> = TOOLBOX
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let active = focused && !app.meta_focus && i == selected;
            let style = if active {
                palette.title().add_modifier(Modifier::REVERSED)
            } else {
                Style::default().fg(palette.fg)
            };
            ListItem::new(Span::styled(format!(" {} ", entry.label), style))
        })
        .collect();
    f.render_widget(
        List::new(toolbox).block(panel("Toolbox", palette, focused && !app.meta_focus)),
        sections[1],
    );

    let mut tools: Vec<Line> = AiTool::ALL
        .iter()
        .map(|t| {
            Line::from(vec![
                Span::styled(format!("{}: ", t.as_str()), Style::default().fg(palette.fg).add_modifier(Modifier::BOLD)),
                Span::styled(t.description().to_string(), palette.dim()),
            ])
        })
        .collect();
    tools.push(Line::from(Span::styled(SELF_CORRECTOR, palette.dim())));
    f.render_widget(
        Paragraph::new(tools)
            .wrap(Wrap { trim: true })
            .block(panel("Available Tools", palette, false)),
        sections[2],
    );

    let width = sections[3].width.saturating_sub(2).max(1) as usize;
    let log_lines = metacognition_lines(&app.state.metacognition_log, palette, width);
    let height = sections[3].height.saturating_sub(2) as usize;
    let mut pinned = 0;
    let shown = scroll_window(log_lines, height, &mut pinned);
    f.render_widget(
        Paragraph::new(shown).block(panel("Metacognition Log", palette, false)),
        sections[3],
    );

    let count = app.meta_input.text().trim().chars().count();
    let over = count > MAX_META_LOG_CHARS;
    let counter_style = if over { Style::default().fg(c_err()) } else { palette.dim() };
    let block = panel("Trigger AI Learning", palette, focused && app.meta_focus).title(
        Title::from(Line::from(Span::styled(
            format!(" {count}/{MAX_META_LOG_CHARS} "),
            counter_style,
        )))
        .alignment(Alignment::Right)
        .position(Position::Bottom),
    );
    render_input(
        f,
        sections[4],
        &app.meta_input,
        ARCHITECT_PLACEHOLDER,
        block,
        palette,
        focused && app.meta_focus,
    );
}

fn metacognition_lines(
    events: &[MetaCognitionEvent],
    palette: &Palette,
    width: usize,
) -> Vec<Line<'static>> {
    if events.is_empty() {
        return vec![Line::from(Span::styled(
            "No meta-cognitive events recorded.",
            palette.dim(),
        ))];
    }
    let mut out = Vec::new();
    for event in events {
        let mut first = plain_lines(
            &format!("ARCHITECT LOG: \"{}\"", event.developer_input),
            width,
            "",
            palette.dim(),
        );
        out.append(&mut first);
        out.extend(plain_lines(
            &format!("\"{}\"", event.learning_summary),
            width,
            "  ",
            Style::default().fg(palette.meta).add_modifier(Modifier::ITALIC),
        ));
        let adjustments: Vec<Span> = event
            .adjustments
            .visible()
            .into_iter()
            .map(|(name, delta)| {
                let (arrow, color) = if delta > 0.0 { ("↑", c_ok()) } else { ("↓", c_err()) };
                let sign = if delta > 0.0 { "+" } else { "" };
                Span::styled(format!("  {arrow} {name} {sign}{delta:.1}"), Style::default().fg(color))
            })
            .collect();
        if !adjustments.is_empty() {
            out.push(Line::from(adjustments));
        }
        out.push(Line::from(""));
    }
    out
}

fn render_settings(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let inner = popup(f, area, "Settings", palette);
    let selected = app.settings_state.selected().unwrap_or(0);
    let mut lines = Vec::new();
    for (i, item) in SettingsItem::ALL.iter().enumerate() {
        let (label, value) = match item {
            SettingsItem::Theme => ("Appearance", app.state.theme.as_str().to_string()),
            SettingsItem::Temperature => ("Temperature", format!("{:.1}", app.state.temperature)),
            SettingsItem::Directive => ("Core Directive", app.state.ai_mode.as_str().to_string()),
            SettingsItem::Reset => ("Danger Zone", "Reset Corporation".to_string()),
        };
        let marker = if i == selected { "▶ " } else { "  " };
        let value_style = if *item == SettingsItem::Reset {
            Style::default().fg(c_err()).add_modifier(Modifier::BOLD)
        } else {
            palette.title()
        };
        lines.push(Line::from(vec![
            Span::styled(marker, palette.title()),
            Span::styled(format!("{label:<16}"), Style::default().fg(palette.fg)),
            Span::styled(format!("◀ {value} ▶"), value_style),
        ]));
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(
        "↑↓ select · ←→ change · Enter toggle · Esc close",
        palette.dim(),
    )));
    f.render_widget(Paragraph::new(lines), inner);
}

fn render_feedback(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let inner = popup(f, area, "Provide Feedback", palette);
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(inner);
    f.render_widget(
        Paragraph::new(
            "Please explain why this response was not helpful. This feedback will be used to improve the AI.",
        )
        .style(palette.dim())
        .wrap(Wrap { trim: true }),
        parts[0],
    );
    render_input(
        f,
        parts[1],
        &app.feedback_input,
        "Enter submit · Esc cancel",
        panel("Reason", palette, true),
        palette,
        true,
    );
}

fn render_help(f: &mut Frame, palette: &Palette, area: Rect) {
    let inner = popup(f, area, "Help", palette);
    let rows = [
        ("Tab / F2 F3 F4", "Switch between Dashboard, Chat and Tools"),
        ("Enter", "Send the directive"),
        ("Alt+Enter", "New line"),
        ("Ctrl+D", "Cycle directive override"),
        ("Ctrl+T", "Cycle tool override"),
        ("Ctrl+A", "Attach a .txt, .js or .py file"),
        ("Alt+↑ / Alt+↓", "Select a response"),
        ("Ctrl+G / Ctrl+B", "Mark the selected response good or bad"),
        ("Ctrl+O", "Open the first source of the selected response"),
        ("PgUp / PgDn", "Scroll the transcript"),
        ("l (Tools)", "Write an architect log entry"),
        ("F5 / Ctrl+S", "Settings"),
        ("Esc / Ctrl+C", "Quit"),
    ];
    let lines: Vec<Line> = rows
        .iter()
        .map(|(key, what)| {
            Line::from(vec![
                Span::styled(format!("{key:<18}"), palette.title()),
                Span::styled(what.to_string(), Style::default().fg(palette.fg)),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

/// Text the directive typewriter should be revealing.
pub fn active_directive(app: &App) -> &'static str {
    directive(app.state.ai_mode)
}
