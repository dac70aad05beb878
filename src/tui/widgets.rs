// Drawing helpers shared by both apps.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::types::InputLine;
use crate::theme::Palette;

const ELLIPSIS: &str = "…";

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    let vertical = popup_layout[1];
    let popup_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical);

    popup_layout[1]
}

pub fn panel<'a>(title: &'a str, palette: &Palette, focused: bool) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(palette.border(focused))
        .title(Span::styled(format!(" {title} "), palette.title()))
        .style(palette.panel())
}

/// Clear `area` and draw a titled popup frame. Returns the inner area.
pub fn popup(f: &mut Frame, area: Rect, title: &str, palette: &Palette) -> Rect {
    f.render_widget(Clear, area);
    let block = panel(title, palette, true);
    let inner = block.inner(area);
    f.render_widget(block, area);
    inner
}

/// Greedy word wrap of plain text. Empty input gives one empty row.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    if width <= 1 {
        return vec![line.to_string()];
    }
    let mut out = Vec::new();
    let mut cur = String::new();

    for word in line.split_whitespace() {
        if cur.is_empty() {
            cur.push_str(word);
            continue;
        }
        if cur.as_str().width() + 1 + word.width() <= width {
            cur.push(' ');
            cur.push_str(word);
        } else {
            out.push(cur);
            cur = word.to_string();
        }
    }

    if !cur.is_empty() {
        out.push(cur);
    }

    if out.is_empty() {
        out.push(String::new());
    }

    out
}

/// Wrap multi-line plain text into styled rows, each starting with `indent`.
pub fn plain_lines(text: &str, width: usize, indent: &str, style: Style) -> Vec<Line<'static>> {
    let avail = width.saturating_sub(indent.width()).max(1);
    text.split('\n')
        .flat_map(|l| wrap_line(l, avail))
        .map(|row| Line::from(vec![Span::raw(indent.to_string()), Span::styled(row, style)]))
        .collect()
}

pub fn truncate_to_width(input: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if input.width() <= max_width {
        return input.to_string();
    }

    let ell_w = ELLIPSIS.width();
    if max_width <= ell_w {
        return ELLIPSIS.to_string();
    }

    let mut out = String::new();
    let mut w = 0usize;
    for ch in input.chars() {
        let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
        if w + cw + ell_w > max_width {
            break;
        }
        out.push(ch);
        w += cw;
    }
    out.push_str(ELLIPSIS);
    out
}

/// Keep the end of `input`, e.g. the tail of a long path being typed.
pub fn tail_to_width(input: &str, max_width: usize) -> String {
    if input.width() <= max_width {
        return input.to_string();
    }
    let mut tail_rev = String::new();
    let mut w = 0usize;
    for ch in input.chars().rev() {
        let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
        if w + cw > max_width {
            break;
        }
        tail_rev.push(ch);
        w += cw;
    }
    tail_rev.chars().rev().collect()
}

pub fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|s| s.content.as_ref().width()).sum()
}

fn truncate_spans_to_width(spans: &[Span<'static>], max_width: usize) -> Vec<Span<'static>> {
    if max_width == 0 {
        return Vec::new();
    }
    if spans_width(spans) <= max_width {
        return spans.to_vec();
    }

    let ell_w = ELLIPSIS.width();
    if max_width <= ell_w {
        return vec![Span::raw(ELLIPSIS)];
    }

    let mut out: Vec<Span<'static>> = Vec::new();
    let mut used = 0usize;
    let limit = max_width.saturating_sub(ell_w);

    'outer: for sp in spans {
        let mut chunk = String::new();
        for ch in sp.content.chars() {
            let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
            if used + cw > limit {
                if !chunk.is_empty() {
                    out.push(Span::styled(chunk, sp.style));
                }
                break 'outer;
            }
            chunk.push(ch);
            used += cw;
        }
        if !chunk.is_empty() {
            out.push(Span::styled(chunk, sp.style));
        }
    }
    out.push(Span::raw(ELLIPSIS));
    out
}

/// Left spans, padding, right spans. The left side gives way first.
pub fn compose_lr_line(
    total_width: usize,
    left: &[Span<'static>],
    right: &[Span<'static>],
) -> Line<'static> {
    if total_width == 0 {
        return Line::from("");
    }

    let right_w = spans_width(right);
    if right_w == 0 {
        return Line::from(truncate_spans_to_width(left, total_width));
    }
    if right_w >= total_width {
        return Line::from(truncate_spans_to_width(right, total_width));
    }

    let max_left = total_width.saturating_sub(right_w).saturating_sub(1);
    let left_trunc = truncate_spans_to_width(left, max_left);
    let left_w = spans_width(&left_trunc);
    let spaces = total_width.saturating_sub(left_w + right_w);

    let mut spans: Vec<Span<'static>> = Vec::new();
    spans.extend(left_trunc);
    if spaces > 0 {
        spans.push(Span::raw(" ".repeat(spaces)));
    }
    spans.extend(right.iter().cloned());
    Line::from(spans)
}

/// `label ▕████░░░░▏ 42%` sized to `width`.
pub fn bar_line(
    label: &str,
    percent: f64,
    width: usize,
    fill: Style,
    palette: &Palette,
) -> Line<'static> {
    let pct = if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let label = format!("{label:<13}");
    let value = format!(" {pct:>3.0}%");
    let track = width
        .saturating_sub(label.width() + value.width())
        .max(4);
    let filled = ((pct / 100.0) * track as f64).round() as usize;
    Line::from(vec![
        Span::styled(label, palette.dim()),
        Span::styled("█".repeat(filled), fill),
        Span::styled("░".repeat(track - filled.min(track)), palette.dim()),
        Span::styled(value, Style::default().fg(palette.fg)),
    ])
}

/// The slice of `lines` visible in `height` rows, `scroll_from_bottom` rows
/// above the end. The offset is clamped and written back.
pub fn scroll_window(
    lines: Vec<Line<'static>>,
    height: usize,
    scroll_from_bottom: &mut usize,
) -> Vec<Line<'static>> {
    let max_scroll = lines.len().saturating_sub(height);
    *scroll_from_bottom = (*scroll_from_bottom).min(max_scroll);
    let end = lines.len() - *scroll_from_bottom;
    let start = end.saturating_sub(height);
    lines[start..end].to_vec()
}

/// Rows of an input field plus the cursor position inside `width` columns.
/// Each row shows its tail when it is wider than the field.
pub fn input_view(input: &InputLine, width: usize) -> (Vec<String>, (u16, u16)) {
    let text = input.text();
    let before: String = text.chars().take(input.cursor()).collect();
    let cursor_row = before.matches('\n').count();
    let cursor_col = before.rsplit('\n').next().unwrap_or("").width();
    let avail = width.saturating_sub(1).max(1);

    let rows: Vec<String> = text.split('\n').map(|r| tail_to_width(r, avail)).collect();
    let col = cursor_col.min(avail);
    (rows, (col as u16, cursor_row as u16))
}

/// Draw an input box and place the terminal cursor when focused.
pub fn render_input(
    f: &mut Frame,
    area: Rect,
    input: &InputLine,
    placeholder: &str,
    block: Block<'_>,
    palette: &Palette,
    focused: bool,
) {
    let inner = block.inner(area);
    let (rows, (cx, cy)) = input_view(input, inner.width as usize);
    let lines: Vec<Line> = if input.len() == 0 {
        vec![Line::from(Span::styled(placeholder.to_string(), palette.dim()))]
    } else {
        rows.into_iter()
            .map(|r| Line::from(Span::styled(r, Style::default().fg(palette.fg))))
            .collect()
    };
    let height = inner.height as usize;
    let skip = (cy as usize + 1).saturating_sub(height);
    let shown: Vec<Line> = lines.into_iter().skip(skip).collect();
    f.render_widget(Paragraph::new(shown).block(block), area);

    if focused {
        let x = inner.x.saturating_add(cx);
        let y = inner.y.saturating_add(cy.saturating_sub(skip as u16));
        f.set_cursor_position((x, y));
    }
}

/// Sign-in screen shown before the first session.
pub fn render_login(f: &mut Frame, palette: &Palette, title: &str, tagline: &str) {
    let size = f.area();
    f.render_widget(Block::default().style(palette.base()), size);
    let area = centered_rect(50, 40, size);
    let inner = popup(f, area, title, palette);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            title.to_string(),
            palette.title().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(tagline.to_string(), palette.dim())),
        Line::from(""),
        Line::from(vec![
            Span::styled("[ Enter ] ", palette.title()),
            Span::styled("Sign in with GitHub", Style::default().fg(palette.fg)),
        ]),
        Line::from(""),
        Line::from(Span::styled("Esc to quit", palette.dim())),
    ];
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false }),
        inner,
    );
}

/// Yes/no confirmation body.
pub fn render_confirm(f: &mut Frame, area: Rect, title: &str, question: &str, palette: &Palette) {
    let inner = popup(f, area, title, palette);
    let lines = vec![
        Line::from(Span::styled(question.to_string(), Style::default().fg(palette.fg))),
        Line::from(""),
        Line::from(vec![
            Span::styled("[y] ", palette.title()),
            Span::raw("confirm   "),
            Span::styled("[n/Esc] ", palette.title()),
            Span::raw("cancel"),
        ]),
    ];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::line_text;
    use pretty_assertions::assert_eq;

    #[test]
    fn wrap_line_breaks_on_words() {
        assert_eq!(wrap_line("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_line("", 7), vec![String::new()]);
    }

    #[test]
    fn plain_lines_indent_every_row() {
        let lines = plain_lines("alpha beta\ngamma", 8, "  ", Style::default());
        let text: Vec<String> = lines.iter().map(line_text).collect();
        assert_eq!(text, vec!["  alpha", "  beta", "  gamma"]);
    }

    #[test]
    fn truncation_adds_ellipsis() {
        assert_eq!(truncate_to_width("abcdef", 4), "abc…");
        assert_eq!(truncate_to_width("abc", 4), "abc");
        assert_eq!(tail_to_width("/long/path/file.txt", 8), "file.txt");
    }

    #[test]
    fn lr_line_pads_between_sides() {
        let line = compose_lr_line(12, &[Span::raw("left")], &[Span::raw("right")]);
        assert_eq!(line_text(&line), "left   right");
        let squeezed = compose_lr_line(8, &[Span::raw("leftside")], &[Span::raw("right")]);
        assert_eq!(line_text(&squeezed), "l… right");
    }

    #[test]
    fn scroll_window_clamps_offset() {
        let lines: Vec<Line<'static>> = (0..10).map(|i| Line::from(i.to_string())).collect();
        let mut offset = 50;
        let shown = scroll_window(lines, 4, &mut offset);
        assert_eq!(offset, 6);
        assert_eq!(line_text(&shown[0]), "0");
        assert_eq!(shown.len(), 4);
    }

    #[test]
    fn input_view_tracks_cursor_over_lines() {
        let mut input = InputLine::default();
        input.insert_str("ab\ncde");
        let (rows, cursor) = input_view(&input, 20);
        assert_eq!(rows, vec!["ab".to_string(), "cde".to_string()]);
        assert_eq!(cursor, (3, 1));
    }

    #[test]
    fn bar_line_fills_proportionally() {
        let palette = Palette::for_theme(crate::state::message::Theme::Dark);
        let line = bar_line("CPU", 50.0, 30, palette.dim(), &palette);
        let text = line_text(&line);
        assert!(text.starts_with("CPU"));
        assert!(text.ends_with(" 50%"));
        assert_eq!(text.matches('█').count(), text.matches('░').count());
    }
}
