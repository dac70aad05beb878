// Types shared by the Corp and KAI screens.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::ListState;

/// Base animation cadence for spinners and pulsing borders.
pub const SPINNER_INTERVAL_MS: u64 = 275;
/// Characters revealed per frame by the directive typewriter.
const TYPEWRITER_STEP: usize = 6;

/// Single text field with a cursor. Alt+Enter inserts a newline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputLine {
    chars: Vec<char>,
    cursor: usize,
}

impl InputLine {
    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_blank(&self) -> bool {
        self.chars.iter().all(|c| c.is_whitespace())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set(&mut self, text: &str) {
        self.chars = text.chars().collect();
        self.cursor = self.chars.len();
    }

    pub fn clear(&mut self) {
        self.chars.clear();
        self.cursor = 0;
    }

    /// Take the text out, leaving the field empty.
    pub fn take(&mut self) -> String {
        let text = self.text();
        self.clear();
        text
    }

    pub fn insert(&mut self, ch: char) {
        self.cursor = self.cursor.min(self.chars.len());
        self.chars.insert(self.cursor, ch);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.insert(ch);
        }
    }

    /// Apply an editing key. Returns false when the key is not an edit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        match key.code {
            KeyCode::Backspace => {
                if self.cursor > 0 && self.cursor <= self.chars.len() {
                    self.cursor -= 1;
                    self.chars.remove(self.cursor);
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.chars.len() {
                    self.chars.remove(self.cursor);
                }
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.chars.len()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.chars.len(),
            KeyCode::Enter if alt => self.insert('\n'),
            KeyCode::Char('u') if ctrl => self.clear(),
            KeyCode::Char(ch) if !ctrl && !alt => self.insert(ch),
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Spinner {
    pub step: u64,
    last: Instant,
}

impl Default for Spinner {
    fn default() -> Self {
        Self {
            step: 0,
            last: Instant::now(),
        }
    }
}

impl Spinner {
    pub fn tick(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last) >= Duration::from_millis(SPINNER_INTERVAL_MS) {
            self.last = now;
            self.step = self.step.wrapping_add(1);
        }
    }

    pub fn frame(&self) -> &'static str {
        const FRAMES: [&str; 4] = ["◐", "◓", "◑", "◒"];
        FRAMES[(self.step % FRAMES.len() as u64) as usize]
    }
}

/// Progressive reveal of a block of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Typewriter {
    text: String,
    shown: usize,
}

impl Typewriter {
    pub fn start(&mut self, text: &str) {
        if self.text != text {
            self.text = text.to_string();
            self.shown = 0;
        }
    }

    pub fn tick(&mut self) {
        let total = self.text.chars().count();
        self.shown = (self.shown + TYPEWRITER_STEP).min(total);
    }

    pub fn done(&self) -> bool {
        self.shown >= self.text.chars().count()
    }

    pub fn visible(&self) -> String {
        self.text.chars().take(self.shown).collect()
    }
}

pub fn move_selection(state: &mut ListState, delta: isize, len: usize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let cur = state.selected().unwrap_or(0) as isize;
    let next = (cur + delta).clamp(0, len as isize - 1);
    state.select(Some(next as usize));
}

pub fn move_selection_wrap(state: &mut ListState, delta: isize, len: usize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let cur = state.selected().unwrap_or(0) as isize;
    let next = (cur + delta).rem_euclid(len as isize);
    state.select(Some(next as usize));
}
