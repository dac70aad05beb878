use ratatui::widgets::ListState;
use tracing::warn;

use crate::engine::KaiEngine;
use crate::errors::CliError;
use crate::state::StateStore;
use crate::state::kai::{KaiState, Memory};
use crate::state::message::{ChatMessage, Sender};
use crate::theme::Palette;
use crate::tui::types::{InputLine, Spinner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Converse,
    Create,
    Analyze,
    Memory,
}

impl Module {
    pub const ALL: [Module; 4] = [Module::Converse, Module::Create, Module::Analyze, Module::Memory];

    pub fn title(self) -> &'static str {
        match self {
            Module::Converse => "Converse",
            Module::Create => "Create",
            Module::Analyze => "Analyze",
            Module::Memory => "Memory",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Module::Converse => Module::Create,
            Module::Create => Module::Analyze,
            Module::Analyze => Module::Memory,
            Module::Memory => Module::Converse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Settings,
    ConfirmReset,
    ConfirmDelete(i64),
    Attach,
    Help,
}

/// Which Analyze input has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzeField {
    Text,
    Question,
}

#[derive(Debug)]
pub enum TuiMsg {
    Delta(String),
    Reply(ChatMessage),
    Created(Result<String, CliError>),
    Analyzed(Result<String, CliError>),
    Summarized {
        content: String,
        result: Result<String, CliError>,
    },
}

pub struct App {
    pub state: KaiState,
    pub store: StateStore<KaiState>,
    pub engine: KaiEngine,
    pub should_quit: bool,

    pub module: Module,
    pub mode: Mode,

    pub converse_input: InputLine,
    /// Reply text received so far while a converse call streams.
    pub streaming: Option<String>,
    /// Chat history index of the AI message picked for committing.
    pub selected: Option<usize>,

    pub create_input: InputLine,
    pub creation: String,

    pub analyze_text: InputLine,
    pub analyze_question: InputLine,
    pub analyze_field: AnalyzeField,
    pub analysis: String,

    pub search_input: InputLine,
    pub memory_state: ListState,
    pub attach_input: InputLine,

    pub waiting: bool,
    pub spinner: Spinner,
    pub status: String,
    pub scroll_from_bottom: usize,
    pub settings_state: ListState,
}

impl App {
    pub fn new(state: KaiState, store: StateStore<KaiState>, engine: KaiEngine) -> Self {
        let mut settings_state = ListState::default();
        settings_state.select(Some(0));
        Self {
            state,
            store,
            engine,
            should_quit: false,
            module: Module::Converse,
            mode: Mode::Normal,
            converse_input: InputLine::default(),
            streaming: None,
            selected: None,
            create_input: InputLine::default(),
            creation: String::new(),
            analyze_text: InputLine::default(),
            analyze_question: InputLine::default(),
            analyze_field: AnalyzeField::Text,
            analysis: String::new(),
            search_input: InputLine::default(),
            memory_state: ListState::default(),
            attach_input: InputLine::default(),
            waiting: false,
            spinner: Spinner::default(),
            status: "Ready".to_string(),
            scroll_from_bottom: 0,
            settings_state,
        }
    }

    pub fn palette(&self) -> Palette {
        Palette::for_theme(self.state.theme)
    }

    pub fn save(&mut self) {
        if let Err(err) = self.store.save(&self.state) {
            warn!(error = %err, "saving kai state failed");
            self.status = format!("Save failed: {err}");
        }
    }

    /// Memories matching the current search, newest first.
    pub fn visible_memories(&self) -> Vec<&Memory> {
        self.state.search(&self.search_input.text())
    }

    pub fn ai_indices(&self) -> Vec<usize> {
        self.state
            .chat_history
            .iter()
            .enumerate()
            .filter(|(_, m)| m.sender == Sender::Ai)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn move_selected(&mut self, delta: isize) {
        let indices = self.ai_indices();
        if indices.is_empty() {
            self.selected = None;
            return;
        }
        let pos = match self.selected.and_then(|s| indices.iter().position(|i| *i == s)) {
            Some(pos) => (pos as isize + delta).clamp(0, indices.len() as isize - 1) as usize,
            None => indices.len() - 1,
        };
        self.selected = Some(indices[pos]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::scripted::ScriptedBackend;
    use std::sync::Arc;

    #[test]
    fn modules_cycle_in_sidebar_order() {
        let mut module = Module::Converse;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(module);
            module = module.next();
        }
        assert_eq!(seen, Module::ALL.to_vec());
        assert_eq!(module, Module::Converse);
    }

    #[test]
    fn search_filters_visible_memories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = App::new(
            KaiState::default(),
            StateStore::new(dir.path()),
            KaiEngine::new(Arc::new(ScriptedBackend::new())),
        );
        app.state.commit_memory("Borrow checker rules", "Rust borrowing");
        app.state.commit_memory("Brew at 80C", "Tea");
        assert_eq!(app.visible_memories().len(), 2);
        app.search_input.set("tea");
        assert_eq!(app.visible_memories().len(), 1);
    }
}
