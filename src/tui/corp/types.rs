use ratatui::widgets::ListState;
use tracing::warn;

use crate::engine::{CorpEngine, TurnEvent};
use crate::errors::CliError;
use crate::state::StateStore;
use crate::state::corp::{CorpState, FeedbackRequest};
use crate::state::message::{AiMode, ChatMessage, Sender, ToolChoice};
use crate::theme::Palette;
use crate::tui::types::{InputLine, Spinner, Typewriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Chat,
    Tools,
}

impl View {
    pub fn next(self) -> Self {
        match self {
            View::Dashboard => View::Chat,
            View::Chat => View::Tools,
            View::Tools => View::Dashboard,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            View::Dashboard => "Dashboard",
            View::Chat => "Chat",
            View::Tools => "Tools",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Settings,
    ConfirmReset,
    Feedback,
    Attach,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsItem {
    Theme,
    Temperature,
    Directive,
    Reset,
}

impl SettingsItem {
    pub const ALL: [SettingsItem; 4] = [
        SettingsItem::Theme,
        SettingsItem::Temperature,
        SettingsItem::Directive,
        SettingsItem::Reset,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Directive,
    ArchitectLog,
    Feedback,
}

#[derive(Debug)]
pub enum TuiMsg {
    Turn(TurnEvent),
    Done(Task, Result<(), CliError>),
}

pub struct ToolboxEntry {
    pub label: &'static str,
    pub prompt: &'static str,
}

pub const TOOLBOX: [ToolboxEntry; 7] = [
    ToolboxEntry {
        label: "New Venture",
        prompt: "Use the Strategic Planner to propose a new project to...",
    },
    ToolboxEntry {
        label: "Market Research",
        prompt: "Use Google Search to perform market research on...",
    },
    ToolboxEntry {
        label: "Develop Product",
        prompt: "// Use Code Interpreter to develop a new product that...\n",
    },
    ToolboxEntry {
        label: "Debug Product",
        prompt: "// Use Debugger to fix a critical bug in our product:\n\n[PASTE CODE HERE]",
    },
    ToolboxEntry {
        label: "Marketing Plan",
        prompt: "As a Marketing Analyst, create a go-to-market strategy for...",
    },
    ToolboxEntry {
        label: "Sales Plan",
        prompt: "As a Sales Strategist, write a sales playbook for...",
    },
    ToolboxEntry {
        label: "Trading Strategy",
        prompt: "As a Trading Bot, propose a strategy to capitalize on the following hypothetical market trend...",
    },
];

pub struct App {
    pub state: CorpState,
    pub store: StateStore<CorpState>,
    pub engine: CorpEngine,
    pub should_quit: bool,

    pub view: View,
    pub mode: Mode,
    pub chat_input: InputLine,
    pub meta_input: InputLine,
    pub feedback_input: InputLine,
    pub attach_input: InputLine,
    /// Tools view: typing goes to the architect log instead of the toolbox.
    pub meta_focus: bool,

    pub mode_override: Option<AiMode>,
    pub tool_choice: ToolChoice,
    pub feedback_request: Option<FeedbackRequest>,
    /// Index into the chat history of the AI message under the cursor.
    pub selected: Option<usize>,

    pub waiting: bool,
    pub spinner: Spinner,
    pub status: String,
    pub scroll_from_bottom: usize,
    pub settings_state: ListState,
    pub toolbox_state: ListState,
    pub directive: Typewriter,
}

impl App {
    pub fn new(state: CorpState, store: StateStore<CorpState>, engine: CorpEngine) -> Self {
        let mut settings_state = ListState::default();
        settings_state.select(Some(0));
        let mut toolbox_state = ListState::default();
        toolbox_state.select(Some(0));
        Self {
            state,
            store,
            engine,
            should_quit: false,
            view: View::Chat,
            mode: Mode::Normal,
            chat_input: InputLine::default(),
            meta_input: InputLine::default(),
            feedback_input: InputLine::default(),
            attach_input: InputLine::default(),
            meta_focus: false,
            mode_override: None,
            tool_choice: ToolChoice::AutoSelect,
            feedback_request: None,
            selected: None,
            waiting: false,
            spinner: Spinner::default(),
            status: "Ready".to_string(),
            scroll_from_bottom: 0,
            settings_state,
            toolbox_state,
            directive: Typewriter::default(),
        }
    }

    pub fn palette(&self) -> Palette {
        Palette::for_theme(self.state.theme)
    }

    /// Persist after every change. Failures only show in the status line.
    pub fn save(&mut self) {
        if let Err(err) = self.store.save(&self.state) {
            warn!(error = %err, "saving corp state failed");
            self.status = format!("Save failed: {err}");
        }
    }

    pub fn apply(&mut self, event: TurnEvent) {
        event.apply(&mut self.state);
        self.scroll_from_bottom = 0;
        self.save();
    }

    pub fn push_system(&mut self, text: impl Into<String>) {
        self.state.push_message(ChatMessage::error(text));
        self.scroll_from_bottom = 0;
        self.save();
    }

    /// AI messages that can take feedback, oldest first.
    pub fn ai_indices(&self) -> Vec<usize> {
        self.state
            .chat_history
            .iter()
            .enumerate()
            .filter(|(_, m)| m.sender == Sender::Ai && m.kind.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    /// Move the message selection. Starts from the newest AI message.
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
