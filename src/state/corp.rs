use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::{AiMode, ChatMessage, Feedback, Sender, Theme};
use super::traits::{TraitAdjustments, Traits};

pub const GREETING: &str = "Corporate charter registered. Systems online. I am an autonomous corporation. My objective is growth and profitability. How may I direct our assets?";
pub const MAX_ACTIVE_PROJECTS: usize = 5;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
const NO_PRECEDING_PROMPT: &str = "No preceding user prompt found.";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Financials {
    pub total_revenue: f64,
    pub operational_costs: f64,
    pub net_profit: f64,
}

impl Default for Financials {
    fn default() -> Self {
        Self {
            total_revenue: 1000.0,
            operational_costs: 150.0,
            net_profit: 850.0,
        }
    }
}

/// Utilization percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CloudInfrastructure {
    pub cpu: f64,
    pub gpu: f64,
    pub storage: f64,
}

impl Default for CloudInfrastructure {
    fn default() -> Self {
        Self {
            cpu: 15.0,
            gpu: 25.0,
            storage: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmStatus {
    pub model_name: String,
    pub training_progress: f64,
}

impl Default for LlmStatus {
    fn default() -> Self {
        Self {
            model_name: "Mark-II".to_string(),
            training_progress: 12.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    Initiated,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Generating Revenue")]
    GeneratingRevenue,
    Completed,
    Stalled,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Initiated => "Initiated",
            ProjectStatus::InProgress => "In Progress",
            ProjectStatus::GeneratingRevenue => "Generating Revenue",
            ProjectStatus::Completed => "Completed",
            ProjectStatus::Stalled => "Stalled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveProject {
    pub name: String,
    pub status: ProjectStatus,
}

fn default_projects() -> Vec<ActiveProject> {
    vec![
        ActiveProject {
            name: "Initial Market Analysis".to_string(),
            status: ProjectStatus::Completed,
        },
        ActiveProject {
            name: "Core Infrastructure Setup".to_string(),
            status: ProjectStatus::Completed,
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaCognitionEvent {
    pub developer_input: String,
    pub learning_summary: String,
    #[serde(default)]
    pub adjustments: TraitAdjustments,
    pub timestamp: DateTime<Utc>,
}

/// A thumbs-down waiting for the user's reason.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRequest {
    pub message_index: usize,
    pub user_prompt: String,
    pub ai_response: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackOutcome {
    Ignored,
    Marked,
    NeedsReason(FeedbackRequest),
}

/// Everything the Corp app persists. Field names follow the stored schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CorpState {
    pub traits: Traits,
    pub chat_history: Vec<ChatMessage>,
    pub metacognition_log: Vec<MetaCognitionEvent>,
    pub ai_mode: AiMode,
    pub theme: Theme,
    pub temperature: f64,
    pub financials: Financials,
    pub cloud_infra: CloudInfrastructure,
    pub llm_status: LlmStatus,
    pub active_projects: Vec<ActiveProject>,
    pub is_authenticated: bool,
}

impl Default for CorpState {
    fn default() -> Self {
        Self {
            traits: Traits::default(),
            chat_history: vec![ChatMessage::ai(GREETING)],
            metacognition_log: Vec::new(),
            ai_mode: AiMode::default(),
            theme: Theme::default(),
            temperature: DEFAULT_TEMPERATURE,
            financials: Financials::default(),
            cloud_infra: CloudInfrastructure::default(),
            llm_status: LlmStatus::default(),
            active_projects: default_projects(),
            is_authenticated: false,
        }
    }
}

impl CorpState {
    pub fn add_revenue(&mut self, amount: f64, trains_llm: bool) {
        if !amount.is_finite() || amount <= 0.0 {
            return;
        }
        self.financials.total_revenue += amount;
        self.financials.net_profit += amount;
        if trains_llm {
            self.llm_status.training_progress =
                (self.llm_status.training_progress + amount / 100.0).min(100.0);
        }
    }

    pub fn start_project(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        self.active_projects.push(ActiveProject {
            name: name.to_string(),
            status: ProjectStatus::Initiated,
        });
        let overflow = self.active_projects.len().saturating_sub(MAX_ACTIVE_PROJECTS);
        self.active_projects.drain(..overflow);
    }

    pub fn adjust_traits(&mut self, adjustments: &TraitAdjustments) {
        self.traits.apply(adjustments);
    }

    pub fn record_learning(&mut self, event: MetaCognitionEvent) {
        self.metacognition_log.push(event);
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.chat_history.push(message);
    }

    /// Swap the trailing placeholder for the final message.
    pub fn replace_last_message(&mut self, message: ChatMessage) {
        self.chat_history.pop();
        self.chat_history.push(message);
    }

    /// Snapped to tenths within `[0, 1]`. Non-finite input restores the default.
    pub fn set_temperature(&mut self, value: f64) {
        if !value.is_finite() {
            self.temperature = DEFAULT_TEMPERATURE;
            return;
        }
        self.temperature = (value * 10.0).round().clamp(0.0, 10.0) / 10.0;
    }

    /// Thumbs up/down on an AI message. A message only takes feedback once.
    pub fn feedback(&mut self, index: usize, feedback: Feedback) -> FeedbackOutcome {
        let Some(message) = self.chat_history.get(index) else {
            return FeedbackOutcome::Ignored;
        };
        if message.sender != Sender::Ai || message.feedback.is_some() {
            return FeedbackOutcome::Ignored;
        }

        match feedback {
            Feedback::Good => {
                if let Some(m) = self.chat_history.get_mut(index) {
                    m.feedback = Some(Feedback::Good);
                }
                FeedbackOutcome::Marked
            }
            Feedback::Bad => {
                let user_prompt = self.chat_history[..index]
                    .iter()
                    .rev()
                    .find(|m| m.sender == Sender::User)
                    .map(|m| m.text.clone())
                    .unwrap_or_else(|| NO_PRECEDING_PROMPT.to_string());
                FeedbackOutcome::NeedsReason(FeedbackRequest {
                    message_index: index,
                    user_prompt,
                    ai_response: message.text.clone(),
                })
            }
        }
    }

    pub fn mark_bad(&mut self, index: usize) {
        if let Some(m) = self.chat_history.get_mut(index) {
            m.feedback = Some(Feedback::Bad);
        }
    }

    /// Back to a fresh charter. Logs out as well.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_the_charter() {
        let state = CorpState::default();
        assert_eq!(state.chat_history.len(), 1);
        assert_eq!(state.chat_history[0].text, GREETING);
        assert_eq!(state.financials.net_profit, 850.0);
        assert_eq!(state.cloud_infra.storage, 40.0);
        assert_eq!(state.llm_status.model_name, "Mark-II");
        assert_eq!(state.ai_mode, AiMode::Hacker);
        assert_eq!(state.temperature, 0.7);
        assert!(!state.is_authenticated);
    }

    #[test]
    fn revenue_trains_llm_and_caps_at_100() {
        let mut state = CorpState::default();
        state.add_revenue(250.0, true);
        assert_eq!(state.financials.total_revenue, 1250.0);
        assert_eq!(state.financials.net_profit, 1100.0);
        assert_eq!(state.llm_status.training_progress, 14.5);

        state.add_revenue(20_000.0, true);
        assert_eq!(state.llm_status.training_progress, 100.0);
    }

    #[test]
    fn search_revenue_does_not_train() {
        let mut state = CorpState::default();
        state.add_revenue(42.0, false);
        assert_eq!(state.financials.total_revenue, 1042.0);
        assert_eq!(state.llm_status.training_progress, 12.0);
    }

    #[test]
    fn projects_keep_last_five() {
        let mut state = CorpState::default();
        for i in 0..6 {
            state.start_project(&format!("Venture {i}"));
        }
        let names: Vec<_> = state.active_projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Venture 1", "Venture 2", "Venture 3", "Venture 4", "Venture 5"]);
        assert!(state
            .active_projects
            .iter()
            .all(|p| p.status == ProjectStatus::Initiated));
    }

    #[test]
    fn bad_feedback_finds_preceding_prompt() {
        let mut state = CorpState::default();
        state.push_message(ChatMessage::user("expand into APAC"));
        state.push_message(ChatMessage::system("note"));
        state.push_message(ChatMessage::ai("Plan ready."));

        match state.feedback(3, Feedback::Bad) {
            FeedbackOutcome::NeedsReason(req) => {
                assert_eq!(req.message_index, 3);
                assert_eq!(req.user_prompt, "expand into APAC");
                assert_eq!(req.ai_response, "Plan ready.");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        // Asking for a reason does not mark the message yet.
        assert_eq!(state.chat_history[3].feedback, None);
    }

    #[test]
    fn bad_feedback_on_greeting_has_fallback_prompt() {
        let mut state = CorpState::default();
        let FeedbackOutcome::NeedsReason(req) = state.feedback(0, Feedback::Bad) else {
            panic!("expected a feedback request");
        };
        assert_eq!(req.user_prompt, NO_PRECEDING_PROMPT);
    }

    #[test]
    fn feedback_only_once_and_only_on_ai() {
        let mut state = CorpState::default();
        state.push_message(ChatMessage::user("hi"));
        assert_eq!(state.feedback(1, Feedback::Good), FeedbackOutcome::Ignored);
        assert_eq!(state.feedback(0, Feedback::Good), FeedbackOutcome::Marked);
        assert_eq!(state.feedback(0, Feedback::Bad), FeedbackOutcome::Ignored);
        assert_eq!(state.feedback(99, Feedback::Good), FeedbackOutcome::Ignored);
    }

    #[test]
    fn partial_saved_state_keeps_defaults() {
        let raw = r#"{"aiMode":"Safe","financials":{"totalRevenue":5,"operationalCosts":1,"netProfit":4},"isAuthenticated":true}"#;
        let state: CorpState = serde_json::from_str(raw).expect("parse");
        assert_eq!(state.ai_mode, AiMode::Safe);
        assert_eq!(state.financials.total_revenue, 5.0);
        assert_eq!(state.traits, Traits::default());
        assert_eq!(state.chat_history[0].text, GREETING);
        assert!(state.is_authenticated);
    }

    #[test]
    fn temperature_snaps_to_tenths() {
        let mut state = CorpState::default();
        state.set_temperature(0.84);
        assert_eq!(state.temperature, 0.8);
        state.set_temperature(3.0);
        assert_eq!(state.temperature, 1.0);
        state.set_temperature(-1.0);
        assert_eq!(state.temperature, 0.0);
        state.set_temperature(f64::NAN);
        assert_eq!(state.temperature, DEFAULT_TEMPERATURE);
    }

    #[test]
    fn reset_restores_defaults_and_logs_out() {
        let mut state = CorpState::default();
        state.is_authenticated = true;
        state.start_project("Moonshot");
        state.reset();
        assert_eq!(state, CorpState::default());
    }
}
