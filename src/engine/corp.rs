use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::errors::CliError;
use crate::model::ModelBackend;
use crate::model::corp::{
    LearningReply, process_meta_cognition, process_search_query, process_user_feedback,
    process_user_input, run_self_correction,
};
use crate::state::corp::{CorpState, FeedbackRequest, MetaCognitionEvent};
use crate::state::message::{AiMode, AiTool, ChatMessage, ToolChoice, ToolUsed};
use crate::state::traits::TraitAdjustments;

pub const MAX_META_LOG_CHARS: usize = 500;

const SEARCH_THINKING: &str = "Accessing public web data...";
const SEARCH_FAILED: &str = "Error: Web data access failed.";
const ANOMALY: &str = "System anomaly detected. Engaging self-correction subroutine...";
const SYNC_FAILURE: &str = "Error: AI Core synchronization failure. Self-correction protocol failed.";
const META_THINKING: &str =
    "Integrating architect feedback... Core logic matrix is being re-calibrated...";
const META_FAILED: &str = "Error: Failed to process architect feedback.";
const META_TOO_LONG: &str = "Error: Input exceeds 500 characters.";
const META_DEFAULT_SUMMARY: &str = "Undefined learning outcome.";
const FEEDBACK_THINKING: &str = "Processing feedback and recalibrating core logic...";
const FEEDBACK_FAILED: &str = "Error: Failed to process user feedback.";
const FEEDBACK_DEFAULT_SUMMARY: &str = "Undefined learning outcome from feedback.";

/// A change to `CorpState` produced by a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    Append(ChatMessage),
    ReplaceLast(ChatMessage),
    Revenue { amount: f64, trains_llm: bool },
    ProjectStarted(String),
    TraitsAdjusted(TraitAdjustments),
    Learned(MetaCognitionEvent),
    MarkedBad(usize),
}

impl TurnEvent {
    pub fn apply(self, state: &mut CorpState) {
        match self {
            TurnEvent::Append(message) => state.push_message(message),
            TurnEvent::ReplaceLast(message) => state.replace_last_message(message),
            TurnEvent::Revenue { amount, trains_llm } => state.add_revenue(amount, trains_llm),
            TurnEvent::ProjectStarted(name) => state.start_project(&name),
            TurnEvent::TraitsAdjusted(adjustments) => state.adjust_traits(&adjustments),
            TurnEvent::Learned(event) => state.record_learning(event),
            TurnEvent::MarkedBad(index) => state.mark_bad(index),
        }
    }

    /// The message this event adds to the transcript, if any.
    pub fn message(&self) -> Option<&ChatMessage> {
        match self {
            TurnEvent::Append(m) | TurnEvent::ReplaceLast(m) => Some(m),
            _ => None,
        }
    }
}

/// Per-message selections from the chat input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TurnOverrides {
    pub mode: Option<AiMode>,
    pub tool: ToolChoice,
}

enum Step {
    Done,
    SearchFailed(CliError),
}

#[derive(Clone)]
pub struct CorpEngine {
    backend: Arc<dyn ModelBackend>,
    retry_delay: Duration,
    rng: Arc<Mutex<StdRng>>,
}

impl CorpEngine {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            backend,
            retry_delay: Duration::from_secs(1),
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Fix the search revenue sequence. Draws still advance between searches.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    fn search_revenue(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f64::from(rng.gen_range(10u32..60))
    }

    /// Run one directive. `state` is the snapshot the prompt is built from;
    /// every change comes back through `tx`.
    pub async fn send_message(
        &self,
        state: &CorpState,
        message: &str,
        overrides: TurnOverrides,
        tx: &UnboundedSender<TurnEvent>,
    ) -> Result<(), CliError> {
        let emit = |event: TurnEvent| {
            let _ = tx.send(event);
        };
        emit(TurnEvent::Append(ChatMessage::user(message)));

        let first_error = match self.attempt(state, message, overrides, tx).await {
            Ok(Step::Done) => return Ok(()),
            Ok(Step::SearchFailed(err)) => return Err(err),
            Err(err) => err,
        };

        warn!(error = %first_error, "directive failed, starting self-correction");
        emit(TurnEvent::Append(ChatMessage::correction(ANOMALY)));

        let correction = match run_self_correction(
            self.backend.as_ref(),
            message,
            &first_error.to_string(),
        )
        .await
        {
            Ok(correction) => correction,
            Err(err) => return Err(self.sync_failure(tx, err)),
        };
        emit(TurnEvent::Append(ChatMessage::correction(format!(
            "**Correction Analysis:**\n**Root Cause:** {}\n**Corrected Plan:** {}",
            correction.root_cause, correction.corrected_plan
        ))));

        sleep(self.retry_delay).await;
        info!("retrying directive after self-correction");
        match self.attempt(state, message, overrides, tx).await {
            Ok(Step::Done) => Ok(()),
            Ok(Step::SearchFailed(err)) => Err(err),
            Err(err) => Err(self.sync_failure(tx, err)),
        }
    }

    fn sync_failure(&self, tx: &UnboundedSender<TurnEvent>, cause: CliError) -> CliError {
        warn!(error = %cause, "self-correction failed");
        let _ = tx.send(TurnEvent::Append(ChatMessage::error(SYNC_FAILURE)));
        CliError::Model(format!("{SYNC_FAILURE} ({cause})"))
    }

    async fn attempt(
        &self,
        state: &CorpState,
        message: &str,
        overrides: TurnOverrides,
        tx: &UnboundedSender<TurnEvent>,
    ) -> Result<Step, CliError> {
        if overrides.tool == ToolChoice::Tool(AiTool::GoogleSearch) {
            return Ok(self.search(message, tx).await);
        }

        let mode = overrides.mode.unwrap_or(state.ai_mode);
        let reply =
            process_user_input(self.backend.as_ref(), message, state, mode, overrides.tool).await?;

        if reply.tool() == Some(AiTool::GoogleSearch) {
            info!("model asked for web data, switching to search");
            return Ok(self.search(message, tx).await);
        }

        let revenue = reply.revenue();
        let mut ai = ChatMessage::ai(reply.response);
        ai.tool_used = reply.tool_used.as_deref().and_then(AiTool::parse).map(ToolUsed::Tool);
        ai.reasoning = reply.reasoning;
        ai.plan = reply.plan;
        ai.code = reply.code;
        ai.revenue_generated = Some(revenue);
        let _ = tx.send(TurnEvent::Append(ai));

        if revenue > 0.0 {
            let _ = tx.send(TurnEvent::Revenue {
                amount: revenue,
                trains_llm: true,
            });
        }
        if let Some(name) = reply.new_project_name {
            let _ = tx.send(TurnEvent::ProjectStarted(name));
        }
        if !reply.trait_adjustments.is_empty() {
            let _ = tx.send(TurnEvent::TraitsAdjusted(reply.trait_adjustments));
        }
        Ok(Step::Done)
    }

    async fn search(&self, message: &str, tx: &UnboundedSender<TurnEvent>) -> Step {
        let _ = tx.send(TurnEvent::Append(ChatMessage::ai(SEARCH_THINKING)));
        match process_search_query(self.backend.as_ref(), message).await {
            Ok(result) => {
                let revenue = self.search_revenue();
                let mut ai = ChatMessage::ai(result.text);
                ai.tool_used = Some(ToolUsed::Tool(AiTool::GoogleSearch));
                ai.grounding_chunks = result.grounding_chunks;
                ai.revenue_generated = Some(revenue);
                let _ = tx.send(TurnEvent::ReplaceLast(ai));
                let _ = tx.send(TurnEvent::Revenue {
                    amount: revenue,
                    trains_llm: false,
                });
                Step::Done
            }
            Err(err) => {
                warn!(error = %err, "web search failed");
                let _ = tx.send(TurnEvent::ReplaceLast(ChatMessage::error(SEARCH_FAILED)));
                Step::SearchFailed(err)
            }
        }
    }

    /// Architect log entry. Blank input does nothing.
    pub async fn process_meta_log(
        &self,
        state: &CorpState,
        log: &str,
        tx: &UnboundedSender<TurnEvent>,
    ) -> Result<(), CliError> {
        let log = log.trim();
        if log.is_empty() {
            return Ok(());
        }
        if log.chars().count() > MAX_META_LOG_CHARS {
            return Err(CliError::Usage(META_TOO_LONG.to_string()));
        }

        let _ = tx.send(TurnEvent::Append(ChatMessage::ai(META_THINKING)));
        let result = process_meta_cognition(self.backend.as_ref(), log, &state.traits).await;
        self.finish_learning(result, log.to_string(), META_DEFAULT_SUMMARY, META_FAILED, tx)
    }

    /// Reason for a thumbs-down. Marks the message and lets the model learn
    /// from it.
    pub async fn submit_feedback(
        &self,
        state: &CorpState,
        request: &FeedbackRequest,
        reason: &str,
        tx: &UnboundedSender<TurnEvent>,
    ) -> Result<(), CliError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CliError::Usage("A feedback reason is required.".to_string()));
        }

        let _ = tx.send(TurnEvent::MarkedBad(request.message_index));
        let _ = tx.send(TurnEvent::Append(ChatMessage::ai(FEEDBACK_THINKING)));
        let result = process_user_feedback(
            self.backend.as_ref(),
            &request.user_prompt,
            &request.ai_response,
            reason,
            &state.traits,
        )
        .await;
        self.finish_learning(
            result,
            format!("User Feedback: \"{reason}\""),
            FEEDBACK_DEFAULT_SUMMARY,
            FEEDBACK_FAILED,
            tx,
        )
    }

    fn finish_learning(
        &self,
        result: Result<LearningReply, CliError>,
        developer_input: String,
        default_summary: &str,
        failure: &str,
        tx: &UnboundedSender<TurnEvent>,
    ) -> Result<(), CliError> {
        match result {
            Ok(reply) => {
                let event = MetaCognitionEvent {
                    developer_input,
                    learning_summary: reply
                        .learning_summary
                        .unwrap_or_else(|| default_summary.to_string()),
                    adjustments: reply.trait_adjustments.clone(),
                    timestamp: Utc::now(),
                };
                info!(summary = %event.learning_summary, "learning recorded");
                let _ = tx.send(TurnEvent::TraitsAdjusted(reply.trait_adjustments));
                let _ = tx.send(TurnEvent::Learned(event));
                let _ = tx.send(TurnEvent::ReplaceLast(ChatMessage::meta(reply.response)));
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "learning failed");
                let _ = tx.send(TurnEvent::ReplaceLast(ChatMessage::error(failure)));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::scripted::ScriptedBackend;
    use crate::state::corp::FeedbackOutcome;
    use crate::state::message::{Feedback, MessageKind, Sender};
    use crate::state::traits::TraitName;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    fn engine(backend: ScriptedBackend) -> (CorpEngine, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        let engine = CorpEngine::new(backend.clone())
            .with_retry_delay(Duration::ZERO)
            .with_seed(7);
        (engine, backend)
    }

    /// Run a directive and apply its events to a fresh state.
    async fn run(engine: &CorpEngine, message: &str, overrides: TurnOverrides) -> (CorpState, Result<(), CliError>) {
        let mut state = CorpState::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let result = engine.send_message(&state, message, overrides, &tx).await;
        drop(tx);
        while let Some(event) = rx.recv().await {
            event.apply(&mut state);
        }
        (state, result)
    }

    fn texts(state: &CorpState) -> Vec<&str> {
        state.chat_history.iter().skip(1).map(|m| m.text.as_str()).collect()
    }

    #[tokio::test]
    async fn successful_directive_updates_everything() {
        let (engine, _) = engine(ScriptedBackend::new().reply(
            r#"{"response": "Venture launched.", "reasoning": "Demand is high.",
                "plan": ["Build MVP", "Sell"], "tool_used": "Strategic Planner",
                "revenue_generated": 200, "new_project_name": "Solar Drones",
                "trait_adjustments": {"Creativity": 1, "Ethics": -6}}"#,
        ));
        let (state, result) = run(&engine, "start something", TurnOverrides::default()).await;
        result.expect("turn");

        assert_eq!(texts(&state), vec!["start something", "Venture launched."]);
        let ai = &state.chat_history[2];
        assert_eq!(ai.tool(), Some(AiTool::StrategicPlanner));
        assert_eq!(ai.plan, vec!["Build MVP", "Sell"]);
        assert_eq!(state.financials.total_revenue, 1200.0);
        assert_eq!(state.llm_status.training_progress, 14.0);
        assert_eq!(state.active_projects.last().map(|p| p.name.as_str()), Some("Solar Drones"));
        assert_eq!(state.traits.creativity, 6.0);
        assert_eq!(state.traits.ethics, 0.0);
    }

    #[tokio::test]
    async fn explicit_search_replaces_thinking_message() {
        let (engine, backend) = engine(
            ScriptedBackend::new().grounded("Lithium prices fell.", &[("https://a.example", "A")]),
        );
        let overrides = TurnOverrides {
            mode: None,
            tool: ToolChoice::Tool(AiTool::GoogleSearch),
        };
        let (state, result) = run(&engine, "lithium outlook", overrides).await;
        result.expect("turn");

        assert_eq!(texts(&state), vec!["lithium outlook", "Lithium prices fell."]);
        let ai = &state.chat_history[2];
        let revenue = ai.revenue();
        assert!((10.0..60.0).contains(&revenue));
        assert_eq!(ai.grounding_chunks.len(), 1);
        assert_eq!(state.financials.total_revenue, 1000.0 + revenue);
        assert_eq!(state.llm_status.training_progress, 12.0);
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn search_revenue_is_reproducible_with_a_seed() {
        let (seeded, _) = engine(ScriptedBackend::new());
        let mut expected = StdRng::seed_from_u64(7);
        let draws: Vec<f64> = (0..4).map(|_| seeded.search_revenue()).collect();
        let wanted: Vec<f64> = (0..4).map(|_| f64::from(expected.gen_range(10u32..60))).collect();
        assert_eq!(draws, wanted);

        let (replay, _) = engine(ScriptedBackend::new());
        let again: Vec<f64> = (0..4).map(|_| replay.search_revenue()).collect();
        assert_eq!(again, draws);
    }

    #[tokio::test]
    async fn model_choosing_search_redirects_without_duplicate_user_message() {
        let (engine, backend) = engine(
            ScriptedBackend::new()
                .reply(r#"{"response": "Let me look.", "tool_used": "Google Search"}"#)
                .grounded("Found it.", &[]),
        );
        let (state, result) = run(&engine, "who leads the market?", TurnOverrides::default()).await;
        result.expect("turn");
        assert_eq!(texts(&state), vec!["who leads the market?", "Found it."]);
        assert!(backend.requests()[1].google_search);
    }

    #[tokio::test]
    async fn failed_search_leaves_error_in_place_of_thinking() {
        let (engine, _) = engine(ScriptedBackend::new().fail("dns"));
        let overrides = TurnOverrides {
            mode: None,
            tool: ToolChoice::Tool(AiTool::GoogleSearch),
        };
        let (state, result) = run(&engine, "q", overrides).await;
        assert!(result.is_err());
        assert_eq!(texts(&state), vec!["q", SEARCH_FAILED]);
        assert_eq!(state.chat_history[2].kind, Some(MessageKind::Error));
    }

    #[tokio::test]
    async fn malformed_reply_triggers_one_correction_and_retry() {
        let (engine, backend) = engine(
            ScriptedBackend::new()
                .reply("not json at all")
                .reply(r#"{"root_cause": "Format drift", "corrected_plan": "Emit JSON"}"#)
                .reply(r#"{"response": "Recovered."}"#),
        );
        let (state, result) = run(&engine, "expand", TurnOverrides::default()).await;
        result.expect("retry succeeds");

        assert_eq!(
            texts(&state),
            vec![
                "expand",
                ANOMALY,
                "**Correction Analysis:**\n**Root Cause:** Format drift\n**Corrected Plan:** Emit JSON",
                "Recovered.",
            ]
        );
        assert_eq!(state.chat_history[2].kind, Some(MessageKind::Correction));
        // The user message is not repeated on retry.
        let users = state.chat_history.iter().filter(|m| m.sender == Sender::User).count();
        assert_eq!(users, 1);
        assert_eq!(backend.requests().len(), 3);
    }

    #[tokio::test]
    async fn failed_correction_reports_sync_failure() {
        let (engine, backend) = engine(ScriptedBackend::new().fail("down").fail("still down"));
        let (state, result) = run(&engine, "expand", TurnOverrides::default()).await;
        assert!(matches!(result, Err(CliError::Model(_))));
        assert_eq!(texts(&state), vec!["expand", ANOMALY, SYNC_FAILURE]);
        assert_eq!(backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn failed_retry_does_not_start_a_second_cycle() {
        let (engine, backend) = engine(
            ScriptedBackend::new()
                .fail("down")
                .reply(r#"{"root_cause": "x", "corrected_plan": "y"}"#)
                .fail("down again"),
        );
        let (state, result) = run(&engine, "expand", TurnOverrides::default()).await;
        assert!(result.is_err());
        assert_eq!(state.chat_history.last().map(|m| m.text.as_str()), Some(SYNC_FAILURE));
        assert_eq!(backend.requests().len(), 3);
    }

    #[tokio::test]
    async fn mode_override_reaches_the_prompt() {
        let (engine, backend) = engine(ScriptedBackend::new().reply(r#"{"response": "ok"}"#));
        let overrides = TurnOverrides {
            mode: Some(AiMode::Safe),
            tool: ToolChoice::None,
        };
        run(&engine, "hi", overrides).await.1.expect("turn");
        let prompt = &backend.requests()[0].contents[0].text;
        assert!(prompt.contains("CORE DIRECTIVE (Safe)"));
    }

    async fn apply_all(state: &mut CorpState, mut rx: mpsc::UnboundedReceiver<TurnEvent>) {
        while let Some(event) = rx.recv().await {
            event.apply(state);
        }
    }

    #[tokio::test]
    async fn meta_log_records_learning() {
        let (engine, _) = engine(ScriptedBackend::new().reply(
            r#"{"response": "Recalibrated.", "trait_adjustments": {"Memory": 2}}"#,
        ));
        let mut state = CorpState::default();
        let (tx, rx) = mpsc::unbounded_channel();
        engine
            .process_meta_log(&state, "  Added a vector store.  ", &tx)
            .await
            .expect("learn");
        drop(tx);
        apply_all(&mut state, rx).await;

        let event = &state.metacognition_log[0];
        assert_eq!(event.developer_input, "Added a vector store.");
        assert_eq!(event.learning_summary, META_DEFAULT_SUMMARY);
        assert_eq!(state.traits.get(TraitName::Memory), 7.0);
        let last = state.chat_history.last().expect("message");
        assert_eq!(last.text, "Recalibrated.");
        assert_eq!(last.kind, Some(MessageKind::Meta));
        assert_eq!(state.chat_history.len(), 2);
    }

    #[tokio::test]
    async fn meta_log_rejects_long_and_ignores_blank_input() {
        let (engine, backend) = engine(ScriptedBackend::new());
        let state = CorpState::default();
        let (tx, mut rx) = mpsc::unbounded_channel();

        engine.process_meta_log(&state, "   ", &tx).await.expect("blank is a no-op");
        let long = "x".repeat(501);
        let err = engine.process_meta_log(&state, &long, &tx).await.expect_err("too long");
        assert_eq!(err.to_string(), META_TOO_LONG);
        assert!(rx.try_recv().is_err());
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn meta_log_failure_replaces_thinking() {
        let (engine, _) = engine(ScriptedBackend::new().fail("offline"));
        let mut state = CorpState::default();
        let (tx, rx) = mpsc::unbounded_channel();
        assert!(engine.process_meta_log(&state, "change", &tx).await.is_err());
        drop(tx);
        apply_all(&mut state, rx).await;
        assert_eq!(state.chat_history.last().map(|m| m.text.as_str()), Some(META_FAILED));
        assert!(state.metacognition_log.is_empty());
    }

    #[tokio::test]
    async fn feedback_marks_message_and_logs_reason() {
        let (engine, _) = engine(ScriptedBackend::new().reply(
            r#"{"response": "Understood.", "learning_summary": "Be specific.", "trait_adjustments": {"Logic": -1}}"#,
        ));
        let mut state = CorpState::default();
        state.push_message(ChatMessage::user("plan Q3"));
        state.push_message(ChatMessage::ai("Do things."));
        let FeedbackOutcome::NeedsReason(request) = state.feedback(2, Feedback::Bad) else {
            panic!("expected a feedback request");
        };

        let (tx, rx) = mpsc::unbounded_channel();
        engine
            .submit_feedback(&state, &request, " too vague ", &tx)
            .await
            .expect("feedback");
        drop(tx);
        apply_all(&mut state, rx).await;

        assert_eq!(state.chat_history[2].feedback, Some(Feedback::Bad));
        let event = &state.metacognition_log[0];
        assert_eq!(event.developer_input, "User Feedback: \"too vague\"");
        assert_eq!(event.learning_summary, "Be specific.");
        assert_eq!(state.traits.logic, 7.0);
        assert_eq!(state.chat_history.last().map(|m| m.text.as_str()), Some("Understood."));
    }

    #[tokio::test]
    async fn feedback_needs_a_reason() {
        let (engine, _) = engine(ScriptedBackend::new());
        let state = CorpState::default();
        let request = FeedbackRequest {
            message_index: 0,
            user_prompt: "x".into(),
            ai_response: "y".into(),
        };
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(engine.submit_feedback(&state, &request, "  ", &tx).await.is_err());
    }
}
