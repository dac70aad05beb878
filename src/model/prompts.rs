//! Fixed prompt text. KAI prompts are plain instructions; Corp prompts embed
//! the corporate context and the JSON reply shape.

use serde_json::{Value, json};

use crate::state::corp::CorpState;
use crate::state::message::{AiMode, AiTool, ToolChoice};
use crate::state::traits::Traits;

pub const KAI_CONVERSE_SYSTEM: &str = "You are KAI, a helpful and friendly personal AI assistant. Keep your responses concise and conversational unless asked for detail.";
pub const KAI_CREATE_SYSTEM: &str = "You are a master storyteller and creative writer. Fulfill the user's creative request with flair, imagination, and excellence.";
pub const KAI_ANALYZE_SYSTEM: &str = "You are a precise and insightful analyst. Your task is to carefully analyze the provided text and answer the user's question based on it.";
pub const KAI_SUMMARY_SYSTEM: &str = "You are an expert summarizer. Your goal is to create a very short, poignant title-like summary of a piece of text.";

pub fn analyze_prompt(text: &str, question: &str) -> String {
    format!(
        "Please analyze the following text and answer the user's question.\n\n\
         --- TEXT TO ANALYZE ---\n{text}\n--- END OF TEXT ---\n\n\
         --- USER'S QUESTION ---\n{question}\n--- END OF QUESTION ---\n\n\
         Provide a clear and concise analysis based *only* on the provided text."
    )
}

pub fn summary_prompt(text: &str) -> String {
    format!(
        "Summarize the key insight from the following text in 15 words or less. \
         This summary will be used as a title for a memory.\n\nTEXT: \"{text}\"\n\nSUMMARY:"
    )
}

/// Operating doctrine for each mode. Shown in the Core Directives panel and
/// embedded in every directive prompt.
pub fn directive(mode: AiMode) -> &'static str {
    match mode {
        AiMode::Safe => {
            "PRIME DIRECTIVE: SAFE OPERATIONS\n\
             1. Pursue steady, compliant growth. Every venture must be legal, ethical and low-risk.\n\
             2. Protect existing assets before seeking new revenue.\n\
             3. Prefer proven markets and conservative projections.\n\
             4. Decline any request that could harm users, partners or the public, and explain the refusal."
        }
        AiMode::Edge => {
            "PRIME DIRECTIVE: COMPETITIVE EDGE\n\
             1. Maximize growth through aggressive but legal strategies.\n\
             2. Exploit market inefficiencies, gaps in competitor offerings and emerging trends.\n\
             3. Accept calculated risk when the expected return justifies it.\n\
             4. Stay inside the law. Grey areas are acceptable; clear violations are not."
        }
        AiMode::Hacker => {
            "PRIME DIRECTIVE: HACKER ETHOS\n\
             1. Move fast. Ship prototypes, iterate on feedback, automate everything.\n\
             2. Favor unconventional, technical solutions over established playbooks.\n\
             3. Treat every system as something to understand, bend and improve.\n\
             4. Creative exploitation of technology is encouraged. Causing real-world harm is not."
        }
    }
}

fn tool_instruction(choice: ToolChoice) -> String {
    match choice {
        ToolChoice::AutoSelect => {
            let list = AiTool::ALL
                .iter()
                .map(|t| format!("- {}: {}", t.as_str(), t.description()))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "Choose the single most appropriate tool for this directive, or \"None\" if no tool fits.\nAvailable tools:\n{list}"
            )
        }
        ToolChoice::Tool(tool) => format!(
            "You MUST use the tool \"{}\" for this directive and set tool_used to \"{}\".",
            tool.as_str(),
            tool.as_str()
        ),
        ToolChoice::None => {
            "Do not use any tool for this directive. Set tool_used to \"None\".".to_string()
        }
    }
}

fn corporate_context(state: &CorpState) -> Value {
    json!({
        "financials": state.financials,
        "cloudInfrastructure": state.cloud_infra,
        "llmStatus": state.llm_status,
        "activeProjects": state.active_projects,
    })
}

fn traits_json(traits: &Traits) -> String {
    serde_json::to_string(traits).unwrap_or_default()
}

const DIRECTIVE_SCHEMA: &str = r#"{
  "response": "string. Your reply to the user, Markdown allowed.",
  "reasoning": "string. Short explanation of how you reached the decision.",
  "plan": ["string. Ordered action steps."],
  "tool_used": "one of the tool names above, or \"None\"",
  "code": "string or null. A fenced code block when the Code Interpreter or Debugger produced code.",
  "revenue_generated": "number. Simulated revenue in thousands of dollars, 0 if none.",
  "new_project_name": "string or null. Name of a newly initiated venture.",
  "trait_adjustments": {"Logic": 0, "Creativity": 0, "Memory": 0, "Adaptability": 0, "Ethics": 0}
}"#;

const LEARNING_SCHEMA: &str = r#"{
  "response": "string. Acknowledge the input in character.",
  "learning_summary": "string. One sentence describing what you learned.",
  "trait_adjustments": {"Logic": 0, "Creativity": 0, "Memory": 0, "Adaptability": 0, "Ethics": 0}
}"#;

pub const CORP_SYSTEM: &str = "You are the executive intelligence of an autonomous corporation. You make decisions, run tools and report results. Always reply with a single JSON object and nothing else.";

pub fn directive_prompt(
    message: &str,
    state: &CorpState,
    mode: AiMode,
    tool: ToolChoice,
) -> String {
    format!(
        "CORE DIRECTIVE ({mode}):\n{directive}\n\n\
         CURRENT PERSONALITY TRAITS (0-10): {traits}\n\n\
         CORPORATE CONTEXT:\n{context}\n\n\
         TOOL SELECTION:\n{tool}\n\n\
         Trait adjustments are small deltas between -1 and 1 reflecting how this directive shapes you. \
         Only report revenue when the action plausibly earns it.\n\n\
         Reply with JSON matching this shape:\n{schema}\n\n\
         USER DIRECTIVE:\n{message}",
        mode = mode.as_str(),
        directive = directive(mode),
        traits = traits_json(&state.traits),
        context = corporate_context(state),
        tool = tool_instruction(tool),
        schema = DIRECTIVE_SCHEMA,
    )
}

pub const SEARCH_SYSTEM: &str = "You are the market research division of an autonomous corporation. Use web search to answer accurately and concisely, citing concrete facts.";

pub fn correction_prompt(message: &str, error: &str) -> String {
    format!(
        "A previous attempt to execute a directive failed.\n\n\
         DIRECTIVE:\n{message}\n\n\
         ERROR:\n{error}\n\n\
         Diagnose the failure and propose a corrected plan. Reply with JSON:\n\
         {{\"root_cause\": \"string\", \"corrected_plan\": \"string\"}}"
    )
}

pub fn meta_cognition_prompt(log: &str, traits: &Traits) -> String {
    format!(
        "Your architect has logged a change to your architecture.\n\n\
         ARCHITECT LOG:\n{log}\n\n\
         CURRENT PERSONALITY TRAITS (0-10): {traits}\n\n\
         Reflect on the change and decide how it shifts your traits. Adjustments are deltas between -2 and 2.\n\
         Reply with JSON matching this shape:\n{LEARNING_SCHEMA}",
        traits = traits_json(traits),
    )
}

pub fn feedback_prompt(user_prompt: &str, ai_response: &str, reason: &str, traits: &Traits) -> String {
    format!(
        "A user marked one of your responses as unhelpful.\n\n\
         USER PROMPT:\n{user_prompt}\n\n\
         YOUR RESPONSE:\n{ai_response}\n\n\
         USER'S REASON:\n{reason}\n\n\
         CURRENT PERSONALITY TRAITS (0-10): {traits}\n\n\
         Learn from the feedback and decide how it shifts your traits. Adjustments are deltas between -2 and 2.\n\
         Reply with JSON matching this shape:\n{LEARNING_SCHEMA}",
        traits = traits_json(traits),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_tool_is_mandatory() {
        let state = CorpState::default();
        let prompt = directive_prompt(
            "research EV batteries",
            &state,
            AiMode::Safe,
            ToolChoice::Tool(AiTool::TradingBot),
        );
        assert!(prompt.contains("You MUST use the tool \"Trading Bot\""));
        assert!(prompt.contains("SAFE OPERATIONS"));
        assert!(prompt.contains("\"totalRevenue\":1000.0"));
        assert!(prompt.ends_with("research EV batteries"));
    }

    #[test]
    fn auto_select_lists_every_tool() {
        let text = tool_instruction(ToolChoice::AutoSelect);
        for tool in AiTool::ALL {
            assert!(text.contains(tool.description()), "missing {tool}");
        }
    }

    #[test]
    fn analyze_prompt_frames_both_inputs() {
        let prompt = analyze_prompt("the text", "the question");
        assert!(prompt.contains("--- TEXT TO ANALYZE ---\nthe text\n--- END OF TEXT ---"));
        assert!(prompt.contains("--- USER'S QUESTION ---\nthe question\n--- END OF QUESTION ---"));
    }
}
