use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Correction,
    Meta,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Good,
    Bad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AiMode {
    Safe,
    Edge,
    #[default]
    Hacker,
}

impl AiMode {
    pub const ALL: [AiMode; 3] = [AiMode::Safe, AiMode::Edge, AiMode::Hacker];

    pub fn as_str(self) -> &'static str {
        match self {
            AiMode::Safe => "Safe",
            AiMode::Edge => "Edge",
            AiMode::Hacker => "Hacker",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(value.trim()))
    }

    pub fn next(self) -> Self {
        match self {
            AiMode::Safe => AiMode::Edge,
            AiMode::Edge => AiMode::Hacker,
            AiMode::Hacker => AiMode::Safe,
        }
    }
}

impl fmt::Display for AiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations the corporation can run. Wire names keep their spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiTool {
    #[serde(rename = "Strategic Planner")]
    StrategicPlanner,
    #[serde(rename = "Google Search")]
    GoogleSearch,
    #[serde(rename = "Code Interpreter")]
    CodeInterpreter,
    Debugger,
    #[serde(rename = "Marketing Analyst")]
    MarketingAnalyst,
    #[serde(rename = "Sales Strategist")]
    SalesStrategist,
    #[serde(rename = "Trading Bot")]
    TradingBot,
}

impl AiTool {
    pub const ALL: [AiTool; 7] = [
        AiTool::StrategicPlanner,
        AiTool::GoogleSearch,
        AiTool::CodeInterpreter,
        AiTool::Debugger,
        AiTool::MarketingAnalyst,
        AiTool::SalesStrategist,
        AiTool::TradingBot,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AiTool::StrategicPlanner => "Strategic Planner",
            AiTool::GoogleSearch => "Google Search",
            AiTool::CodeInterpreter => "Code Interpreter",
            AiTool::Debugger => "Debugger",
            AiTool::MarketingAnalyst => "Marketing Analyst",
            AiTool::SalesStrategist => "Sales Strategist",
            AiTool::TradingBot => "Trading Bot",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AiTool::StrategicPlanner => "Initiates new revenue-generating ventures.",
            AiTool::GoogleSearch => "Accesses the web for market research.",
            AiTool::CodeInterpreter => "Develops products and automation solutions.",
            AiTool::Debugger => "Resolves technical debt and product bugs.",
            AiTool::MarketingAnalyst => "Generates marketing strategies and ideas.",
            AiTool::SalesStrategist => "Develops sales tactics and scripts.",
            AiTool::TradingBot => "Analyzes market data for financial growth.",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let v = value.trim();
        Self::ALL.into_iter().find(|t| {
            t.as_str().eq_ignore_ascii_case(v)
                || t.as_str().replace(' ', "-").eq_ignore_ascii_case(v)
        })
    }
}

impl fmt::Display for AiTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user picked in the tool selector for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolChoice {
    #[default]
    AutoSelect,
    Tool(AiTool),
    None,
}

impl ToolChoice {
    pub fn all() -> Vec<ToolChoice> {
        let mut out = vec![ToolChoice::AutoSelect];
        out.extend(AiTool::ALL.into_iter().map(ToolChoice::Tool));
        out.push(ToolChoice::None);
        out
    }

    pub fn label(self) -> &'static str {
        match self {
            ToolChoice::AutoSelect => "Auto-Select",
            ToolChoice::Tool(tool) => tool.as_str(),
            ToolChoice::None => "None",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let v = value.trim();
        if v.eq_ignore_ascii_case("auto-select") || v.eq_ignore_ascii_case("auto") {
            return Some(ToolChoice::AutoSelect);
        }
        if v.eq_ignore_ascii_case("none") {
            return Some(ToolChoice::None);
        }
        AiTool::parse(v).map(ToolChoice::Tool)
    }

    pub fn next(self) -> Self {
        let all = Self::all();
        let idx = all.iter().position(|c| *c == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }
}

/// `tool_used` as reported by the model: a known tool, or `None` when it ran
/// without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolUsed {
    Tool(AiTool),
    Label(NoTool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoTool {
    None,
}

impl ToolUsed {
    pub fn tool(self) -> Option<AiTool> {
        match self {
            ToolUsed::Tool(t) => Some(t),
            ToolUsed::Label(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingChunk {
    pub uri: String,
    #[serde(default)]
    pub title: String,
}

impl GroundingChunk {
    /// Title, or the host part of the URI when the title is blank.
    pub fn label(&self) -> String {
        if !self.title.trim().is_empty() {
            return self.title.clone();
        }
        url::Url::parse(&self.uri)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| self.uri.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub sender: Sender,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_used: Option<ToolUsed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plan: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_generated: Option<f64>,
    #[serde(
        rename = "groundingChunks",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub grounding_chunks: Vec<GroundingChunk>,
}

impl ChatMessage {
    fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: None,
            sender,
            text: text.into(),
            kind: None,
            tool_used: None,
            reasoning: None,
            plan: Vec::new(),
            feedback: None,
            code: None,
            revenue_generated: None,
            grounding_chunks: Vec::new(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self::new(Sender::Ai, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Sender::System, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::system(text).with_kind(MessageKind::Error)
    }

    pub fn correction(text: impl Into<String>) -> Self {
        Self::ai(text).with_kind(MessageKind::Correction)
    }

    pub fn meta(text: impl Into<String>) -> Self {
        Self::ai(text).with_kind(MessageKind::Meta)
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn tool(&self) -> Option<AiTool> {
        self.tool_used.and_then(ToolUsed::tool)
    }

    /// Tool, reasoning or plan present: the "cognitive process" section.
    pub fn has_thought_process(&self) -> bool {
        self.tool().is_some()
            || self.reasoning.as_deref().is_some_and(|r| !r.trim().is_empty())
            || !self.plan.is_empty()
    }

    pub fn revenue(&self) -> f64 {
        self.revenue_generated.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stored_message_shape_is_preserved() {
        let raw = json!({
            "sender": "ai",
            "text": "done",
            "type": "correction",
            "tool_used": "Google Search",
            "groundingChunks": [{"uri": "https://example.com/a", "title": ""}]
        });
        let msg: ChatMessage = serde_json::from_value(raw).expect("parse");
        assert_eq!(msg.kind, Some(MessageKind::Correction));
        assert_eq!(msg.tool(), Some(AiTool::GoogleSearch));
        assert_eq!(msg.grounding_chunks[0].label(), "example.com");

        let back = serde_json::to_value(&msg).expect("json");
        assert_eq!(back["type"], "correction");
        assert_eq!(back["groundingChunks"][0]["uri"], "https://example.com/a");
        assert!(back.get("plan").is_none());
    }

    #[test]
    fn tool_used_none_means_no_tool() {
        let msg: ChatMessage =
            serde_json::from_value(json!({"sender": "ai", "text": "x", "tool_used": "None"}))
                .expect("parse");
        assert_eq!(msg.tool(), None);
        assert!(!msg.has_thought_process());
    }

    #[test]
    fn tool_choice_cycles_through_every_option() {
        let mut choice = ToolChoice::AutoSelect;
        let mut seen = vec![choice];
        for _ in 0..8 {
            choice = choice.next();
            seen.push(choice);
        }
        assert_eq!(seen.len(), 9);
        assert_eq!(choice, ToolChoice::None);
        assert_eq!(choice.next(), ToolChoice::AutoSelect);
    }

    #[test]
    fn parses_tool_names_loosely() {
        assert_eq!(ToolChoice::parse("google-search"), Some(ToolChoice::Tool(AiTool::GoogleSearch)));
        assert_eq!(ToolChoice::parse("Trading Bot"), Some(ToolChoice::Tool(AiTool::TradingBot)));
        assert_eq!(ToolChoice::parse("auto"), Some(ToolChoice::AutoSelect));
        assert_eq!(ToolChoice::parse("teleporter"), None);
    }
}
