use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::message::{ChatMessage, Theme};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub id: i64,
    pub content: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KaiState {
    pub chat_history: Vec<ChatMessage>,
    pub memories: Vec<Memory>,
    pub theme: Theme,
    pub is_authenticated: bool,
}

impl KaiState {
    /// Millisecond timestamp, bumped past every id already handed out so two
    /// entries created within the same millisecond stay distinct. A stored id
    /// of `i64::MAX` leaves no room above it; ids then stick at the maximum.
    pub fn next_id(&self, now: DateTime<Utc>) -> i64 {
        let max = self
            .chat_history
            .iter()
            .filter_map(|m| m.id)
            .chain(self.memories.iter().map(|m| m.id))
            .max();
        let floor = match max {
            Some(max) => max.checked_add(1).unwrap_or_else(|| {
                warn!("id space exhausted, reusing the maximum id");
                i64::MAX
            }),
            None => i64::MIN,
        };
        now.timestamp_millis().max(floor)
    }

    pub fn push_message(&mut self, message: ChatMessage) -> i64 {
        let id = message.id.unwrap_or_else(|| self.next_id(Utc::now()));
        self.chat_history.push(message.with_id(id));
        id
    }

    pub fn commit_memory(&mut self, content: &str, summary: &str) -> &Memory {
        let now = Utc::now();
        let memory = Memory {
            id: self.next_id(now),
            content: content.to_string(),
            summary: summary.trim().to_string(),
            created_at: now,
        };
        // Newest first, the way the archive lists them.
        self.memories.insert(0, memory);
        &self.memories[0]
    }

    /// Case-insensitive match over summary and content. A blank term matches
    /// everything.
    pub fn search(&self, term: &str) -> Vec<&Memory> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.memories.iter().collect();
        }
        self.memories
            .iter()
            .filter(|m| {
                m.summary.to_lowercase().contains(&needle)
                    || m.content.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn delete_memory(&mut self, id: i64) -> bool {
        let before = self.memories.len();
        self.memories.retain(|m| m.id != id);
        self.memories.len() != before
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
