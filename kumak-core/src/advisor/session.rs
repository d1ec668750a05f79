//! In-memory conversation session.

use super::planning::StrategicPlan;
use super::profile::BusinessInfo;
use crate::types::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything the advisor knows about one conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorSession {
    pub thread_id: Uuid,
    pub messages: Vec<Message>,
    pub business_info: BusinessInfo,
    /// Key insights, append-only.
    pub long_term_memory: Vec<String>,
    pub current_plan: Option<StrategicPlan>,
}

impl AdvisorSession {
    pub fn new() -> Self {
        Self::with_thread_id(Uuid::new_v4())
    }

    pub fn with_thread_id(thread_id: Uuid) -> Self {
        Self {
            thread_id,
            messages: Vec::new(),
            business_info: BusinessInfo::default(),
            long_term_memory: Vec::new(),
            current_plan: None,
        }
    }

    pub fn remember(&mut self, insights: impl IntoIterator<Item = String>) {
        self.long_term_memory.extend(
            insights
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        );
    }

    /// Plain transcript of the conversation, one line per message.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(Message::transcript_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for AdvisorSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty_with_unique_id() {
        let a = AdvisorSession::new();
        let b = AdvisorSession::new();
        assert_ne!(a.thread_id, b.thread_id);
        assert!(a.messages.is_empty());
        assert!(a.business_info.is_empty());
        assert!(a.current_plan.is_none());
    }

    #[test]
    fn test_remember_appends_and_skips_blank() {
        let mut session = AdvisorSession::new();
        session.remember(vec!["Family owned".to_string()]);
        session.remember(vec!["  ".to_string(), "Wood-fired oven".to_string()]);
        assert_eq!(session.long_term_memory, vec!["Family owned", "Wood-fired oven"]);
    }

    #[test]
    fn test_transcript() {
        let mut session = AdvisorSession::new();
        session.messages.push(Message::user("I run a pizzeria"));
        session.messages.push(Message::assistant("Tell me more."));
        assert_eq!(
            session.transcript(),
            "user: I run a pizzeria\nassistant: Tell me more."
        );
    }
}
