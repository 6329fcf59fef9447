//! Conversation transcript state
//!
//! The transcript is the only entity that outlives a single command. It is
//! mutated only by the currently-processing command: entries are appended
//! and transient placeholders removed as the command resolves.
//!
//! Placeholder invariant: at most one placeholder entry exists at a time,
//! and it is always removed before the corresponding final entry is
//! appended, whether the command succeeded or failed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::core::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    Assistant,
}

/// Structured payload attached to an assistant entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attachment {
    Visualization { spec: Value },
    Clarification { question: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub author: Author,
    pub content: String,
    pub placeholder: bool,
    #[serde(default)]
    pub attachment: Option<Attachment>,
}

/// Ordered list of conversation entries for the active session.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_placeholder(&self) -> bool {
        self.entries.iter().any(|e| e.placeholder)
    }

    pub fn push_user(&mut self, content: &str) -> Uuid {
        self.push(Author::User, content, false, None)
    }

    pub fn push_assistant(&mut self, content: &str) -> Uuid {
        self.push(Author::Assistant, content, false, None)
    }

    /// Append a transient "working" entry, replacing any placeholder still
    /// standing from an earlier point of this command.
    pub fn push_placeholder(&mut self, content: &str) -> Uuid {
        self.clear_placeholder();
        self.push(Author::Assistant, content, true, None)
    }

    pub fn clear_placeholder(&mut self) {
        self.entries.retain(|e| !e.placeholder);
    }

    /// Remove the placeholder and append the final assistant entry.
    pub fn resolve_placeholder(&mut self, content: &str, attachment: Option<Attachment>) -> Uuid {
        self.clear_placeholder();
        self.push(Author::Assistant, content, false, attachment)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn push(
        &mut self,
        author: Author,
        content: &str,
        placeholder: bool,
        attachment: Option<Attachment>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.entries.push(TranscriptEntry {
            id,
            author,
            content: content.to_string(),
            placeholder,
            attachment,
        });
        id
    }
}

/// Persistence collaborator. Saving is best-effort: the session logs
/// failures and never surfaces them to the user.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn persist(&self, chat_id: &str, entries: &[TranscriptEntry]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_at_most_one_placeholder() {
        let mut transcript = Transcript::new();
        transcript.push_placeholder("Analyzing…");
        transcript.push_placeholder("Formatting…");
        assert_eq!(
            transcript.entries().iter().filter(|e| e.placeholder).count(),
            1
        );
        assert_eq!(transcript.entries()[0].content, "Formatting…");
    }

    #[test]
    fn test_resolve_removes_placeholder_before_final_entry() {
        let mut transcript = Transcript::new();
        transcript.push_user("make A1 bold");
        transcript.push_placeholder("Analyzing…");
        transcript.resolve_placeholder("Bold applied successfully.", None);

        assert!(!transcript.has_placeholder());
        assert_eq!(transcript.len(), 2);
        let last = transcript.entries().last().unwrap();
        assert_eq!(last.author, Author::Assistant);
        assert_eq!(last.content, "Bold applied successfully.");
    }

    #[test]
    fn test_attachment_round_trip() {
        let mut transcript = Transcript::new();
        transcript.resolve_placeholder(
            "Here is the chart.",
            Some(Attachment::Visualization {
                spec: json!({"type": "bar"}),
            }),
        );
        let serialized = serde_json::to_string(transcript.entries()).unwrap();
        let parsed: Vec<TranscriptEntry> = serde_json::from_str(&serialized).unwrap();
        assert!(matches!(
            parsed[0].attachment,
            Some(Attachment::Visualization { .. })
        ));
    }

    #[test]
    fn test_clear_resets_session() {
        let mut transcript = Transcript::new();
        transcript.push_user("hello");
        transcript.push_assistant("hi");
        transcript.clear();
        assert!(transcript.is_empty());
    }
}
