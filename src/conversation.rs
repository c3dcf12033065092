use crate::models::{ChatTurn, QueryRequest};
use crate::normalize::NormalizedText;

/// History of completed question/answer exchanges.
///
/// A question is only kept once its answer has arrived; a failed query
/// leaves the log exactly as it was.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    turns: Vec<ChatTurn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Request for `question` carrying a snapshot of the current history
    pub fn request(&self, question: &str) -> QueryRequest {
        QueryRequest::new(question.trim(), self.turns.clone())
    }

    /// Commit a successful exchange
    pub fn record_exchange(&mut self, question: &str, answer: &NormalizedText) {
        self.turns.push(ChatTurn::user(question.trim()));
        self.turns.push(ChatTurn::assistant(answer.as_str()));
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
