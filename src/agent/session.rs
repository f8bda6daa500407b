//! Session state for one run of the iteration loop
//!
//! Holds the conversation log and loop position. Kept separate from the
//! controller so that partial progress stays inspectable after a fatal
//! model-call failure.

use crate::core::Message;

/// Lifecycle of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Environment created, context not yet loaded
    Setup,
    /// Turn loop in progress
    Iterating,
    /// Final answer produced
    Done,
}

/// Mutable state of one query run
#[derive(Debug, Clone)]
pub struct Session {
    /// The user's original query
    pub query: String,
    /// Conversation log sent to the root model, system message first
    pub messages: Vec<Message>,
    /// Zero-based index of the current turn
    pub turn: usize,
    pub state: SessionState,
    /// The answer, once one was produced
    pub final_answer: Option<String>,
}

impl Session {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            messages: Vec::new(),
            turn: 0,
            state: SessionState::Setup,
            final_answer: None,
        }
    }

    /// Record the answer and move to the terminal state
    pub fn finish(&mut self, answer: impl Into<String>) {
        self.final_answer = Some(answer.into());
        self.state = SessionState::Done;
    }

    pub fn is_done(&self) -> bool {
        self.state == SessionState::Done
    }
}
