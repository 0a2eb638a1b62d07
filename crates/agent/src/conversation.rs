//! Conversation flow
//!
//! Records completed turns and produces the message list handed to the
//! language model: the agent's instructions as the system message followed
//! by a bounded window of history.

use parking_lot::Mutex;

use cascade_core::{Message, Turn, TurnRole};

use crate::agent::Agent;

/// History window handed to the language model, in turns
const DEFAULT_MAX_TURNS: usize = 20;

/// Conversation flow for one session
pub struct ConversationFlow {
    instructions: String,
    turns: Mutex<Vec<Turn>>,
    max_turns: usize,
}

impl ConversationFlow {
    /// Create a flow carrying the agent's instructions
    pub fn new(agent: &dyn Agent) -> Self {
        Self {
            instructions: agent.instructions().to_string(),
            turns: Mutex::new(Vec::new()),
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    /// Override the history window
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    /// Record a user turn
    pub fn add_user_turn(&self, content: impl Into<String>) {
        self.turns.lock().push(Turn::new(TurnRole::User, content));
    }

    /// Record an assistant turn
    pub fn add_assistant_turn(&self, content: impl Into<String>) {
        self.turns
            .lock()
            .push(Turn::new(TurnRole::Assistant, content));
    }

    /// Number of recorded turns
    pub fn turn_count(&self) -> usize {
        self.turns.lock().len()
    }

    /// Snapshot of the recorded history
    pub fn history(&self) -> Vec<Turn> {
        self.turns.lock().clone()
    }

    /// Message list for the language model: system instructions plus the
    /// most recent turns within the window.
    pub fn messages(&self) -> Vec<Message> {
        let turns = self.turns.lock();
        let start = turns.len().saturating_sub(self.max_turns);

        let mut messages = Vec::with_capacity(turns.len() - start + 1);
        messages.push(Message::system(self.instructions.clone()));
        messages.extend(turns[start..].iter().map(Turn::to_message));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AutomotiveAssistant;
    use cascade_core::Role;

    #[test]
    fn system_message_comes_first() {
        let agent = AutomotiveAssistant::new();
        let flow = ConversationFlow::new(&agent);
        flow.add_user_turn("hi");

        let messages = flow.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("automotive"));
        assert_eq!(messages[1].role, Role::User);
    }

    #[test]
    fn history_window_bounds_messages() {
        let agent = AutomotiveAssistant::new();
        let flow = ConversationFlow::new(&agent).with_max_turns(4);

        for i in 0..10 {
            flow.add_user_turn(format!("question {}", i));
            flow.add_assistant_turn(format!("answer {}", i));
        }

        let messages = flow.messages();
        // system message plus the window
        assert_eq!(messages.len(), 5);
        assert_eq!(messages.last().unwrap().content, "answer 9");
        assert_eq!(flow.turn_count(), 20);
    }

    #[test]
    fn turns_alternate_roles() {
        let agent = AutomotiveAssistant::new();
        let flow = ConversationFlow::new(&agent);
        flow.add_user_turn("hello");
        flow.add_assistant_turn("hi there");

        let history = flow.history();
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[1].role, TurnRole::Assistant);
    }
}
