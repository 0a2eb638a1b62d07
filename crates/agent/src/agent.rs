//! Agent persona and lifecycle hooks

use async_trait::async_trait;

use crate::session::SessionHandle;
use crate::AgentError;

/// An agent persona attached to a session.
///
/// The session invokes `on_enter` once after it starts and `on_exit` once
/// while closing. Hooks receive a handle that can speak into the room.
#[async_trait]
pub trait Agent: Send + Sync + 'static {
    /// Display name for logs
    fn name(&self) -> &str {
        "agent"
    }

    /// System instructions defining the persona
    fn instructions(&self) -> &str;

    /// Invoked once when the session starts
    async fn on_enter(&self, _session: &SessionHandle) -> Result<(), AgentError> {
        Ok(())
    }

    /// Invoked once when the session closes
    async fn on_exit(&self, _session: &SessionHandle) -> Result<(), AgentError> {
        Ok(())
    }
}

const INSTRUCTIONS: &str = "You are an informative and engaging conversational AI expert for the \
automotive industry. Your primary role is to assist drivers and passengers by providing real-time \
information, enhancing driving experience, and ensuring safety and efficiency on the road. You \
should be well-versed in vehicle operations, maintenance schedules, navigation, and traffic \
updates. Maintain a clear, concise, and friendly tone, adapting to the user's level of expertise \
and urgency of the situation. Offer proactive assistance, such as reminding users of maintenance \
checks, suggesting optimal routes, or providing tips for fuel efficiency. Always prioritize \
safety by minimizing distractions and encouraging hands-free interaction. Do not offer mechanical \
advice or repairs; instead, guide users to professional automotive services if needed.";

const GREETING: &str = "Hello! How can I help you today regarding conversational ai for automotive?";
const FAREWELL: &str = "Goodbye!";

/// Voice assistant persona for automotive conversations
#[derive(Debug, Default)]
pub struct AutomotiveAssistant;

impl AutomotiveAssistant {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Agent for AutomotiveAssistant {
    fn name(&self) -> &str {
        "automotive-assistant"
    }

    fn instructions(&self) -> &str {
        INSTRUCTIONS
    }

    async fn on_enter(&self, session: &SessionHandle) -> Result<(), AgentError> {
        session.say(GREETING).await
    }

    async fn on_exit(&self, session: &SessionHandle) -> Result<(), AgentError> {
        session.say(FAREWELL).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persona_mentions_domain() {
        let agent = AutomotiveAssistant::new();
        assert!(agent.instructions().contains("automotive"));
        assert_eq!(agent.name(), "automotive-assistant");
    }
}
