//! Agent persona and session driver
//!
//! The session driver sequences the cascading pipeline: room audio feeds
//! voice activity detection, confirmed utterances are transcribed, the turn
//! detector decides when the user is done, the language model produces a
//! reply, and synthesis publishes it back to the room. The agent supplies
//! the persona and the enter/exit lifecycle hooks.

pub mod agent;
pub mod conversation;
pub mod session;

pub use agent::{Agent, AutomotiveAssistant};
pub use conversation::ConversationFlow;
pub use session::{AgentSession, RoomIo, SessionEvent, SessionHandle, SessionState};

use thiserror::Error;

/// Agent and session errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("session error: {0}")]
    Session(String),

    #[error("session already started")]
    AlreadyStarted,

    #[error("session closed")]
    Closed,

    #[error(transparent)]
    Core(#[from] cascade_core::Error),
}
