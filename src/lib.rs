//! Conversation and agent session orchestration for an assistant console.
//!
//! The crate holds everything with state or contracts: chat sessions with a
//! stable conversation id, the agent lifecycle manager, the playground
//! transcript builder, and the dispatcher all of them share to reach the
//! backend. Presentation is left to the caller (see the bundled CLI).

pub mod agent;
pub mod chat;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod playground;

pub use agent::{AgentDefinition, AgentManager, AgentStatus};
pub use chat::{ChatSession, ConversationDirectory, Message, Role, SessionEvent};
pub use config::ConsoleSettings;
pub use context::{SessionContext, User};
pub use dispatch::{Dispatch, DispatchResult, Endpoint, HttpDispatcher};
pub use error::{ConsoleError, ConsoleResult, DispatchError};
pub use playground::{Playground, PromptBlock, SamplingInput, SamplingParameters, Transcript};
