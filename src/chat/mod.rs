//! Chat sessions against the chat endpoint, plus the directory of
//! conversations the backend stores.

pub mod directory;
pub mod message;
pub mod session;

pub use directory::ConversationDirectory;
pub use message::{Message, Role};
pub use session::{ChatSession, Conversation, SessionEvent};
