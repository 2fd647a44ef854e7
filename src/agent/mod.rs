//! Agent definitions and their lifecycle.
//!
//! `model` describes what the backend stores for each agent and the
//! start/stop state machine; `manager` keeps the local list in step with the
//! backend.

pub mod manager;
pub mod model;

pub use manager::AgentManager;
pub use model::{AgentDefinition, AgentStatus, AgentUpdate, Lifecycle};
