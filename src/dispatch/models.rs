//! Request and response bodies exchanged with the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agent::AgentDefinition;
use crate::chat::{Message, Role};

// --- Chat ---
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_rag: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<TurnPayload<'a>>,
}

#[derive(Debug, Serialize)]
pub struct TurnPayload<'a> {
    pub role: Role,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(alias = "reply")]
    pub response: String,
    #[serde(default)]
    pub context: Option<Value>,
}

/// Body of `POST /history`: the transcript the backend should persist.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveHistoryRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<&'a str>,
    pub messages: Vec<TurnPayload<'a>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HistorySaved {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AgentPreset {
    pub content: String,
}

// --- Conversations ---
#[derive(Debug, Serialize)]
pub struct ConversationTitle<'a> {
    pub title: &'a str,
}

/// `GET /conversations` answers with either a bare array or
/// `{"conversations": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ConversationListResponse {
    Bare(Vec<ConversationRecord>),
    Wrapped { conversations: Vec<ConversationRecord> },
}

impl ConversationListResponse {
    pub fn into_records(self) -> Vec<ConversationRecord> {
        match self {
            ConversationListResponse::Bare(records) => records,
            ConversationListResponse::Wrapped { conversations } => conversations,
        }
    }
}

/// A conversation as the backend stores it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

// --- Playground ---
#[derive(Debug, Serialize)]
pub struct PlaygroundRequest<'a> {
    pub messages: Vec<TurnPayload<'a>>,
    pub options: PlaygroundOptions,
}

#[derive(Debug, Serialize)]
pub struct PlaygroundOptions {
    pub temperature: f32,
    pub num_predict: u32,
    pub top_p: f32,
}

#[derive(Debug, Deserialize)]
pub struct PlaygroundResponse {
    pub reply: String,
}

// --- Agents ---
#[derive(Debug, Serialize)]
pub struct CreateAgentPayload<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub config: &'a Map<String, Value>,
}

/// `GET /agents` answers with either a bare array or `{"agents": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AgentListResponse {
    Bare(Vec<AgentDefinition>),
    Wrapped { agents: Vec<AgentDefinition> },
}

impl AgentListResponse {
    pub fn into_agents(self) -> Vec<AgentDefinition> {
        match self {
            AgentListResponse::Bare(agents) => agents,
            AgentListResponse::Wrapped { agents } => agents,
        }
    }
}

// --- Ingestion ---
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
}
