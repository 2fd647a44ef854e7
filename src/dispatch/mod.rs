//! The single call path to the backend.
//!
//! Every component reaches the backend through [`Dispatch`], which returns
//! either the decoded JSON payload or a classified [`DispatchError`]. Nothing
//! past this boundary inspects raw HTTP responses.

pub mod http;
pub mod models;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ConsoleError, DispatchError};

pub use http::HttpDispatcher;

pub type DispatchResult = Result<Value, DispatchError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        f.write_str(label)
    }
}

/// A backend route, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: Method,
    pub path: String,
}

impl Endpoint {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    pub fn chat() -> Self {
        Self::new(Method::Post, "chat")
    }

    /// Drops the chat history the backend keeps for the current conversation.
    pub fn reset_history() -> Self {
        Self::new(Method::Post, "reset")
    }

    pub fn save_history() -> Self {
        Self::new(Method::Post, "history")
    }

    /// A named system-prompt preset.
    pub fn agent_preset(name: &str) -> Self {
        Self::new(Method::Get, format!("agent/{name}"))
    }

    pub fn list_conversations() -> Self {
        Self::new(Method::Get, "conversations")
    }

    pub fn create_conversation() -> Self {
        Self::new(Method::Post, "conversations")
    }

    pub fn conversation(id: &str) -> Self {
        Self::new(Method::Get, format!("conversations/{id}"))
    }

    pub fn rename_conversation(id: &str) -> Self {
        Self::new(Method::Patch, format!("conversations/{id}"))
    }

    pub fn delete_conversation(id: &str) -> Self {
        Self::new(Method::Delete, format!("conversations/{id}"))
    }

    pub fn playground() -> Self {
        Self::new(Method::Post, "playground")
    }

    pub fn list_agents() -> Self {
        Self::new(Method::Get, "agents")
    }

    pub fn create_agent() -> Self {
        Self::new(Method::Post, "agents")
    }

    pub fn agent(id: &str) -> Self {
        Self::new(Method::Get, format!("agents/{id}"))
    }

    pub fn update_agent(id: &str) -> Self {
        Self::new(Method::Put, format!("agents/{id}"))
    }

    pub fn delete_agent(id: &str) -> Self {
        Self::new(Method::Delete, format!("agents/{id}"))
    }

    pub fn start_agent(id: &str) -> Self {
        Self::new(Method::Post, format!("agents/{id}/start"))
    }

    pub fn stop_agent(id: &str) -> Self {
        Self::new(Method::Post, format!("agents/{id}/stop"))
    }

    pub fn upload() -> Self {
        Self::new(Method::Post, "upload")
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} /{}", self.method, self.path)
    }
}

/// Transport seam shared by the chat session, the agent manager, the
/// playground and file ingestion.
///
/// Implementations must never panic on backend failures: every outcome is
/// either `Ok(payload)` or a classified `DispatchError`.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Sends `payload` (as JSON, when present) to `endpoint`.
    async fn dispatch(&self, endpoint: Endpoint, payload: Option<Value>) -> DispatchResult;

    /// Uploads one file as a multipart `file` part to the ingestion endpoint.
    async fn upload(&self, file_name: String, bytes: Vec<u8>) -> DispatchResult;
}

/// Dispatches and decodes the success payload into `T`.
pub async fn fetch<T: DeserializeOwned>(
    dispatcher: &dyn Dispatch,
    endpoint: Endpoint,
    payload: Option<Value>,
) -> Result<T, DispatchError> {
    let value = dispatcher.dispatch(endpoint, payload).await?;
    decode(value)
}

/// A payload that arrived fine but has the wrong shape is still the
/// backend's failure, so it is reported as an API error.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, DispatchError> {
    serde_json::from_value(value).map_err(|err| DispatchError::Api {
        status: 200,
        body: format!("unexpected response: {err}"),
    })
}

pub fn encode<T: Serialize>(body: &T) -> Result<Value, ConsoleError> {
    serde_json::to_value(body)
        .map_err(|err| ConsoleError::Validation(format!("could not encode request: {err}")))
}

/// The backend reports failures through an `error` field, sometimes on a
/// 2xx response.
pub fn error_field(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
