use thiserror::Error;

/// Classified failure of a single exchange with the backend.
///
/// `Network` means no response reached us (refused connection, timeout,
/// truncated body). `Api` means the backend answered but reported failure,
/// either through the HTTP status or through an `error` field in the body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("backend error ({status}): {body}")]
    Api { status: u16, body: String },
}

impl DispatchError {
    pub fn is_network(&self) -> bool {
        matches!(self, DispatchError::Network(_))
    }

    pub fn is_api(&self) -> bool {
        matches!(self, DispatchError::Api { .. })
    }
}

/// Errors surfaced by the orchestrator components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    /// Caller input was rejected before anything was dispatched.
    #[error("invalid input: {0}")]
    Validation(String),
    /// The playground was asked to run with no non-empty prompt blocks.
    #[error("transcript is empty: add at least one block with content")]
    EmptyTranscript,
    /// The referenced agent, conversation or preset does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;

/// Trims a required text field, rejecting it when nothing is left.
pub(crate) fn required<'a>(field: &str, value: &'a str) -> ConsoleResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ConsoleError::Validation(format!("{field} must not be empty")))
    } else {
        Ok(trimmed)
    }
}
