use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::sync::Mutex as SendQueue;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::ChatSettings;
use crate::dispatch::models::{
    AgentPreset, ChatRequest, ChatResponse, ConversationRecord, HistorySaved, SaveHistoryRequest,
    TurnPayload,
};
use crate::dispatch::{Dispatch, Endpoint, encode, fetch};
use crate::error::{ConsoleError, ConsoleResult, DispatchError};

use super::Message;

/// Conversation identity plus its ordered history.
///
/// Only ever appended to. A reset swaps in a brand new value instead of
/// clearing this one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    conversation_id: Option<String>,
    messages: Vec<Message>,
    /// Number of leading messages that were seeded locally (the welcome).
    seeded: usize,
}

impl Conversation {
    fn seeded(welcome: &str) -> Self {
        Self {
            conversation_id: None,
            messages: vec![Message::assistant(welcome)],
            seeded: 1,
        }
    }

    fn resumed(welcome: &str, record: ConversationRecord) -> Self {
        let mut conversation = Self::seeded(welcome);
        conversation.conversation_id = Some(record.id);
        conversation.messages.extend(record.messages);
        conversation
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages exchanged with the backend, i.e. everything after the seed.
    pub fn exchanged(&self) -> &[Message] {
        &self.messages[self.seeded.min(self.messages.len())..]
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    fn turns(&self) -> Vec<TurnPayload<'_>> {
        self.exchanged()
            .iter()
            .map(|message| TurnPayload {
                role: message.role(),
                content: message.content(),
            })
            .collect()
    }
}

/// Observable state transitions of a [`ChatSession`].
///
/// A successful or failed `send` always produces two `MessageAppended`
/// events: the user message right away, the reply (or error bubble) once the
/// dispatch resolves.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    MessageAppended(Message),
    ConversationAssigned(String),
    Reset,
    /// A send was overtaken by a reset, either while queued or in flight.
    StaleResponseDiscarded { generation: u64 },
}

struct SessionState {
    conversation: Conversation,
    /// Bumped by every reset; a send whose captured value no longer matches
    /// is dropped.
    generation: u64,
    system_prompt: Option<String>,
    /// Set by reset until the backend's copy of the history has been cleared.
    server_clear_pending: bool,
}

struct Shared {
    dispatcher: Arc<dyn Dispatch>,
    settings: ChatSettings,
    state: Mutex<SessionState>,
    send_queue: SendQueue<()>,
    events: Mutex<Option<UnboundedSender<SessionEvent>>>,
}

/// Drives one multi-turn conversation against the chat endpoint.
///
/// `send` calls are queued: a second call waits for the first to resolve
/// before appending anything, so history always alternates user/assistant in
/// call order. State is only locked for short synchronous sections, never
/// across the network call, so `reset` never waits on an in-flight send.
pub struct ChatSession {
    shared: Arc<Shared>,
}

impl ChatSession {
    pub fn new(dispatcher: Arc<dyn Dispatch>, settings: ChatSettings) -> Self {
        let conversation = Conversation::seeded(&settings.welcome_message);
        let system_prompt = settings.system_prompt.clone();
        Self {
            shared: Arc::new(Shared {
                dispatcher,
                settings,
                state: Mutex::new(SessionState {
                    conversation,
                    generation: 0,
                    system_prompt,
                    server_clear_pending: false,
                }),
                send_queue: SendQueue::new(()),
                events: Mutex::new(None),
            }),
        }
    }

    /// Registers the (single) event subscriber, replacing any previous one.
    pub fn subscribe(&self) -> UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *lock(&self.shared.events) = Some(tx);
        rx
    }

    pub fn conversation(&self) -> Conversation {
        self.shared.state().conversation.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.shared.state().conversation.messages.clone()
    }

    pub fn conversation_id(&self) -> Option<String> {
        self.shared.state().conversation.conversation_id.clone()
    }

    pub fn generation(&self) -> u64 {
        self.shared.state().generation
    }

    pub fn system_prompt(&self) -> Option<String> {
        self.shared.state().system_prompt.clone()
    }

    /// Replaces the system prompt sent with every following turn.
    pub fn set_system_prompt(&self, prompt: Option<String>) {
        self.shared.state().system_prompt = prompt.filter(|prompt| !prompt.trim().is_empty());
    }

    /// Sends one user turn and returns the assistant message that was
    /// appended for it.
    ///
    /// Input is trimmed; whitespace-only input is ignored and returns `None`.
    /// Backend failures never escape: they become an assistant-authored error
    /// message. `None` is also returned when the session was reset after
    /// this call was made, in which case nothing is appended.
    ///
    /// The turn runs on its own task, so dropping the returned future does
    /// not cancel it: the user message still gets its reply.
    pub async fn send(&self, user_text: &str) -> Option<Message> {
        let text = user_text.trim();
        if text.is_empty() {
            debug!("Ignoring blank chat input");
            return None;
        }

        let generation = self.generation();
        let shared = Arc::clone(&self.shared);
        let text = text.to_owned();
        match tokio::spawn(async move { shared.take_turn(generation, text).await }).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!("Chat turn did not complete: {err}");
                None
            }
        }
    }

    /// Replaces the conversation with a fresh one holding only the welcome
    /// message. Sends made before the reset are discarded, whether queued or
    /// in flight.
    ///
    /// The backend's copy of the history is cleared on a best-effort basis: a
    /// failure is only logged. The clear always reaches the backend before
    /// the next chat turn.
    pub fn reset(&self) {
        {
            let mut state = self.shared.state();
            state.generation += 1;
            state.conversation = Conversation::seeded(&self.shared.settings.welcome_message);
            state.server_clear_pending = true;
            info!("Chat session reset (generation {})", state.generation);
            self.shared.emit(SessionEvent::Reset);
            if let Some(welcome) = state.conversation.messages.first() {
                self.shared.emit(SessionEvent::MessageAppended(welcome.clone()));
            }
        }

        match Handle::try_current() {
            Ok(handle) => {
                let shared = Arc::clone(&self.shared);
                handle.spawn(async move {
                    let _turn = shared.send_queue.lock().await;
                    shared.clear_server_history().await;
                });
            }
            Err(_) => debug!("No runtime; server history is cleared before the next send"),
        }
    }

    /// Continues a conversation stored by the backend. Behaves like a reset
    /// followed by replaying the stored messages, without clearing anything
    /// on the backend.
    pub fn resume(&self, record: ConversationRecord) {
        let mut state = self.shared.state();
        state.generation += 1;
        state.conversation = Conversation::resumed(&self.shared.settings.welcome_message, record);
        info!(
            "Resumed conversation {:?} with {} messages",
            state.conversation.conversation_id,
            state.conversation.exchanged().len()
        );
        self.shared.emit(SessionEvent::Reset);
        for message in &state.conversation.messages {
            self.shared.emit(SessionEvent::MessageAppended(message.clone()));
        }
        if let Some(id) = state.conversation.conversation_id.clone() {
            self.shared.emit(SessionEvent::ConversationAssigned(id));
        }
    }

    /// Asks the backend to persist the current transcript.
    pub async fn save_history(&self) -> ConsoleResult<HistorySaved> {
        let payload = {
            let state = self.shared.state();
            encode(&SaveHistoryRequest {
                conversation_id: state.conversation.conversation_id(),
                messages: state.conversation.turns(),
            })?
        };
        let saved = fetch::<HistorySaved>(
            &*self.shared.dispatcher,
            Endpoint::save_history(),
            Some(payload),
        )
        .await?;
        info!(
            "Chat history saved: {}",
            saved.filename.as_deref().unwrap_or("(no file name)")
        );
        Ok(saved)
    }

    /// Loads a named preset and makes it the system prompt of the following
    /// turns. Returns the preset text.
    pub async fn load_preset(&self, name: &str) -> ConsoleResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConsoleError::Validation(
                "preset name must not be empty".into(),
            ));
        }

        let preset = match fetch::<AgentPreset>(
            &*self.shared.dispatcher,
            Endpoint::agent_preset(name),
            None,
        )
        .await
        {
            Ok(preset) => preset,
            Err(DispatchError::Api { status: 404, .. }) => {
                return Err(ConsoleError::NotFound(format!("preset {name}")));
            }
            Err(err) => return Err(err.into()),
        };
        debug!("Loaded preset {name} ({} chars)", preset.content.len());
        self.set_system_prompt(Some(preset.content.clone()));
        Ok(preset.content)
    }
}

impl Shared {
    async fn take_turn(&self, generation: u64, user_text: String) -> Option<Message> {
        let _turn = self.send_queue.lock().await;
        self.clear_server_history().await;

        let payload = {
            let mut state = self.state();
            if state.generation != generation {
                self.discard(generation, state.generation);
                return None;
            }
            let payload = self.request_payload(&state, &user_text);
            let message = Message::user(user_text);
            state.conversation.push(message.clone());
            self.emit(SessionEvent::MessageAppended(message));
            payload
        };

        let outcome = match payload {
            Ok(payload) => fetch::<ChatResponse>(&*self.dispatcher, Endpoint::chat(), Some(payload))
                .await
                .map_err(ConsoleError::from),
            Err(err) => Err(err),
        };

        let mut state = self.state();
        if state.generation != generation {
            self.discard(generation, state.generation);
            return None;
        }

        let reply = match outcome {
            Ok(response) => {
                if let Some(context) = response.context.as_ref() {
                    debug!("Retrieval context: {context}");
                }
                self.capture_conversation_id(&mut state, response.conversation_id);
                Message::assistant(response.response)
            }
            Err(err) => {
                warn!("Chat request failed: {err}");
                Message::assistant(failure_text(&err))
            }
        };
        state.conversation.push(reply.clone());
        self.emit(SessionEvent::MessageAppended(reply.clone()));
        Some(reply)
    }

    /// Callers hold the send queue.
    async fn clear_server_history(&self) {
        let pending = std::mem::take(&mut self.state().server_clear_pending);
        if !pending {
            return;
        }
        match self.dispatcher.dispatch(Endpoint::reset_history(), None).await {
            Ok(_) => debug!("Server-side chat history cleared"),
            Err(err) => warn!("Could not clear server-side chat history: {err}"),
        }
    }

    fn discard(&self, generation: u64, current: u64) {
        debug!("Discarding chat turn from generation {generation}, session is at {current}");
        self.emit(SessionEvent::StaleResponseDiscarded { generation });
    }

    fn request_payload(
        &self,
        state: &SessionState,
        user_text: &str,
    ) -> Result<serde_json::Value, ConsoleError> {
        let conversation = &state.conversation;
        let history = if self.settings.include_history {
            conversation.turns()
        } else {
            Vec::new()
        };
        let request = ChatRequest {
            message: user_text,
            conversation_id: conversation.conversation_id(),
            system_prompt: state
                .system_prompt
                .as_deref()
                .filter(|prompt| !prompt.trim().is_empty()),
            use_rag: Some(self.settings.use_rag),
            history,
        };
        encode(&request)
    }

    fn capture_conversation_id(&self, state: &mut SessionState, assigned: Option<String>) {
        let Some(assigned) = assigned.filter(|id| !id.trim().is_empty()) else {
            return;
        };
        match state.conversation.conversation_id.as_deref() {
            None => {
                debug!("Conversation id assigned: {assigned}");
                state.conversation.conversation_id = Some(assigned.clone());
                self.emit(SessionEvent::ConversationAssigned(assigned));
            }
            Some(current) if current != assigned => {
                warn!("Backend answered with conversation {assigned}, keeping {current}");
            }
            Some(_) => {}
        }
    }

    fn emit(&self, event: SessionEvent) {
        let mut events = lock(&self.events);
        let delivered = match events.as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => return,
        };
        if !delivered {
            *events = None;
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Text of the assistant bubble shown in place of a reply.
pub fn failure_text(err: &ConsoleError) -> String {
    match err {
        ConsoleError::Dispatch(DispatchError::Network(_)) => String::from(
            "Sorry, I couldn't reach the assistant service. Check your connection and try again.",
        ),
        ConsoleError::Dispatch(DispatchError::Api { body, .. }) if !body.is_empty() => format!(
            "Sorry, I encountered an error processing your request: {body}. Please try again."
        ),
        _ => String::from(
            "Sorry, I encountered an error processing your request. Please try again.",
        ),
    }
}
