#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assistant_console::config::{BackendSettings, ChatSettings};
use assistant_console::{
    Dispatch, DispatchError, DispatchResult, Endpoint, HttpDispatcher, SessionContext,
};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

pub const WELCOME: &str = "Welcome!";

pub fn chat_settings() -> ChatSettings {
    ChatSettings {
        welcome_message: WELCOME.into(),
        ..ChatSettings::default()
    }
}

pub fn http_dispatcher(base_url: &str, context: Arc<SessionContext>) -> Arc<HttpDispatcher> {
    let settings = BackendSettings {
        base_url: base_url.into(),
        timeout_secs: 1,
        api_token: None,
    };
    Arc::new(HttpDispatcher::new(&settings, context).expect("dispatcher"))
}

/// Answers each dispatch with the next scripted result, or a network error
/// once the script runs out. Records every call.
#[derive(Default)]
pub struct ScriptedDispatch {
    replies: Mutex<VecDeque<DispatchResult>>,
    calls: Mutex<Vec<(Endpoint, Option<Value>)>>,
}

impl ScriptedDispatch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, result: DispatchResult) -> &Self {
        self.replies.lock().unwrap().push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<(Endpoint, Option<Value>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|(endpoint, _)| endpoint.to_string())
            .collect()
    }
}

#[async_trait]
impl Dispatch for ScriptedDispatch {
    async fn dispatch(&self, endpoint: Endpoint, payload: Option<Value>) -> DispatchResult {
        self.calls.lock().unwrap().push((endpoint, payload));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DispatchError::Network("no scripted reply".into())))
    }

    async fn upload(&self, file_name: String, _bytes: Vec<u8>) -> DispatchResult {
        self.dispatch(Endpoint::upload(), Some(Value::String(file_name)))
            .await
    }
}

/// Holds every dispatch open until the test releases it.
#[derive(Default)]
pub struct GatedDispatch {
    gates: Mutex<VecDeque<oneshot::Receiver<DispatchResult>>>,
    calls: Mutex<Vec<(Endpoint, Option<Value>)>>,
}

impl GatedDispatch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a gate for the next dispatch and returns the handle that
    /// resolves it.
    pub fn gate(&self) -> oneshot::Sender<DispatchResult> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push_back(rx);
        tx
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(Endpoint, Option<Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dispatch for GatedDispatch {
    async fn dispatch(&self, endpoint: Endpoint, payload: Option<Value>) -> DispatchResult {
        self.calls.lock().unwrap().push((endpoint, payload));
        let gate = self.gates.lock().unwrap().pop_front();
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(DispatchError::Network("gate dropped".into()))),
            None => Err(DispatchError::Network("no gate queued".into())),
        }
    }

    async fn upload(&self, _file_name: String, _bytes: Vec<u8>) -> DispatchResult {
        Err(DispatchError::Network("uploads are not gated".into()))
    }
}

/// Polls `condition` until it holds, failing the test after two seconds.
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
