//! Explicit authentication context shared by every component that talks to
//! the backend. Replaces ambient login state: whoever builds the dispatcher
//! hands it one of these.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Default)]
struct ContextState {
    user: Option<User>,
    token: Option<String>,
}

/// Current user plus API token. Cleared by `logout`, which the dispatcher
/// also triggers when the backend answers 401.
#[derive(Debug, Default)]
pub struct SessionContext {
    state: RwLock<ContextState>,
}

impl SessionContext {
    pub fn new(user: Option<User>, token: Option<String>) -> Self {
        Self {
            state: RwLock::new(ContextState { user, token }),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn current_user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().user.is_some()
    }

    pub fn logout(&self) {
        let mut state = self.write();
        if let Some(user) = state.user.take() {
            info!("Logged out {}", user.name);
        }
        state.token = None;
    }

    fn read(&self) -> RwLockReadGuard<'_, ContextState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ContextState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
