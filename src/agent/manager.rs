use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::dispatch::models::{AgentListResponse, CreateAgentPayload};
use crate::dispatch::{Dispatch, Endpoint, decode, encode, fetch};
use crate::error::{ConsoleError, ConsoleResult, DispatchError, required};

use super::model::{AgentDefinition, AgentStatus, AgentUpdate, Lifecycle};

#[derive(Default)]
struct AgentState {
    agents: Vec<AgentDefinition>,
    /// Last failure, shown above the list until dismissed.
    banner: Option<String>,
}

/// The core manager for agent definitions and their lifecycle.
///
/// `AgentManager` is responsible for:
/// - Caching the last successfully fetched agent list.
/// - Creating, updating and deleting definitions through the backend.
/// - Driving each agent's `stopped -> running -> stopped` state machine.
///
/// Failures never clear the cached list; they are returned to the caller and
/// kept as a banner message. Lifecycle calls on the same agent are not
/// serialized, so with two overlapping toggles the last one to resolve
/// decides the local status.
pub struct AgentManager {
    dispatcher: Arc<dyn Dispatch>,
    state: Mutex<AgentState>,
}

impl AgentManager {
    pub fn new(dispatcher: Arc<dyn Dispatch>) -> Self {
        Self {
            dispatcher,
            state: Mutex::new(AgentState::default()),
        }
    }

    /// The cached list as of the last successful fetch.
    pub fn agents(&self) -> Vec<AgentDefinition> {
        self.state().agents.clone()
    }

    pub fn agent(&self, id: &str) -> Option<AgentDefinition> {
        self.state().agents.iter().find(|agent| agent.id == id).cloned()
    }

    pub fn banner(&self) -> Option<String> {
        self.state().banner.clone()
    }

    pub fn clear_banner(&self) {
        self.state().banner = None;
    }

    /// Fetches the agent list. On failure the previous list is kept.
    pub async fn list(&self) -> ConsoleResult<Vec<AgentDefinition>> {
        match fetch::<AgentListResponse>(&*self.dispatcher, Endpoint::list_agents(), None).await {
            Ok(response) => {
                let agents = response.into_agents();
                debug!("Loaded {} agents", agents.len());
                self.state().agents = agents.clone();
                Ok(agents)
            }
            Err(err) => Err(self.fail("Failed to load agents", err)),
        }
    }

    /// Fetches a single agent and replaces its cached entry.
    pub async fn get(&self, id: &str) -> ConsoleResult<AgentDefinition> {
        match fetch::<AgentDefinition>(&*self.dispatcher, Endpoint::agent(id), None).await {
            Ok(agent) => {
                self.upsert(agent.clone());
                Ok(agent)
            }
            Err(DispatchError::Api { status: 404, .. }) => Err(ConsoleError::NotFound(id.into())),
            Err(err) => Err(self.fail("Failed to load agent", err)),
        }
    }

    pub async fn create(&self, name: &str, description: &str) -> ConsoleResult<AgentDefinition> {
        self.create_with_config(name, description, Map::new()).await
    }

    /// Creates a definition and refreshes the list. If only the refresh
    /// fails, the new agent is still added to the cached list.
    pub async fn create_with_config(
        &self,
        name: &str,
        description: &str,
        config: Map<String, Value>,
    ) -> ConsoleResult<AgentDefinition> {
        let name = required("name", name)?;
        let description = required("description", description)?;
        let payload = encode(&CreateAgentPayload {
            name,
            description,
            config: &config,
        })?;

        let created = match fetch::<AgentDefinition>(
            &*self.dispatcher,
            Endpoint::create_agent(),
            Some(payload),
        )
        .await
        {
            Ok(agent) => agent,
            Err(err) => return Err(self.fail("Failed to create agent", err)),
        };
        info!("Created agent {} ({})", created.name, created.id);

        if self.list().await.is_err() {
            self.upsert(created.clone());
        }
        Ok(created)
    }

    /// Replaces the supplied fields of an agent with what the backend
    /// returns. The returned definition replaces the cached one wholesale.
    pub async fn update(&self, id: &str, update: AgentUpdate) -> ConsoleResult<AgentDefinition> {
        self.lookup(id)?;
        if let Some(name) = update.name.as_deref() {
            required("name", name)?;
        }
        if let Some(description) = update.description.as_deref() {
            required("description", description)?;
        }
        if update.is_empty() {
            return Err(ConsoleError::Validation(String::from("nothing to update")));
        }

        let payload = encode(&update)?;
        match fetch::<AgentDefinition>(&*self.dispatcher, Endpoint::update_agent(id), Some(payload))
            .await
        {
            Ok(agent) => {
                self.upsert(agent.clone());
                Ok(agent)
            }
            Err(err) => Err(self.fail("Failed to update agent", err)),
        }
    }

    /// Stops a running agent, starts any other.
    pub async fn toggle(&self, id: &str) -> ConsoleResult<AgentStatus> {
        let current = self.lookup(id)?.status;
        let action = current.toggle_action();
        let target = current.transition(action).unwrap_or(current);
        self.apply(id, action, target).await
    }

    /// Starting a running agent returns its status without a backend call.
    pub async fn start(&self, id: &str) -> ConsoleResult<AgentStatus> {
        self.drive(id, Lifecycle::Start).await
    }

    /// Stopping an agent that is not running returns its status without a
    /// backend call.
    pub async fn stop(&self, id: &str) -> ConsoleResult<AgentStatus> {
        self.drive(id, Lifecycle::Stop).await
    }

    /// Deletes an agent once `confirm` agrees. Returns `false` when the
    /// caller declined. The cached entry is only removed after the backend
    /// acknowledged the deletion.
    pub async fn delete<F>(&self, id: &str, confirm: F) -> ConsoleResult<bool>
    where
        F: FnOnce(&AgentDefinition) -> bool,
    {
        let agent = self.lookup(id)?;
        if !confirm(&agent) {
            debug!("Deletion of agent {id} declined");
            return Ok(false);
        }

        match self
            .dispatcher
            .dispatch(Endpoint::delete_agent(id), None)
            .await
        {
            Ok(_) => {
                self.state().agents.retain(|agent| agent.id != id);
                info!("Deleted agent {} ({id})", agent.name);
                Ok(true)
            }
            Err(err) => Err(self.fail("Failed to delete agent", err)),
        }
    }

    async fn drive(&self, id: &str, action: Lifecycle) -> ConsoleResult<AgentStatus> {
        let current = self.lookup(id)?.status;
        match current.transition(action) {
            Some(target) => self.apply(id, action, target).await,
            None => {
                debug!("Agent {id} is already {current}, skipping {action}");
                Ok(current)
            }
        }
    }

    /// Sends the lifecycle call and records only the resulting status.
    ///
    /// A backend-reported failure puts the agent in `error`; a network
    /// failure leaves the status as it was.
    async fn apply(
        &self,
        id: &str,
        action: Lifecycle,
        target: AgentStatus,
    ) -> ConsoleResult<AgentStatus> {
        let endpoint = match action {
            Lifecycle::Start => Endpoint::start_agent(id),
            Lifecycle::Stop => Endpoint::stop_agent(id),
        };

        match self.dispatcher.dispatch(endpoint, None).await {
            Ok(body) => {
                let status = decode::<AgentDefinition>(body)
                    .map(|agent| agent.status)
                    .unwrap_or(target);
                self.set_status(id, status);
                info!("Agent {id} {action} -> {status}");
                Ok(status)
            }
            Err(err) => {
                if err.is_api() {
                    self.set_status(id, AgentStatus::Error);
                }
                Err(self.fail("Failed to update agent status", err))
            }
        }
    }

    fn lookup(&self, id: &str) -> ConsoleResult<AgentDefinition> {
        self.agent(id)
            .ok_or_else(|| ConsoleError::NotFound(id.to_string()))
    }

    fn set_status(&self, id: &str, status: AgentStatus) {
        if let Some(agent) = self.state().agents.iter_mut().find(|agent| agent.id == id) {
            agent.status = status;
        }
    }

    fn upsert(&self, agent: AgentDefinition) {
        let mut state = self.state();
        match state.agents.iter_mut().find(|existing| existing.id == agent.id) {
            Some(existing) => *existing = agent,
            None => state.agents.push(agent),
        }
    }

    fn fail(&self, what: &str, err: DispatchError) -> ConsoleError {
        warn!("{what}: {err}");
        self.state().banner = Some(format!("{what}: {err}"));
        ConsoleError::from(err)
    }

    fn state(&self) -> MutexGuard<'_, AgentState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
