use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle state of an agent as reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Running,
    /// New agents start here.
    #[default]
    Stopped,
    Error,
}

impl AgentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AgentStatus::Running => "running",
            AgentStatus::Stopped => "stopped",
            AgentStatus::Error => "error",
        }
    }

    /// What a toggle means for an agent in this state.
    pub fn toggle_action(&self) -> Lifecycle {
        match self {
            AgentStatus::Running => Lifecycle::Stop,
            AgentStatus::Stopped | AgentStatus::Error => Lifecycle::Start,
        }
    }

    /// The state `action` leads to, or `None` when the agent is already
    /// where the action would take it and nothing needs dispatching.
    pub fn transition(&self, action: Lifecycle) -> Option<AgentStatus> {
        match (self, action) {
            (AgentStatus::Stopped | AgentStatus::Error, Lifecycle::Start) => {
                Some(AgentStatus::Running)
            }
            (AgentStatus::Running, Lifecycle::Stop) => Some(AgentStatus::Stopped),
            (AgentStatus::Running, Lifecycle::Start)
            | (AgentStatus::Stopped | AgentStatus::Error, Lifecycle::Stop) => None,
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Start,
    Stop,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lifecycle::Start => "start",
            Lifecycle::Stop => "stop",
        })
    }
}

/// A named automation unit managed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub owner: String,
    /// Free-form label such as "2 hours ago"; the backend decides the format.
    #[serde(default)]
    pub last_run: String,
    #[serde(default)]
    pub tasks_completed: u64,
    #[serde(default)]
    pub config: Map<String, Value>,
}

/// Fields an explicit update replaces. Absent fields are left as they are
/// on the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Map<String, Value>>,
}

impl AgentUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.config.is_none()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn toggle_picks_stop_only_when_running() {
        assert_eq!(AgentStatus::Running.toggle_action(), Lifecycle::Stop);
        assert_eq!(AgentStatus::Stopped.toggle_action(), Lifecycle::Start);
        assert_eq!(AgentStatus::Error.toggle_action(), Lifecycle::Start);
    }

    #[test]
    fn transitions() {
        assert_eq!(
            AgentStatus::Stopped.transition(Lifecycle::Start),
            Some(AgentStatus::Running)
        );
        assert_eq!(
            AgentStatus::Error.transition(Lifecycle::Start),
            Some(AgentStatus::Running)
        );
        assert_eq!(
            AgentStatus::Running.transition(Lifecycle::Stop),
            Some(AgentStatus::Stopped)
        );
        assert_eq!(AgentStatus::Running.transition(Lifecycle::Start), None);
        assert_eq!(AgentStatus::Stopped.transition(Lifecycle::Stop), None);
    }

    #[test]
    fn definition_tolerates_sparse_payloads() {
        let agent: AgentDefinition = serde_json::from_value(json!({
            "id": "a1",
            "name": "Scraper",
            "status": "error",
            "lastRun": "yesterday",
            "tasksCompleted": 12
        }))
        .expect("decode");
        assert_eq!(agent.status, AgentStatus::Error);
        assert_eq!(agent.last_run, "yesterday");
        assert_eq!(agent.tasks_completed, 12);
        assert!(agent.owner.is_empty());
        assert!(agent.config.is_empty());
    }

    #[test]
    fn update_serializes_only_present_fields() {
        let update = AgentUpdate {
            name: Some("Renamed".into()),
            ..AgentUpdate::default()
        };
        assert_eq!(
            serde_json::to_value(&update).expect("encode"),
            json!({"name": "Renamed"})
        );
        assert!(AgentUpdate::default().is_empty());
    }
}
