use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::context::User;
use crate::playground::SamplingInput;

const CONFIG_FILE: &str = "config/console.toml";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_WELCOME: &str = "Hello! I'm your assistant. How can I help you today?";

/// Top-level settings, read from `config/console.toml` under the workspace
/// root. Every section is optional; missing values fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub chat: ChatSettings,
    /// Playground defaults. Normalized before use, so out-of-range values
    /// in the file are corrected rather than rejected.
    #[serde(default)]
    pub sampling: SamplingInput,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub api_token: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            api_token: None,
        }
    }
}

impl BackendSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_true")]
    pub use_rag: bool,
    /// Send prior turns along with each chat request. Off by default: the
    /// conversation id already lets the backend recover the context.
    #[serde(default)]
    pub include_history: bool,
    #[serde(default = "default_welcome")]
    pub welcome_message: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            system_prompt: None,
            use_rag: true,
            include_history: false,
            welcome_message: default_welcome(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_level")]
    pub level: String,
    /// Optional log4rs YAML file, relative to the workspace root.
    #[serde(default)]
    pub log4rs_config: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            log4rs_config: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_welcome() -> String {
    DEFAULT_WELCOME.into()
}

fn default_level() -> String {
    "info".into()
}

impl ConsoleSettings {
    /// Reads `config/console.toml` from the workspace, falling back to
    /// defaults when it does not exist, then applies environment overrides.
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let config_path = workspace_root.join(CONFIG_FILE);
        let mut settings = if config_path.exists() {
            let raw = fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read settings: {}", config_path.display()))?;
            Self::parse(&raw)
                .with_context(|| format!("failed to parse settings: {}", config_path.display()))?
        } else {
            debug!("No settings at {}, using defaults", config_path.display());
            Self::default()
        };
        settings.apply_env(|key| env::var(key).ok());
        settings.logging.log4rs_config = settings
            .logging
            .log4rs_config
            .take()
            .map(|path| absolutize(workspace_root, path));
        Ok(settings)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Overrides file values with `CONSOLE_*` variables. The lookup is
    /// injected so tests do not have to touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CONSOLE_API_URL").filter(|v| !v.trim().is_empty()) {
            self.backend.base_url = url.trim().to_string();
        }
        if let Some(token) = lookup("CONSOLE_API_TOKEN").filter(|v| !v.trim().is_empty()) {
            self.backend.api_token = Some(token.trim().to_string());
        }
        if let Some(secs) = lookup("CONSOLE_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
            self.backend.timeout_secs = secs;
        }
        if let Some(level) = lookup("CONSOLE_LOG").filter(|v| !v.trim().is_empty()) {
            self.logging.level = level.trim().to_string();
        }
    }
}

fn absolutize(root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}
