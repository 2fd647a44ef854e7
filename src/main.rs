mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::debug;

use assistant_console::{ConsoleSettings, HttpDispatcher, SessionContext, logging};

#[derive(Parser)]
#[command(name = "assistant-console")]
#[command(about = "Chat, agent and playground console for an assistant backend")]
#[command(version)]
struct Cli {
    /// Workspace root holding config/console.toml
    #[arg(long, default_value = ".")]
    workspace: PathBuf,

    /// Backend base URL, overrides the settings file
    #[arg(long, env = "CONSOLE_API_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive chat (/reset, /save, /preset <name>, /upload <path>, /quit)
    Chat(commands::ChatArgs),
    /// Manage conversations stored by the backend
    Conversations {
        #[command(subcommand)]
        action: commands::ConversationAction,
    },
    /// Manage agents
    Agents {
        #[command(subcommand)]
        action: commands::AgentAction,
    },
    /// Run a prompt file once against the playground endpoint
    Playground(commands::PlaygroundArgs),
    /// Index a file, or every file under a directory
    Upload {
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let workspace = cli.workspace.canonicalize().unwrap_or(cli.workspace);

    let mut settings = ConsoleSettings::load(&workspace)?;
    if let Some(url) = cli.base_url {
        settings.backend.base_url = url;
    }
    logging::init(&settings.logging)?;
    debug!("Backend at {}", settings.backend.base_url);

    let context = Arc::new(SessionContext::new(
        settings.user.clone(),
        settings.backend.api_token.clone(),
    ));
    let dispatcher = Arc::new(HttpDispatcher::new(&settings.backend, context.clone())?);

    match cli.command {
        Command::Chat(args) => commands::chat(dispatcher, &settings, &context, args).await,
        Command::Conversations { action } => commands::conversations(dispatcher, action).await,
        Command::Agents { action } => commands::agents(dispatcher, action).await,
        Command::Playground(args) => commands::playground(dispatcher, &settings, args).await,
        Command::Upload { path } => commands::upload(dispatcher, &path).await,
    }
}
