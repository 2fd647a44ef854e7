use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, BufReader};

use assistant_console::agent::AgentUpdate;
use assistant_console::chat::SessionEvent;
use assistant_console::dispatch::models::ConversationRecord;
use assistant_console::playground::load_blocks;
use assistant_console::{
    AgentDefinition, AgentManager, ChatSession, ConsoleSettings, ConversationDirectory, Dispatch,
    Playground, Role, SamplingInput, SessionContext, ingest,
};

#[derive(Subcommand)]
pub enum AgentAction {
    /// List agents
    List,
    /// Show one agent
    Show { id: String },
    /// Create a stopped agent
    Create {
        name: String,
        description: String,
        /// Agent config as a JSON object
        #[arg(long)]
        config: Option<String>,
    },
    /// Rename, redescribe or reconfigure an agent
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        config: Option<String>,
    },
    /// Stop a running agent, start any other
    Toggle { id: String },
    Start { id: String },
    Stop { id: String },
    /// Delete an agent (asks for confirmation)
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Args)]
pub struct PlaygroundArgs {
    /// TOML file with [[blocks]] role/content tables
    file: PathBuf,
    #[arg(long)]
    temperature: Option<f32>,
    #[arg(long)]
    max_tokens: Option<i64>,
    #[arg(long)]
    top_p: Option<f32>,
}

#[derive(Args)]
pub struct ChatArgs {
    /// Continue a conversation stored by the backend
    #[arg(long)]
    resume: Option<String>,
    /// Load a named preset as the system prompt
    #[arg(long)]
    preset: Option<String>,
}

#[derive(Subcommand)]
pub enum ConversationAction {
    /// List stored conversations
    List,
    /// Show one conversation with its messages
    Show { id: String },
    Create { title: String },
    Rename { id: String, title: String },
    /// Delete a conversation (asks for confirmation)
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

pub async fn chat(
    dispatcher: Arc<dyn Dispatch>,
    settings: &ConsoleSettings,
    context: &SessionContext,
    args: ChatArgs,
) -> Result<()> {
    let session = ChatSession::new(dispatcher.clone(), settings.chat.clone());
    if let Some(name) = args.preset.as_deref() {
        session.load_preset(name).await?;
        println!("Preset {name} loaded.");
    }
    if let Some(id) = args.resume.as_deref() {
        let record = ConversationDirectory::new(dispatcher.clone()).get(id).await?;
        session.resume(record);
    }
    let mut events = session.subscribe();
    if let Some(user) = context.current_user() {
        println!("Signed in as {}", user.name);
    }
    for message in session.messages() {
        print_message(message.role(), message.content());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        match input {
            "/quit" | "/exit" => break,
            "/reset" => session.reset(),
            "/save" => {
                match session.save_history().await {
                    Ok(saved) => println!(
                        "{}",
                        saved.message.as_deref().unwrap_or("History saved.")
                    ),
                    Err(err) => println!("Could not save history: {err}"),
                }
                continue;
            }
            _ if input.starts_with("/preset ") => {
                let name = input.trim_start_matches("/preset ").trim();
                match session.load_preset(name).await {
                    Ok(_) => println!("Preset {name} loaded."),
                    Err(err) => println!("Could not load preset {name}: {err}"),
                }
                continue;
            }
            _ if input.starts_with("/upload ") => {
                let path = PathBuf::from(input.trim_start_matches("/upload ").trim());
                match ingest::index_file(&*dispatcher, &path).await {
                    Ok(file) => println!("Indexed \"{}\", you can now ask about it.", file.name),
                    Err(err) => println!("Could not index {}: {err}", path.display()),
                }
                continue;
            }
            _ => {
                session.send(input).await;
            }
        }

        while let Ok(event) = events.try_recv() {
            match event {
                SessionEvent::MessageAppended(message) if message.role() != Role::User => {
                    print_message(message.role(), message.content())
                }
                SessionEvent::Reset => println!("-- conversation cleared --"),
                _ => {}
            }
        }
    }
    Ok(())
}

fn print_message(role: Role, content: &str) {
    println!("[{role}] {content}");
}

pub async fn agents(dispatcher: Arc<dyn Dispatch>, action: AgentAction) -> Result<()> {
    let manager = AgentManager::new(dispatcher);
    manager.list().await?;

    match action {
        AgentAction::List => {
            let agents = manager.agents();
            if agents.is_empty() {
                println!("No agents defined.");
            }
            for agent in agents {
                print_agent(&agent);
            }
        }
        AgentAction::Show { id } => print_agent(&manager.get(&id).await?),
        AgentAction::Create {
            name,
            description,
            config,
        } => {
            let config = parse_config(config.as_deref())?.unwrap_or_default();
            let agent = manager
                .create_with_config(&name, &description, config)
                .await?;
            print_agent(&agent);
        }
        AgentAction::Update {
            id,
            name,
            description,
            config,
        } => {
            let update = AgentUpdate {
                name,
                description,
                config: parse_config(config.as_deref())?,
            };
            print_agent(&manager.update(&id, update).await?);
        }
        AgentAction::Toggle { id } => println!("{id}: {}", manager.toggle(&id).await?),
        AgentAction::Start { id } => println!("{id}: {}", manager.start(&id).await?),
        AgentAction::Stop { id } => println!("{id}: {}", manager.stop(&id).await?),
        AgentAction::Delete { id, yes } => {
            let deleted = manager
                .delete(&id, |agent| yes || confirm(&format!("Delete agent \"{}\"?", agent.name)))
                .await?;
            if deleted {
                println!("Deleted {id}");
            }
        }
    }

    if let Some(banner) = manager.banner() {
        eprintln!("{banner}");
    }
    Ok(())
}

pub async fn conversations(dispatcher: Arc<dyn Dispatch>, action: ConversationAction) -> Result<()> {
    let directory = ConversationDirectory::new(dispatcher);
    match action {
        ConversationAction::List => {
            let records = directory.list().await?;
            if records.is_empty() {
                println!("No stored conversations.");
            }
            for record in &records {
                print_conversation(record);
            }
        }
        ConversationAction::Show { id } => {
            let record = directory.get(&id).await?;
            print_conversation(&record);
            for message in &record.messages {
                print_message(message.role(), message.content());
            }
        }
        ConversationAction::Create { title } => {
            let record = directory.create(&title).await?;
            print_conversation(&record);
        }
        ConversationAction::Rename { id, title } => {
            let record = directory.rename(&id, &title).await?;
            print_conversation(&record);
        }
        ConversationAction::Delete { id, yes } => {
            if yes || confirm(&format!("Delete conversation {id}?")) {
                directory.delete(&id).await?;
                println!("Deleted {id}.");
            }
        }
    }
    Ok(())
}

fn print_conversation(record: &ConversationRecord) {
    let updated = record
        .updated_at
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".into());
    println!(
        "{:<12} {} ({} messages, updated {updated})",
        record.id,
        record.title,
        record.messages.len()
    );
}

fn print_agent(agent: &AgentDefinition) {
    println!(
        "{:<12} {:<8} {} - {} (owner: {}, last run: {}, tasks: {})",
        agent.id,
        agent.status,
        agent.name,
        agent.description,
        agent.owner,
        agent.last_run,
        agent.tasks_completed
    );
}

fn parse_config(raw: Option<&str>) -> Result<Option<Map<String, Value>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match serde_json::from_str(raw)? {
        Value::Object(map) => Ok(Some(map)),
        _ => bail!("--config must be a JSON object"),
    }
}

fn confirm(question: &str) -> bool {
    print!("{question} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub async fn playground(
    dispatcher: Arc<dyn Dispatch>,
    settings: &ConsoleSettings,
    args: PlaygroundArgs,
) -> Result<()> {
    let blocks = load_blocks(&args.file)?;
    let sampling = SamplingInput {
        temperature: args.temperature,
        max_output_tokens: args.max_tokens,
        top_p: args.top_p,
    }
    .or(&settings.sampling);

    let reply = Playground::new(dispatcher).run(&blocks, &sampling).await?;
    println!("{reply}");
    Ok(())
}

pub async fn upload(dispatcher: Arc<dyn Dispatch>, path: &Path) -> Result<()> {
    if path.is_dir() {
        let summary = ingest::index_dir(&*dispatcher, path).await?;
        println!(
            "{} indexed, {} failed",
            summary.indexed.len(),
            summary.failed.len()
        );
        for (path, err) in &summary.failed {
            eprintln!("  {}: {err}", path.display());
        }
        if !summary.is_clean() {
            bail!("some files could not be indexed");
        }
    } else {
        let file = ingest::index_file(&*dispatcher, path).await?;
        println!("Indexed \"{}\"", file.name);
    }
    Ok(())
}
