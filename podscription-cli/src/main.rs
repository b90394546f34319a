//! podscription, terminal client for the Pod Doctor Kubernetes troubleshooting service
//!
//! # Subcommands
//! - `chat [--session <id>] [--name <name>]`: interactive consultation
//! - `ask <text> [--session <id>] [--json]`  : one-shot question
//! - `sessions [--json]`                    : treatment history
//! - `show <id> [--json]`                   : print one session's transcript
//! - `new [--name <name>]`                  : start a consultation
//! - `health`                               : backend health

mod render;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use podscription_core::config::DEFAULT_CONFIG_PATH;
use podscription_core::{
    ConversationStore, HttpGateway, PodDoctorApi, PodscriptionConfig, Role, SendOutcome,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

type Store = ConversationStore<HttpGateway>;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "podscription",
    version,
    about = "Podscription: describe pod symptoms, get a diagnosis and treatment"
)]
struct Cli {
    /// Path to the TOML config file (optional)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Pod Doctor API base URL (overrides the config file)
    #[arg(long, env = "PODSCRIPTION_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start an interactive consultation
    Chat {
        /// Resume an existing session
        #[arg(long)]
        session: Option<String>,

        /// Name for a new session
        #[arg(long)]
        name: Option<String>,
    },

    /// Ask a single question and print the reply
    Ask {
        /// Symptoms to describe
        text: String,

        /// Continue an existing session
        #[arg(long)]
        session: Option<String>,

        /// Print the resulting session as JSON
        #[arg(long)]
        json: bool,
    },

    /// List past consultations
    Sessions {
        #[arg(long)]
        json: bool,
    },

    /// Show one consultation's transcript
    Show {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Start a new consultation and print its id
    New {
        #[arg(long)]
        name: Option<String>,
    },

    /// Show Pod Doctor service health
    Health,
}

// ============================================================================
// Commands
// ============================================================================

/// Print the assistant replies appended since `before` messages.
fn print_replies(store: &Store, before: usize) {
    if let Some(session) = store.current_session() {
        for message in session
            .messages
            .iter()
            .skip(before)
            .filter(|m| m.role == Role::Assistant)
        {
            println!("\n{}\n", render::render_message(message));
        }
    }
}

fn message_count(store: &Store) -> usize {
    store
        .current_session()
        .map(|s| s.messages.len())
        .unwrap_or(0)
}

/// Error for a session that could not be opened, carrying the store's reason.
fn open_failure(store: &Store, id: &str) -> anyhow::Error {
    let err = store.snapshot().error.unwrap_or_default();
    anyhow!("cannot open session {}: {}", id, err)
}

async fn do_chat(store: &Store, session: Option<String>, name: Option<String>) -> anyhow::Result<()> {
    store.initialize().await;

    match session {
        Some(id) => {
            if !store.open_session(&id).await {
                return Err(open_failure(store, &id));
            }
        }
        None => store.create_session(name.as_deref()).await,
    }

    if let Some(err) = store.snapshot().error {
        eprintln!("Connection Error: {}", err);
    }

    // Loading indicator, driven purely by observed store state.
    let mut rx = store.subscribe();
    tokio::spawn(async move {
        let mut was_loading = false;
        while rx.changed().await.is_ok() {
            let loading = rx.borrow_and_update().is_loading;
            if loading && !was_loading {
                eprintln!("Pod Doctor is diagnosing...");
            }
            was_loading = loading;
        }
    });

    if let Some(current) = store.current_session() {
        println!("{}", render::render_transcript(&current));
    }
    println!("Commands: /new [name], /sessions, /switch <id>, /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            let (verb, arg) = match command.split_once(' ') {
                Some((v, a)) => (v, Some(a.trim()).filter(|a| !a.is_empty())),
                None => (command, None),
            };
            match verb {
                "quit" | "exit" => break,
                "new" => {
                    store.create_session(arg).await;
                    if let Some(current) = store.current_session() {
                        println!("{}", render::render_transcript(&current));
                    }
                }
                "sessions" => {
                    let state = store.snapshot();
                    let now = chrono::Utc::now();
                    if state.sessions.is_empty() {
                        println!("No consultations yet.");
                    }
                    for session in &state.sessions {
                        println!("{}", render::history_entry(session, state.current_session_id(), now));
                    }
                }
                "switch" => match arg {
                    Some(id) if store.select_session(id) => {
                        if let Some(current) = store.current_session() {
                            println!("{}", render::render_transcript(&current));
                        }
                    }
                    Some(id) => eprintln!("No session with id {}", id),
                    None => eprintln!("Usage: /switch <id>"),
                },
                other => eprintln!("Unknown command: /{}", other),
            }
            continue;
        }

        let before = message_count(store);
        match store.send_message(input).await {
            SendOutcome::Delivered => print_replies(store, before + 1),
            SendOutcome::Failed => {
                print_replies(store, before + 1);
                if let Some(err) = store.snapshot().error {
                    eprintln!("Connection Error: {}", err);
                }
            }
            SendOutcome::Aborted => {
                let err = store.snapshot().error.unwrap_or_default();
                eprintln!("Message not sent ({}). Your text was: {}", err, input);
            }
        }
    }

    Ok(())
}

async fn do_ask(store: &Store, text: &str, session: Option<String>, json: bool) -> anyhow::Result<()> {
    if let Some(id) = session {
        if !store.open_session(&id).await {
            return Err(open_failure(store, &id));
        }
    }

    let before = message_count(store);
    let outcome = store.send_message(text).await;

    if outcome == SendOutcome::Aborted {
        let err = store.snapshot().error.unwrap_or_default();
        bail!("message not sent: {}", err);
    }

    if json {
        let session = store
            .current_session()
            .ok_or_else(|| anyhow!("no active session after send"))?;
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        print_replies(store, before + 1);
    }

    match outcome {
        SendOutcome::Failed => Err(anyhow!(store.snapshot().error.unwrap_or_default())),
        _ => Ok(()),
    }
}

async fn do_sessions(gateway: &HttpGateway, json: bool) -> anyhow::Result<()> {
    let sessions = gateway.list_sessions().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        eprintln!("No consultations yet. Start one with `podscription chat`.");
        return Ok(());
    }

    let now = chrono::Utc::now();
    for session in &sessions {
        println!("{}", render::history_entry(session, None, now));
    }
    Ok(())
}

async fn do_show(gateway: &HttpGateway, id: &str, json: bool) -> anyhow::Result<()> {
    let session = gateway.get_session(id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        print!("{}", render::render_transcript(&session));
    }
    Ok(())
}

async fn do_new(store: &Store, name: Option<String>) -> anyhow::Result<()> {
    store.create_session(name.as_deref()).await;

    let state = store.snapshot();
    let session = state
        .current_session
        .as_ref()
        .ok_or_else(|| anyhow!("no session created"))?;
    if let Some(err) = &state.error {
        eprintln!("Server unavailable ({}), created a local session", err);
    }
    println!("{}", session.id);
    Ok(())
}

async fn do_health(gateway: &HttpGateway) -> anyhow::Result<()> {
    let health = gateway
        .health_check()
        .await
        .with_context(|| format!("cannot reach {}", gateway.health_url()))?;
    println!("Pod Doctor: {}", health.status);
    println!("Service:    {}", health.service);
    println!("Version:    {}", health.version);
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    // Load .env file if present (dev convenience)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match PodscriptionConfig::load(&cli.config) {
        Ok(c) => c.with_api_url(cli.api_url.clone()),
        Err(e) => {
            eprintln!("podscription: failed to load config from {}: {}", cli.config, e);
            std::process::exit(1);
        }
    };

    // Logs go to stderr so --json output stays parseable.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.level.as_str()));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("podscription: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &PodscriptionConfig) -> anyhow::Result<()> {
    let gateway = HttpGateway::from_config(&config.api)?;
    tracing::debug!(base_url = gateway.base_url(), "Using Pod Doctor API");

    match command {
        Commands::Chat { session, name } => do_chat(&ConversationStore::new(gateway), session, name).await,
        Commands::Ask { text, session, json } => {
            do_ask(&ConversationStore::new(gateway), &text, session, json).await
        }
        Commands::Sessions { json } => do_sessions(&gateway, json).await,
        Commands::Show { id, json } => do_show(&gateway, &id, json).await,
        Commands::New { name } => do_new(&ConversationStore::new(gateway), name).await,
        Commands::Health => do_health(&gateway).await,
    }
}

// ============================================================================
// Tests
// ============================================================================
