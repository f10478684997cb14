use std::io::{self, Write};
use std::time::Duration;

use anyhow::bail;
use clap::{Parser, Subcommand};
use colored::Colorize;

use chat_llm::providers::relay::DEFAULT_SERVER_URL;
use chat_server::logging::init_logging_with_default;
use chat_session::{ChatSession, Role, SessionConfig, SessionStatus, SubmitError};

mod client;
mod input;
mod render;
mod reply;

use client::{build_provider, fetch_greeting, http_client, ClientOptions, ProviderKind};
use input::{InputLines, PromptInput};
use render::{format_error, format_transcript, role_label};
use reply::{follow_reply, ReplyPrinter};

/// Log lines share the terminal with streamed replies, so only warnings by default.
const LOG_LEVEL: &str = "warn";

#[derive(Parser)]
#[command(name = "chat-cli")]
#[command(about = "Terminal chat client for the chat server")]
#[command(version)]
struct Cli {
    /// Where replies come from
    #[arg(long, env = "CHAT_PROVIDER", value_enum, default_value = "relay")]
    provider: ProviderKind,

    /// Chat server base URL (relay provider and `hello`)
    #[arg(long, env = "CHAT_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,

    /// Model override (openai provider only)
    #[arg(long, env = "OPENAI_MODEL")]
    model: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL")]
    openai_base_url: Option<String>,

    #[arg(long, default_value_t = 10)]
    connect_timeout_secs: u64,

    /// Enable debug mode
    #[arg(long, short, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start interactive chat
    Chat,
    /// Send a single message and print the reply
    Send {
        /// Message content
        message: String,
    },
    /// Call the greeting endpoint
    Hello,
}

impl Cli {
    fn client_options(&self) -> ClientOptions {
        ClientOptions {
            provider: self.provider,
            server_url: self.server_url.clone(),
            openai_api_key: self.openai_api_key.clone(),
            openai_base_url: self.openai_base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }

    fn session(&self) -> anyhow::Result<ChatSession> {
        let provider = build_provider(&self.client_options())?;
        let config = SessionConfig {
            model: self.model.clone(),
            ..SessionConfig::default()
        };
        Ok(ChatSession::with_config(provider, config))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging_with_default(cli.debug, LOG_LEVEL);

    if cli.debug {
        eprintln!("{}", "[DEBUG] Debug mode enabled".dimmed());
        eprintln!("{}", format!("[DEBUG] Provider: {:?}", cli.provider).dimmed());
        eprintln!("{}", format!("[DEBUG] Server URL: {}", cli.server_url).dimmed());
    }

    match &cli.command {
        Commands::Chat => run_interactive_chat(cli.session()?).await,
        Commands::Send { message } => send_message(cli.session()?, message).await,
        Commands::Hello => {
            let client = http_client(&cli.client_options())?;
            let message = fetch_greeting(&client, &cli.server_url).await?;
            println!("{}", message);
            Ok(())
        }
    }
}

async fn send_message(session: ChatSession, message: &str) -> anyhow::Result<()> {
    match stream_turn(&session, message, false).await? {
        SessionStatus::Error => {
            let detail = session
                .error()
                .map(|e| format_error(&e))
                .unwrap_or_else(|| "unknown error".to_string());
            bail!(detail)
        }
        _ => Ok(()),
    }
}

async fn run_interactive_chat(session: ChatSession) -> anyhow::Result<()> {
    println!("{}", "💬 Chat".cyan().bold());
    println!("{}", format!("Session ID: {}", session.id()).dimmed());
    println!(
        "{}",
        "Type /history to show the conversation, /quit or Ctrl-C to leave, Ctrl-C during a reply to stop it"
            .dimmed()
    );
    println!();

    let mut input = InputLines::stdin();
    loop {
        print!("{} ", format!("{}:", role_label(Role::User)).cyan().bold());
        io::stdout().flush()?;

        let line = match input.next_input(tokio::signal::ctrl_c()).await? {
            PromptInput::Line(line) => line,
            PromptInput::Eof | PromptInput::Interrupted => {
                println!();
                break;
            }
        };

        match line.trim() {
            "/quit" | "/exit" => break,
            "/history" => {
                for entry in format_transcript(&session.transcript()) {
                    println!("{}", entry);
                }
                println!();
                continue;
            }
            _ => {}
        }

        match stream_turn(&session, &line, true).await {
            Ok(_) => {}
            Err(e) => match e.downcast_ref::<SubmitError>() {
                Some(SubmitError::InvalidInput) => {
                    println!("{}", "(empty message not sent)".dimmed());
                    continue;
                }
                _ => println!("{}", format!("❌ {}", e).red()),
            },
        }
        println!();
    }

    println!("{}", "👋 Goodbye!".cyan());
    Ok(())
}

/// Submit `text` and print the reply as it streams. Returns the settled status.
///
/// With `allow_cancel`, Ctrl-C cancels the reply instead of ending the process.
async fn stream_turn(
    session: &ChatSession,
    text: &str,
    allow_cancel: bool,
) -> anyhow::Result<SessionStatus> {
    let mut events = session.subscribe();
    session.submit(text)?;

    print!("{} ", format!("{}:", role_label(Role::Assistant)).green().bold());
    io::stdout().flush()?;

    let mut printer = ReplyPrinter::new(io::stdout());
    let status = if allow_cancel {
        follow_reply(session, &mut events, &mut printer, tokio::signal::ctrl_c).await?
    } else {
        follow_reply(session, &mut events, &mut printer, std::future::pending::<()>).await?
    };
    println!();

    if status == SessionStatus::Error {
        if let Some(error) = session.error() {
            eprintln!("{}", format!("❌ {}", format_error(&error)).red());
        }
    }

    Ok(status)
}
