use anyhow::Context;
use clap::Parser;

use chat_llm::providers::openai::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};
use chat_server::logging::init_logging;
use chat_server::state::UpstreamConfig;
use chat_server::{run_server, AppState, ServerConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "chat-server")]
#[command(about = "Greeting endpoint and streaming chat relay")]
#[command(version)]
struct Cli {
    /// Enable debug mode
    #[arg(long, env = "DEBUG", default_value = "false")]
    debug: bool,

    /// Bind host
    #[arg(long, env = "HOST", default_value = chat_server::server::DEFAULT_HOST)]
    host: String,

    /// Server port
    #[arg(long, env = "PORT", default_value_t = chat_server::server::DEFAULT_PORT)]
    port: u16,

    /// API key for the upstream completion endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Base URL of the upstream completion endpoint
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_BASE_URL)]
    openai_base_url: String,

    /// Upstream model name
    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_OPENAI_MODEL)]
    model: String,

    /// Log level (overrides debug flag)
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.log_level.is_some() {
        env_logger::init();
    } else {
        init_logging(cli.debug);
    }

    log::info!("Starting chat server on {}:{}", cli.host, cli.port);
    log::info!("Upstream configuration:");
    log::info!("  Base URL: {}", cli.openai_base_url);
    log::info!("  Model: {}", cli.model);

    let upstream = UpstreamConfig {
        api_key: cli.openai_api_key.unwrap_or_default(),
        base_url: cli.openai_base_url,
        model: cli.model,
    };
    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
    };

    run_server(config.clone(), AppState::from_upstream(&upstream))
        .await
        .with_context(|| format!("server on {} exited with error", config.bind_address()))
}
