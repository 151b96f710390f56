use std::io;
use std::path::PathBuf;

use clap::Parser;

use chat_core::{paths, Config};
use web_service::server::run_server_with_config;

#[derive(Parser, Debug, Clone)]
#[command(name = "tangent-server")]
#[command(about = "Tangent conversation server")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, env = "DEBUG", default_value = "false")]
    debug: bool,

    /// Server port
    #[arg(long, env = "PORT", default_value = "8084")]
    port: u16,

    /// Conversation database path (defaults to ~/.tangent/conversations.db)
    #[arg(long, env = "TANGENT_DB")]
    db_path: Option<PathBuf>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY")]
    api_key: Option<String>,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_API_BASE")]
    api_base: Option<String>,

    /// Default model for new sessions
    #[arg(long, env = "TANGENT_MODEL")]
    model: Option<String>,
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    // CLI flags win over config.json; both fall back to defaults.
    let config = Config::new();
    let api_key = cli
        .api_key
        .or(config.api_key.clone())
        .ok_or_else(|| io::Error::other("no API key: set GEMINI_API_KEY or config.json"))?;
    let api_base = cli.api_base.or(config.api_base.clone());
    let model = cli.model.unwrap_or_else(|| config.model().to_string());
    let db_path = cli.db_path.unwrap_or_else(|| config.database_path());

    paths::ensure_tangent_dir()?;

    log::info!("Starting Tangent server on port {}", cli.port);
    log::info!("  Database: {:?}", db_path);
    log::info!("  Default model: {}", model);

    run_server_with_config(cli.port, db_path, api_key, api_base, model).await
}
