//! Drive Forge MCP Server - Entry Point
//!
//! Serves MCP over stdio; logs go to stderr as JSON.

use drive_forge::{Config, McpServer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("Drive Forge MCP Server v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage: drive-forge [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --help, -h         Show this help");
        println!();
        println!("Runs as an MCP server over stdio.");
        println!();
        println!("Environment variables:");
        println!("  DRIVE_FORGE_HOME             Package root (default: current directory)");
        println!("  GOOGLE_DRIVE_SKILLS_DIR      Skill library (default: $DRIVE_FORGE_HOME/skills)");
        println!("  GOOGLE_DRIVE_PYTHON_PATH     Interpreter or virtualenv for skills");
        println!("  GOOGLE_DRIVE_AUDIT_LOG       Audit log file");
        println!("  GOOGLE_DRIVE_ACCESS_TOKEN    Static bearer token");
        println!("  GOOGLE_DRIVE_TOKEN_PATH      Authorized-user token.json");
        println!("  DRIVE_FORGE_RETRY_ATTEMPTS   Attempts for retried reads (default: 3)");
        println!("  DRIVE_FORGE_SKILL_TIMEOUT    Skill timeout in seconds (default: none)");
        return Ok(());
    }

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    // stdout carries the protocol, so logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .json()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Drive Forge MCP Server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let server = McpServer::new(config);
    server.run().await?;

    Ok(())
}
