//! Trinity agent service binary.
//!
//! Usage:
//!   trinity-server
//!   trinity-server --port 8000
//!   trinity-server --port 8000 --bind 0.0.0.0
//!
//! # Environment Variables
//!
//! - `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` - LLM provider credentials
//! - `TRINITY_WORKSPACE` - Workspace directory (default: ./workspace)
//! - `TRINITY_BIND_ADDR` - Server bind address (default: 127.0.0.1)
//! - `TRINITY_PORT` - Server port (default: 8000)
//! - `TRINITY_TASK_TIMEOUT_SECS` - Per-run timeout (default: 300)
//!
//! Variables may also come from a `.env` file in the working directory.

use std::net::SocketAddr;
use std::sync::Arc;

use trinity::{logging, serve, AppState, Settings, Workspace};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut settings = Settings::from_env()?;

    // CLI flags override the environment
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    settings.port = args[i + 1]
                        .parse()
                        .map_err(|_| anyhow::anyhow!("invalid port: {}", args[i + 1]))?;
                    i += 1;
                }
            }
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    settings.bind_addr = args[i + 1].clone();
                    i += 1;
                }
            }
            "--workspace" | "-w" => {
                if i + 1 < args.len() {
                    settings.workspace_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Trinity Agent Service");
                println!();
                println!("Usage: trinity-server [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --port <PORT>       Port to listen on (default: 8000)");
                println!("  -b, --bind <ADDR>       Bind address (default: 127.0.0.1)");
                println!("  -w, --workspace <DIR>   Workspace directory (default: ./workspace)");
                println!("  -h, --help              Show this help message");
                println!();
                println!("Environment variables:");
                println!("  OPENAI_API_KEY          OpenAI credential");
                println!("  ANTHROPIC_API_KEY       Anthropic credential");
                println!("  TRINITY_WORKSPACE       Workspace directory");
                println!("  TRINITY_BIND_ADDR       Server bind address");
                println!("  TRINITY_PORT            Server port");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    // The workspace must exist before logging can write into it
    let workspace = Workspace::init(&settings.workspace_path)?;
    let _log_guard = logging::init_logging(&workspace.logs_dir())?;

    if settings.bind_addr == "0.0.0.0" {
        tracing::warn!(
            "Server binding to 0.0.0.0 — this exposes the API to all network interfaces."
        );
    }
    if !settings.has_llm_credentials() {
        tracing::warn!(
            "No LLM API key configured; agents will run but LLM-backed tools will fail. \
             Set OPENAI_API_KEY or ANTHROPIC_API_KEY."
        );
    }

    let addr: SocketAddr = format!("{}:{}", settings.bind_addr, settings.port).parse()?;
    let state = Arc::new(AppState::new(settings)?);

    serve(state, addr).await
}
