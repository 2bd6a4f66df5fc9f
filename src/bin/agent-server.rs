use agent_sdk::agents::AgentKind;
use agent_sdk::server::{self, ServerSettings, EXECUTE_PATH};
use agent_sdk::Orchestrator;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "agent-server", about = "Serve a sample agent over HTTP")]
struct Args {
    /// Agent to serve
    #[arg(long, env = "AGENT_KIND", value_enum, default_value = "data-analysis")]
    agent: AgentKind,

    #[arg(long, env = "AGENT_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Defaults to the agent's own port (5002 data analysis, 5001 weather)
    #[arg(long, env = "AGENT_PORT")]
    port: Option<u16>,

    /// JSON file applied as the agent's initial configuration
    #[arg(long, env = "AGENT_CONFIG")]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let agent = args.agent.build();
    let orchestrator = Arc::new(Orchestrator::new(agent));

    if let Some(path) = args.config.as_deref() {
        let config = load_configuration(path)?;
        orchestrator
            .apply_configuration(config)
            .with_context(|| format!("rejected configuration from {}", path.display()))?;
    }

    let settings = ServerSettings::new(
        args.host,
        args.port.unwrap_or_else(|| args.agent.default_port()),
    );

    info!(
        "try: curl -X POST http://localhost:{}{} -H 'Content-Type: application/json' -d '{}'",
        settings.port,
        EXECUTE_PATH,
        args.agent.sample_request()
    );

    server::serve(&settings, orchestrator).await
}

fn load_configuration(path: &Path) -> Result<agent_sdk::Payload> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    match serde_json::from_str::<serde_json::Value>(&raw)
        .with_context(|| format!("failed to parse config {} (JSON)", path.display()))?
    {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(anyhow!("config {} must be a JSON object", path.display())),
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("agent_sdk=debug,agent_server=debug,tower_http=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("agent_sdk=info,agent_server=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
