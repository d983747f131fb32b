//! elevenlabs-mia-mcp: MCP stdio server for ElevenLabs speech and MIA IoT control.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use elevenlabs_mia_mcp::config::Config;
use elevenlabs_mia_mcp::dispatcher::Dispatcher;
use elevenlabs_mia_mcp::elevenlabs::ElevenLabsClient;
use elevenlabs_mia_mcp::server;

#[derive(Parser, Debug)]
#[command(name = "elevenlabs-mia-mcp", about = "ElevenLabs MCP Server for MIA")]
struct Args {
    /// ElevenLabs API key (can also set ELEVENLABS_API_KEY env var)
    #[arg(long)]
    elevenlabs_api_key: Option<String>,

    /// MIA FastAPI server host [default: localhost]
    #[arg(long)]
    mia_host: Option<String>,

    /// MIA FastAPI server port [default: 8000]
    #[arg(long)]
    mia_port: Option<u16>,

    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Check the API key and list models, then exit
    #[arg(long)]
    check: bool,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply(self, config: &mut Config) {
        if let Some(key) = self.elevenlabs_api_key {
            config.elevenlabs.api_key = Some(key);
        }
        if let Some(host) = self.mia_host {
            config.mia.host = host;
        }
        if let Some(port) = self.mia_port {
            config.mia.port = port;
        }
    }
}

async fn check(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let client = ElevenLabsClient::new(&config.elevenlabs)?;
    let user = client
        .try_get_user_info()
        .await
        .map_err(|e| format!("ElevenLabs API check failed: {e}"))?;
    let tier = user["subscription"]["tier"].as_str().unwrap_or("unknown");
    info!("ElevenLabs account OK (tier: {tier})");

    let models = client.list_models().await;
    for model in &models {
        info!("- model {}", model["model_id"].as_str().unwrap_or("?"));
    }
    info!("{} model(s) available, default {}", models.len(), client.default_model());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // stdout carries the protocol, so logs go to stderr
    let filter = if args.verbose {
        EnvFilter::new("debug,rmcp=info,hyper=info,reqwest=info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,rmcp=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("elevenlabs-mia-mcp starting");

    let mut config = Config::load(args.config.as_deref());
    let run_check = args.check;
    args.apply(&mut config);

    if run_check {
        return check(&config).await;
    }

    let dispatcher = Dispatcher::from_config(&config)?;
    server::serve_stdio(dispatcher).await?;

    info!("Shutting down ElevenLabs MCP server");
    Ok(())
}
