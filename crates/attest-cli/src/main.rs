//! attest entry point.
//!
//! # Usage
//!
//! ```bash
//! # Hold credentials issued by a simulated issuer
//! attest holder --name Alice
//!
//! # Issue credentials to a simulated holder, logging to a file
//! attest issuer --name Faber --log-level debug --log-file attest.log
//! ```

use std::{fs::File, path::PathBuf, sync::Arc, time::Duration};

use attest_app::AgentConfig;
use attest_cli::{Role, SessionOptions, session};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// attest credential exchange agent
#[derive(Parser, Debug)]
#[command(name = "attest")]
#[command(about = "Interactive credential exchange agent")]
#[command(version)]
struct Args {
    /// Role to play
    #[command(subcommand)]
    role: Role,

    /// Agent label shown to peers
    #[arg(short, long, global = true)]
    name: Option<String>,

    /// Reaction delay of the simulated peer in milliseconds
    #[arg(long, global = true, default_value = "500")]
    latency_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

fn init_logging(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    match &args.log_file {
        Some(path) => {
            let file = Arc::new(File::create(path)?);
            let layer = fmt::layer().with_writer(file).with_ansi(false);
            tracing_subscriber::registry().with(layer).with(filter).init();
        },
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
        },
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = match &args.name {
        Some(name) => AgentConfig::with_label(name.clone()),
        None => AgentConfig::default(),
    };
    let options = SessionOptions { config, latency: Duration::from_millis(args.latency_ms) };

    tracing::info!(role = ?args.role, label = %options.config.label, "attest starting");
    session::run(args.role, &options).await?;
    Ok(())
}
