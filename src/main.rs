use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use actuator_sync_runtime::config;
use actuator_sync_runtime::runtime::{self, RuntimeOptions};

/// Closed-loop position synchronizer for a dual linear actuator pair.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Run against the simulated pair instead of GPIO hardware
    #[arg(long)]
    sim: bool,

    /// Identity tag used when no position record exists yet
    #[arg(long, default_value = "lift")]
    identity: String,

    /// Path of the persisted position record
    #[arg(long, default_value = config::STATE_FILE)]
    state_file: PathBuf,

    /// JSON tuning file overriding the built-in control constants
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port of the diagnostics echo listener
    #[arg(long, default_value_t = config::DIAG_PORT)]
    diag_port: u16,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();
    let opts = RuntimeOptions {
        sim: args.sim,
        identity: args.identity,
        state_file: args.state_file,
        config_file: args.config,
        diag_port: args.diag_port,
    };

    if let Err(e) = runtime::run(opts).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
