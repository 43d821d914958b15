use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "fleetdeck",
    version,
    about = "Keyboard-driven operator console for Kubernetes fleets."
)]
pub struct CliArgs {
    /// Base URL of the console API (overrides the config file)
    #[arg(long)]
    pub api_base: Option<String>,

    /// Connect to this cluster once the cluster list arrives
    #[arg(short, long)]
    pub cluster: Option<String>,

    /// Start in a specific namespace after connecting
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Write logs to this file instead of discarding them
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// HTTP request timeout in seconds (overrides the config file)
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,
}
