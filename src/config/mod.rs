pub mod toml_config;

pub use toml_config::DeploymentConfig;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "stack-warden")]
#[command(about = "Start a compose stack and verify that every service becomes healthy")]
pub struct CliConfig {
    /// Path to the deployment TOML file
    #[arg(short, long, default_value = "stack.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    pub monitor: Option<bool>,

    /// Dry run - show the deployment plan without touching the host
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the post-startup image inspection
    #[arg(long)]
    pub skip_inspection: bool,
}
