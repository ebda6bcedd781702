pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::{build_orchestrator, RunOptions};
pub use config::DeploymentConfig;
pub use crate::core::orchestrator::{Orchestrator, RunOutcome};
pub use utils::error::{Result, StackError};
