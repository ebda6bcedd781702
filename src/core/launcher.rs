use crate::domain::model::{ComposeBackend, DeploymentPlan};
use crate::domain::ports::{CommandRunner, StackLauncher};
use crate::utils::error::{Result, StackError};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub const LEGACY_COMPOSE_BINARY: &str = "docker-compose";

/// Starts the stack through whichever compose invocation the host provides.
pub struct ComposeLauncher {
    runner: Arc<dyn CommandRunner>,
    candidates: Vec<ComposeBackend>,
}

impl ComposeLauncher {
    /// Prefers the standalone binary, then `<runtime> compose`.
    pub fn new(runner: Arc<dyn CommandRunner>, runtime: &str) -> Self {
        Self::with_candidates(
            runner,
            vec![
                ComposeBackend::Standalone {
                    program: LEGACY_COMPOSE_BINARY.to_string(),
                },
                ComposeBackend::Plugin {
                    program: runtime.to_string(),
                },
            ],
        )
    }

    pub fn with_candidates(runner: Arc<dyn CommandRunner>, candidates: Vec<ComposeBackend>) -> Self {
        Self { runner, candidates }
    }

    /// First candidate whose `version` subcommand succeeds.
    pub async fn resolve_backend(&self) -> Result<ComposeBackend> {
        for candidate in &self.candidates {
            let args = candidate.command_args(["version"]);
            match self.runner.run(candidate.program(), &args).await {
                Ok(output) if output.success() => {
                    tracing::info!("🧩 Using compose backend: {}", candidate);
                    return Ok(candidate.clone());
                }
                Ok(output) => {
                    tracing::debug!("{} unavailable (exit code {:?})", candidate, output.exit_code)
                }
                Err(e) => tracing::debug!("{} unavailable: {}", candidate, e),
            }
        }

        let names: Vec<String> = self.candidates.iter().map(|c| c.to_string()).collect();
        Err(StackError::MissingTool {
            name: names.join(" or "),
        })
    }
}

#[async_trait]
impl StackLauncher for ComposeLauncher {
    async fn launch(&self, plan: &DeploymentPlan, descriptor: &Path) -> Result<()> {
        if !descriptor.is_file() {
            return Err(StackError::Launch {
                exit_code: None,
                stderr: format!("compose file not found: {}", descriptor.display()),
            });
        }

        let backend = self.resolve_backend().await?;
        let args = backend.command_args([
            "-f".to_string(),
            descriptor.display().to_string(),
            "up".to_string(),
            "--build".to_string(),
            "-d".to_string(),
        ]);

        tracing::info!(
            "🚀 Starting {} ({} services) from {}",
            plan.name,
            plan.services.len(),
            descriptor.display()
        );

        let output = self.runner.run(backend.program(), &args).await?;
        if !output.success() {
            tracing::error!("❌ {} exited with {:?}", backend, output.exit_code);
            return Err(StackError::Launch {
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        tracing::info!("✅ Stack started in detached mode");
        Ok(())
    }
}
