use crate::domain::model::{CommandOutput, ContainerId, DeploymentPlan, InspectionReport};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Destination for run artifacts. Writing an existing name replaces it.
pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        name: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Finds executables on the host.
pub trait ToolLocator: Send + Sync {
    fn locate(&self, name: &str) -> Option<PathBuf>;
}

/// Answers whether something on the host is listening on a TCP port.
pub trait ListenerTable: Send + Sync {
    fn is_listening(&self, port: u16) -> Result<bool>;
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `program args...` to completion. Spawn failures are `Err`,
    /// non-zero exits are a successful call with a non-zero `exit_code`.
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// One bounded request. `Err` carries a human-readable failure reason.
    async fn probe(&self, url: &str) -> std::result::Result<(), String>;
}

#[async_trait]
pub trait StackLauncher: Send + Sync {
    async fn launch(&self, plan: &DeploymentPlan, descriptor: &Path) -> Result<()>;
}

#[async_trait]
pub trait EnvironmentInspector: Send + Sync {
    async fn locate_running_container(&self, image_ref: &str) -> Result<ContainerId>;
    async fn inspect(&self, image_ref: &str) -> Result<InspectionReport>;
    async fn write_report(&self, report: &InspectionReport) -> Result<String>;
}
