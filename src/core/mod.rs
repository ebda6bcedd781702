pub mod inspector;
pub mod launcher;
pub mod orchestrator;
pub mod preflight;
pub mod readiness;

pub use crate::domain::model::{DeploymentPlan, HealthCheckResult, OrchestratorState, ServiceSpec};
pub use crate::domain::ports::{EnvironmentInspector, HealthProbe, StackLauncher};
pub use crate::utils::error::Result;
