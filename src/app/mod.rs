// Application layer: wires the system adapters into an orchestrator.

use crate::adapters::{
    HttpHealthProbe, LocalStorage, PathToolLocator, SystemCommandRunner, SystemListenerTable,
};
use crate::config::DeploymentConfig;
use crate::core::inspector::RuntimeInspector;
use crate::core::launcher::ComposeLauncher;
use crate::core::orchestrator::Orchestrator;
use crate::core::preflight::PreflightChecker;
use crate::core::readiness::ReadinessVerifier;
use crate::domain::ports::CommandRunner;
use crate::utils::error::Result;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub monitor: bool,
    pub skip_inspection: bool,
}

/// Orchestrator backed by the real host: `PATH`, socket tables, compose CLI, HTTP.
pub fn build_orchestrator(config: &DeploymentConfig, options: RunOptions) -> Result<Orchestrator> {
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner::new());

    let preflight = PreflightChecker::new(
        Box::new(PathToolLocator::from_env()),
        Box::new(SystemListenerTable::new()),
    );
    let launcher = ComposeLauncher::new(runner.clone(), config.runtime());
    let probe = HttpHealthProbe::new(config.request_timeout())?;
    let verifier = ReadinessVerifier::new(Arc::new(probe), config.retry_policy());

    let mut orchestrator = Orchestrator::new(
        config.deployment_plan(),
        config.compose_file(),
        preflight,
        Box::new(launcher),
        verifier,
    )
    .with_required_tools(config.required_tools())
    .with_monitoring(options.monitor);

    match &config.inspection {
        Some(inspection) if config.inspection_enabled() && !options.skip_inspection => {
            let inspector = RuntimeInspector::new(
                runner,
                config.runtime(),
                LocalStorage::new(config.report_dir().to_string()),
                config.report_file(),
            );
            orchestrator = orchestrator.with_inspection(inspection.image.clone(), Box::new(inspector));
        }
        _ => tracing::debug!("Image inspection disabled"),
    }

    Ok(orchestrator)
}
