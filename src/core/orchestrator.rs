use crate::core::preflight::PreflightChecker;
use crate::core::readiness::ReadinessVerifier;
use crate::domain::model::{
    DeploymentPlan, HealthCheckResult, InspectionReport, OrchestratorState,
};
use crate::domain::ports::{EnvironmentInspector, StackLauncher};
use crate::utils::error::{ErrorSeverity, Result, StackError};
use crate::utils::monitor::{PhaseSample, SystemMonitor};
use std::path::PathBuf;

/// Everything a single orchestration pass produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub trace: Vec<OrchestratorState>,
    pub health_results: Vec<HealthCheckResult>,
    pub report: Option<InspectionReport>,
    pub report_path: Option<String>,
    /// Fatal error that moved the run to `Failed`.
    pub error: Option<StackError>,
    /// Suppressed inspection error, if any.
    pub inspection_error: Option<StackError>,
    /// One sample per state after `Init`; empty unless monitoring is on.
    pub phase_samples: Vec<PhaseSample>,
}

impl RunOutcome {
    fn new() -> Self {
        Self {
            trace: vec![OrchestratorState::Init],
            health_results: Vec::new(),
            report: None,
            report_path: None,
            error: None,
            inspection_error: None,
            phase_samples: Vec::new(),
        }
    }

    fn advance(&mut self, state: OrchestratorState) {
        tracing::debug!("State: {} -> {}", self.final_state(), state);
        self.trace.push(state);
    }

    fn fail(&mut self, error: StackError) {
        self.advance(OrchestratorState::Failed(error.to_string()));
        self.error = Some(error);
    }

    pub fn final_state(&self) -> &OrchestratorState {
        self.trace.last().unwrap_or(&OrchestratorState::Init)
    }

    pub fn succeeded(&self) -> bool {
        *self.final_state() == OrchestratorState::Done
    }

    /// 0 on `Done`; otherwise non-zero, derived from the failure severity.
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            return 0;
        }
        let severity = self
            .error
            .as_ref()
            .map(StackError::severity)
            .unwrap_or(ErrorSeverity::High);
        severity.exit_code().max(1)
    }
}

struct Inspection {
    image_ref: String,
    inspector: Box<dyn EnvironmentInspector>,
}

/// Runs preflight, launch, readiness and inspection strictly in order.
pub struct Orchestrator {
    plan: DeploymentPlan,
    compose_file: PathBuf,
    required_tools: Vec<String>,
    preflight: PreflightChecker,
    launcher: Box<dyn StackLauncher>,
    verifier: ReadinessVerifier,
    inspection: Option<Inspection>,
    monitor: Option<SystemMonitor>,
}

impl Orchestrator {
    pub fn new(
        plan: DeploymentPlan,
        compose_file: impl Into<PathBuf>,
        preflight: PreflightChecker,
        launcher: Box<dyn StackLauncher>,
        verifier: ReadinessVerifier,
    ) -> Self {
        Self {
            plan,
            compose_file: compose_file.into(),
            required_tools: Vec::new(),
            preflight,
            launcher,
            verifier,
            inspection: None,
            monitor: None,
        }
    }

    pub fn with_required_tools(mut self, tools: Vec<String>) -> Self {
        self.required_tools = tools;
        self
    }

    pub fn with_inspection(
        mut self,
        image_ref: impl Into<String>,
        inspector: Box<dyn EnvironmentInspector>,
    ) -> Self {
        self.inspection = Some(Inspection {
            image_ref: image_ref.into(),
            inspector,
        });
        self
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = enabled.then(SystemMonitor::new);
        self
    }

    pub fn plan(&self) -> &DeploymentPlan {
        &self.plan
    }

    pub async fn run(&self) -> RunOutcome {
        let mut outcome = RunOutcome::new();
        tracing::info!(
            "🎬 Orchestrating '{}' ({} services)",
            self.plan.name,
            self.plan.services.len()
        );

        match self.drive(&mut outcome).await {
            Ok(()) => {
                outcome.advance(OrchestratorState::Done);
                tracing::info!("🎉 Deployment '{}' is healthy", self.plan.name);
            }
            Err(e) => {
                tracing::error!(
                    "❌ Deployment '{}' failed: {} (Category: {:?}, Severity: {:?})",
                    self.plan.name,
                    e,
                    e.category(),
                    e.severity()
                );
                tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
                outcome.fail(e);
            }
        }

        if let Some(monitor) = &self.monitor {
            monitor.record(outcome.final_state());
            monitor.log_summary();
            outcome.phase_samples = monitor.samples();
        }
        outcome
    }

    async fn drive(&self, outcome: &mut RunOutcome) -> Result<()> {
        self.preflight.check_tools(&self.required_tools)?;
        self.phase_completed(outcome, OrchestratorState::ToolsChecked);

        self.preflight.check_ports_free(self.plan.required_ports())?;
        self.phase_completed(outcome, OrchestratorState::PortsChecked);

        self.launcher.launch(&self.plan, &self.compose_file).await?;
        self.phase_completed(outcome, OrchestratorState::Launched);

        self.verifier
            .verify_plan(&self.plan, &mut outcome.health_results)
            .await?;
        self.phase_completed(outcome, OrchestratorState::Verified);

        if let Some(inspection) = &self.inspection {
            match self.inspect(inspection).await {
                Ok((report, path)) => {
                    outcome.report = Some(report);
                    outcome.report_path = Some(path);
                    self.phase_completed(outcome, OrchestratorState::Inspected);
                }
                Err(e) => {
                    tracing::warn!("⚠️ {}", e.user_friendly_message());
                    outcome.inspection_error = Some(e);
                }
            }
        }

        Ok(())
    }

    async fn inspect(&self, inspection: &Inspection) -> Result<(InspectionReport, String)> {
        let inspector = inspection.inspector.as_ref();
        let container = inspector
            .locate_running_container(&inspection.image_ref)
            .await?;
        tracing::info!("🔎 Inspecting {} (container {})", inspection.image_ref, container);

        let mut report = inspector.inspect(&inspection.image_ref).await?;
        report.container_id = Some(container.0);

        let path = inspector.write_report(&report).await?;
        tracing::info!("📁 Inspection report saved to: {}", path);
        Ok((report, path))
    }

    fn phase_completed(&self, outcome: &mut RunOutcome, state: OrchestratorState) {
        tracing::info!("✅ {}", state);
        if let Some(monitor) = &self.monitor {
            monitor.record(&state);
        }
        outcome.advance(state);
    }
}
