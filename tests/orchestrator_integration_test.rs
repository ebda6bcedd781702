use async_trait::async_trait;
use chrono::Utc;
use httpmock::prelude::*;
use stack_warden::adapters::HttpHealthProbe;
use stack_warden::core::preflight::PreflightChecker;
use stack_warden::core::readiness::{ReadinessVerifier, RetryPolicy};
use stack_warden::domain::model::{
    ContainerId, DeploymentPlan, InspectionReport, OrchestratorState, ServiceSpec,
};
use stack_warden::domain::ports::{
    EnvironmentInspector, HealthProbe, ListenerTable, StackLauncher, ToolLocator,
};
use stack_warden::{Orchestrator, Result, StackError};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct FakeTools(HashSet<String>);

impl ToolLocator for FakeTools {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        self.0
            .contains(name)
            .then(|| PathBuf::from("/usr/local/bin").join(name))
    }
}

struct FakeListeners(HashSet<u16>);

impl ListenerTable for FakeListeners {
    fn is_listening(&self, port: u16) -> Result<bool> {
        Ok(self.0.contains(&port))
    }
}

/// Counts launches; `exit_code` makes every launch fail.
#[derive(Clone, Default)]
struct RecordingLauncher {
    launches: Arc<AtomicUsize>,
    exit_code: Option<i32>,
}

#[async_trait]
impl StackLauncher for RecordingLauncher {
    async fn launch(&self, _plan: &DeploymentPlan, _descriptor: &Path) -> Result<()> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        match self.exit_code {
            Some(code) => Err(StackError::Launch {
                exit_code: Some(code),
                stderr: "build failed".to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Fails the test if the stack is ever launched.
struct ForbiddenLauncher;

#[async_trait]
impl StackLauncher for ForbiddenLauncher {
    async fn launch(&self, _plan: &DeploymentPlan, _descriptor: &Path) -> Result<()> {
        panic!("launch must not be invoked after a failed preflight");
    }
}

/// Succeeds on the configured attempt per URL; absent URLs never succeed.
#[derive(Default)]
struct ScriptedProbe {
    succeed_on: HashMap<String, u32>,
    polls: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    fn new(rules: &[(&str, u32)]) -> Self {
        Self {
            succeed_on: rules.iter().map(|(u, n)| (u.to_string(), *n)).collect(),
            polls: Mutex::new(Vec::new()),
        }
    }

    fn polls_of(&self, url: &str) -> usize {
        self.polls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn probe(&self, url: &str) -> std::result::Result<(), String> {
        let attempt = {
            let mut polls = self.polls.lock().unwrap();
            polls.push(url.to_string());
            polls.iter().filter(|u| *u == url).count() as u32
        };
        match self.succeed_on.get(url) {
            Some(&n) if attempt >= n => Ok(()),
            _ => Err("connection refused".to_string()),
        }
    }
}

struct FakeInspector {
    container: Option<&'static str>,
    written: Arc<Mutex<Vec<InspectionReport>>>,
}

#[async_trait]
impl EnvironmentInspector for FakeInspector {
    async fn locate_running_container(&self, image_ref: &str) -> Result<ContainerId> {
        self.container
            .map(|id| ContainerId(id.to_string()))
            .ok_or_else(|| StackError::ContainerNotFound {
                image: image_ref.to_string(),
            })
    }

    async fn inspect(&self, image_ref: &str) -> Result<InspectionReport> {
        Ok(InspectionReport {
            image_ref: image_ref.to_string(),
            container_id: None,
            tags: vec![image_ref.to_string()],
            created_at: Utc::now(),
            os: "linux".to_string(),
            exposed_ports: BTreeSet::from(["5000/tcp".to_string()]),
            inspected_at: Utc::now(),
        })
    }

    async fn write_report(&self, report: &InspectionReport) -> Result<String> {
        self.written.lock().unwrap().push(report.clone());
        Ok("reports/image-inspection.json".to_string())
    }
}

const BACKEND_URL: &str = "http://localhost:5000/status";
const EDGE_URL: &str = "http://localhost:80/";

fn shop_plan() -> DeploymentPlan {
    DeploymentPlan::new(
        "shop",
        vec![
            ServiceSpec::new("backend", BACKEND_URL).with_port(5000),
            ServiceSpec::new("edge", EDGE_URL)
                .with_port(80)
                .with_dependency("backend"),
        ],
    )
}

fn preflight(busy_ports: &[u16]) -> PreflightChecker {
    PreflightChecker::new(
        Box::new(FakeTools(HashSet::from(["docker".to_string()]))),
        Box::new(FakeListeners(busy_ports.iter().copied().collect())),
    )
}

fn verifier(probe: Arc<dyn HealthProbe>) -> ReadinessVerifier {
    ReadinessVerifier::new(probe, RetryPolicy::default())
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_healthy_deployment() -> anyhow::Result<()> {
    let probe = Arc::new(ScriptedProbe::new(&[(BACKEND_URL, 1), (EDGE_URL, 3)]));
    let launcher = RecordingLauncher::default();
    let written = Arc::new(Mutex::new(Vec::new()));

    let orchestrator = Orchestrator::new(
        shop_plan(),
        "docker-compose.yml",
        preflight(&[]),
        Box::new(launcher.clone()),
        verifier(probe.clone()),
    )
    .with_required_tools(vec!["docker".to_string()])
    .with_inspection(
        "node:18-alpine",
        Box::new(FakeInspector {
            container: Some("3f2a9c1d"),
            written: written.clone(),
        }),
    )
    .with_monitoring(true);

    let outcome = orchestrator.run().await;

    assert_eq!(
        outcome.trace,
        vec![
            OrchestratorState::Init,
            OrchestratorState::ToolsChecked,
            OrchestratorState::PortsChecked,
            OrchestratorState::Launched,
            OrchestratorState::Verified,
            OrchestratorState::Inspected,
            OrchestratorState::Done,
        ]
    );
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);

    let sampled: Vec<&OrchestratorState> =
        outcome.phase_samples.iter().map(|s| &s.state).collect();
    assert_eq!(sampled, outcome.trace[1..].iter().collect::<Vec<_>>());

    let attempts: Vec<(&str, u32)> = outcome
        .health_results
        .iter()
        .map(|r| (r.service.as_str(), r.attempts))
        .collect();
    assert_eq!(attempts, vec![("backend", 1), ("edge", 3)]);
    assert!(outcome.health_results.iter().all(|r| r.succeeded));

    let report = outcome
        .report
        .ok_or_else(|| anyhow::anyhow!("inspection report missing"))?;
    assert_eq!(report.container_id.as_deref(), Some("3f2a9c1d"));
    assert_eq!(written.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_bound_port_fails_before_launch() {
    let probe = Arc::new(ScriptedProbe::default());

    let orchestrator = Orchestrator::new(
        shop_plan(),
        "docker-compose.yml",
        preflight(&[5000]),
        Box::new(ForbiddenLauncher),
        verifier(probe.clone()),
    )
    .with_required_tools(vec!["docker".to_string()]);

    let outcome = orchestrator.run().await;

    assert!(matches!(outcome.error, Some(StackError::PortInUse { port: 5000 })));
    assert!(matches!(outcome.final_state(), OrchestratorState::Failed(_)));
    assert_eq!(
        outcome.trace[..2],
        [OrchestratorState::Init, OrchestratorState::ToolsChecked]
    );
    assert_ne!(outcome.exit_code(), 0);
    assert!(probe.polls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_tool_fails_first() {
    let orchestrator = Orchestrator::new(
        shop_plan(),
        "docker-compose.yml",
        preflight(&[]),
        Box::new(ForbiddenLauncher),
        verifier(Arc::new(ScriptedProbe::default())),
    )
    .with_required_tools(vec!["docker".to_string(), "curl".to_string()]);

    let outcome = orchestrator.run().await;

    assert!(matches!(
        outcome.error,
        Some(StackError::MissingTool { ref name }) if name == "curl"
    ));
    assert_eq!(outcome.trace.len(), 2);
    assert_ne!(outcome.exit_code(), 0);
}

#[tokio::test]
async fn test_launch_failure_is_fatal() {
    let probe = Arc::new(ScriptedProbe::default());
    let launcher = RecordingLauncher {
        exit_code: Some(1),
        ..Default::default()
    };

    let outcome = Orchestrator::new(
        shop_plan(),
        "docker-compose.yml",
        preflight(&[]),
        Box::new(launcher.clone()),
        verifier(probe.clone()),
    )
    .run()
    .await;

    assert!(matches!(
        outcome.error,
        Some(StackError::Launch { exit_code: Some(1), .. })
    ));
    assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
    assert!(probe.polls.lock().unwrap().is_empty());
    assert!(!outcome.succeeded());
}

#[tokio::test(start_paused = true)]
async fn test_unready_service_fails_run_and_skips_later_services() {
    let plan = DeploymentPlan::new(
        "ab",
        vec![
            ServiceSpec::new("a", "http://a/status"),
            ServiceSpec::new("b", "http://b/status"),
        ],
    );
    let probe = Arc::new(ScriptedProbe::new(&[("http://b/status", 1)]));
    let written = Arc::new(Mutex::new(Vec::new()));

    let outcome = Orchestrator::new(
        plan,
        "docker-compose.yml",
        preflight(&[]),
        Box::new(RecordingLauncher::default()),
        verifier(probe.clone()),
    )
    .with_inspection(
        "node:18-alpine",
        Box::new(FakeInspector {
            container: Some("3f2a9c1d"),
            written: written.clone(),
        }),
    )
    .run()
    .await;

    assert!(matches!(
        outcome.error,
        Some(StackError::HealthCheckExhausted { ref service, attempts: 15, .. }) if service == "a"
    ));
    assert_eq!(probe.polls_of("http://a/status"), 15);
    assert_eq!(probe.polls_of("http://b/status"), 0);
    assert!(matches!(outcome.final_state(), OrchestratorState::Failed(_)));
    assert!(!outcome.trace.contains(&OrchestratorState::Verified));
    assert!(written.lock().unwrap().is_empty());
    assert_ne!(outcome.exit_code(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_inspection_failure_still_reaches_done() {
    let probe = Arc::new(ScriptedProbe::new(&[(BACKEND_URL, 1), (EDGE_URL, 1)]));

    let outcome = Orchestrator::new(
        shop_plan(),
        "docker-compose.yml",
        preflight(&[]),
        Box::new(RecordingLauncher::default()),
        verifier(probe),
    )
    .with_inspection(
        "node:18-alpine",
        Box::new(FakeInspector {
            container: None,
            written: Arc::new(Mutex::new(Vec::new())),
        }),
    )
    .run()
    .await;

    assert!(outcome.succeeded());
    assert_eq!(outcome.exit_code(), 0);
    assert!(outcome.report.is_none());
    assert!(matches!(
        outcome.inspection_error,
        Some(StackError::ContainerNotFound { .. })
    ));
    assert!(!outcome.trace.contains(&OrchestratorState::Inspected));
    assert_eq!(
        outcome.trace[outcome.trace.len() - 2..],
        [OrchestratorState::Verified, OrchestratorState::Done]
    );
}

#[tokio::test]
async fn test_real_http_endpoints() -> anyhow::Result<()> {
    let server = MockServer::start();
    let backend = server.mock(|when, then| {
        when.method(GET).path("/status");
        then.status(200).body("ok");
    });
    let edge = server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(502);
    });

    let plan = DeploymentPlan::new(
        "shop",
        vec![
            ServiceSpec::new("backend", server.url("/status")),
            ServiceSpec::new("edge", server.url("/")),
        ],
    );
    let probe = HttpHealthProbe::new(Duration::from_secs(2))?;
    let policy = RetryPolicy {
        max_attempts: 3,
        interval: Duration::from_millis(500),
    };

    let outcome = Orchestrator::new(
        plan,
        "docker-compose.yml",
        preflight(&[]),
        Box::new(RecordingLauncher::default()),
        ReadinessVerifier::new(Arc::new(probe), policy),
    )
    .run()
    .await;

    backend.assert_hits(1);
    edge.assert_hits(3);
    match outcome.error {
        Some(StackError::HealthCheckExhausted { service, last_error, .. }) => {
            assert_eq!(service, "edge");
            assert!(last_error.contains("502"), "{}", last_error);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(outcome.health_results.len(), 2);
    assert!(outcome.health_results[0].succeeded);
    assert!(!outcome.health_results[1].succeeded);
    Ok(())
}
