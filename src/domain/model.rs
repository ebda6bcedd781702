use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One service of the stack, identified by its health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    pub health_url: String,
    pub required_port: Option<u16>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl ServiceSpec {
    pub fn new(name: impl Into<String>, health_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            health_url: health_url.into(),
            required_port: None,
            depends_on: Vec::new(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.required_port = Some(port);
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }
}

/// Services in dependency order: infrastructure first, edge-facing last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    pub name: String,
    pub services: Vec<ServiceSpec>,
    /// Ports bound by the stack that no health-checked service owns.
    #[serde(default)]
    pub extra_ports: Vec<u16>,
}

impl DeploymentPlan {
    pub fn new(name: impl Into<String>, services: Vec<ServiceSpec>) -> Self {
        Self {
            name: name.into(),
            services,
            extra_ports: Vec::new(),
        }
    }

    pub fn with_extra_ports(mut self, ports: Vec<u16>) -> Self {
        self.extra_ports = ports;
        self
    }

    pub fn required_ports(&self) -> BTreeSet<u16> {
        self.services
            .iter()
            .filter_map(|s| s.required_port)
            .chain(self.extra_ports.iter().copied())
            .collect()
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortCheckResult {
    pub port: u16,
    pub free: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheckResult {
    pub service: String,
    pub attempts: u32,
    pub succeeded: bool,
    pub last_error: Option<String>,
}

/// Metadata of the base image, captured after the stack is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionReport {
    pub image_ref: String,
    pub container_id: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub os: String,
    pub exposed_ports: BTreeSet<String>,
    pub inspected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerId(pub String);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the compose tool is invoked on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeBackend {
    /// Legacy standalone binary, e.g. `docker-compose`.
    Standalone { program: String },
    /// Subcommand of the container runtime, e.g. `docker compose`.
    Plugin { program: String },
}

impl ComposeBackend {
    pub fn program(&self) -> &str {
        match self {
            ComposeBackend::Standalone { program } | ComposeBackend::Plugin { program } => program,
        }
    }

    /// Arguments that precede every compose subcommand.
    pub fn base_args(&self) -> Vec<String> {
        match self {
            ComposeBackend::Standalone { .. } => Vec::new(),
            ComposeBackend::Plugin { .. } => vec!["compose".to_string()],
        }
    }

    /// Full argument list for `<compose> <args...>`.
    pub fn command_args<I, S>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut all = self.base_args();
        all.extend(args.into_iter().map(Into::into));
        all
    }
}

impl fmt::Display for ComposeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeBackend::Standalone { program } => write!(f, "{}", program),
            ComposeBackend::Plugin { program } => write!(f, "{} compose", program),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorState {
    Init,
    ToolsChecked,
    PortsChecked,
    Launched,
    Verified,
    Inspected,
    Done,
    Failed(String),
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorState::Init => f.write_str("Init"),
            OrchestratorState::ToolsChecked => f.write_str("ToolsChecked"),
            OrchestratorState::PortsChecked => f.write_str("PortsChecked"),
            OrchestratorState::Launched => f.write_str("Launched"),
            OrchestratorState::Verified => f.write_str("Verified"),
            OrchestratorState::Inspected => f.write_str("Inspected"),
            OrchestratorState::Done => f.write_str("Done"),
            OrchestratorState::Failed(reason) => write!(f, "Failed({})", reason),
        }
    }
}

/// Captured output of an external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}
