use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("Required tool '{name}' was not found")]
    MissingTool { name: String },

    #[error("Port {port} is already in use")]
    PortInUse { port: u16 },

    #[error("Compose launch failed (exit code {}): {stderr}", display_exit_code(.exit_code))]
    Launch {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Service '{service}' was not ready after {attempts} attempts: {last_error}")]
    HealthCheckExhausted {
        service: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Inspection failed: {message}")]
    Inspection { message: String },

    #[error("No running container found for image '{image}'")]
    ContainerNotFound { image: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field '{field}'")]
    MissingConfigError { field: String },
}

fn display_exit_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "none".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Environment,
    Launch,
    Readiness,
    Inspection,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl StackError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            StackError::MissingTool { .. } | StackError::PortInUse { .. } => {
                ErrorCategory::Environment
            }
            StackError::Launch { .. } => ErrorCategory::Launch,
            StackError::HealthCheckExhausted { .. } | StackError::Http(_) => {
                ErrorCategory::Readiness
            }
            StackError::Inspection { .. } | StackError::ContainerNotFound { .. } => {
                ErrorCategory::Inspection
            }
            StackError::ConfigValidationError { .. }
            | StackError::InvalidConfigValueError { .. }
            | StackError::MissingConfigError { .. } => ErrorCategory::Configuration,
            StackError::Io(_) | StackError::Serialization(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Inspection => ErrorSeverity::Low,
            ErrorCategory::Readiness => ErrorSeverity::Medium,
            ErrorCategory::Launch | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Environment | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            StackError::MissingTool { name } => {
                format!("Install '{}' and make sure it is on PATH", name)
            }
            StackError::PortInUse { port } => format!(
                "Stop the process listening on port {} (e.g. `lsof -i :{}`) and retry",
                port, port
            ),
            StackError::Launch { .. } => {
                "Check the compose file and image build output above, then retry".to_string()
            }
            StackError::HealthCheckExhausted { service, .. } => format!(
                "Inspect the logs of '{}' (e.g. `docker compose logs {}`)",
                service, service
            ),
            StackError::Inspection { .. } | StackError::ContainerNotFound { .. } => {
                "Inspection is diagnostic only; verify the configured image name".to_string()
            }
            StackError::Http(_) => "Check network connectivity to the service".to_string(),
            StackError::Io(_) => "Check file permissions and available disk space".to_string(),
            StackError::Serialization(_) => "Report this as a bug".to_string(),
            StackError::ConfigValidationError { field, .. }
            | StackError::InvalidConfigValueError { field, .. }
            | StackError::MissingConfigError { field } => {
                format!("Fix the '{}' entry in the configuration file", field)
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Environment => format!("Preflight check failed: {}", self),
            ErrorCategory::Launch => format!("Could not start the stack: {}", self),
            ErrorCategory::Readiness => format!("Stack did not become healthy: {}", self),
            ErrorCategory::Inspection => format!("Inspection skipped: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, StackError>;
