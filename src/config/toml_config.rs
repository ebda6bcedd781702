use crate::core::readiness::{
    RetryPolicy, DEFAULT_INTERVAL, DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT,
};
use crate::domain::model::{DeploymentPlan, ServiceSpec};
use crate::utils::error::{Result, StackError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub deployment: DeploymentSection,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    pub inspection: Option<InspectionConfig>,
    pub monitoring: Option<MonitoringConfig>,
    pub services: Vec<ServiceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentSection {
    pub name: String,
    pub compose_file: String,
    pub runtime: Option<String>,
    pub required_tools: Option<Vec<String>>,
    pub extra_ports: Option<Vec<u16>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadinessConfig {
    pub max_attempts: Option<u32>,
    pub interval_seconds: Option<u64>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionConfig {
    pub enabled: Option<bool>,
    pub image: String,
    pub report_dir: Option<String>,
    pub report_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub health_url: String,
    pub port: Option<u16>,
    pub depends_on: Option<Vec<String>>,
}

const DEFAULT_RUNTIME: &str = "docker";
const DEFAULT_REPORT_DIR: &str = "./reports";
const DEFAULT_REPORT_FILE: &str = "image-inspection.json";

impl DeploymentConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.resolve_compose_file(path.as_ref());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| StackError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${BACKEND_PORT})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| StackError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// A relative compose file is relative to the config file's directory.
    fn resolve_compose_file(&mut self, config_path: &Path) {
        let compose = Path::new(&self.deployment.compose_file);
        if compose.is_relative() {
            if let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
                self.deployment.compose_file = dir.join(compose).display().to_string();
            }
        }
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_label("deployment.name", &self.deployment.name)?;
        validation::validate_descriptor_path("deployment.compose_file", &self.deployment.compose_file)?;

        if let Some(runtime) = &self.deployment.runtime {
            validation::validate_name("deployment.runtime", runtime)?;
        }
        if let Some(tools) = &self.deployment.required_tools {
            for tool in tools {
                validation::validate_name("deployment.required_tools", tool)?;
            }
        }

        if let Some(attempts) = self.readiness.max_attempts {
            validation::validate_attempts("readiness.max_attempts", attempts)?;
        }
        if let Some(interval) = self.readiness.interval_seconds {
            validation::validate_wait_seconds("readiness.interval_seconds", interval, 0)?;
        }
        if let Some(timeout) = self.readiness.request_timeout_seconds {
            validation::validate_wait_seconds("readiness.request_timeout_seconds", timeout, 1)?;
        }
        let interval = self.retry_policy().interval;
        if !interval.is_zero() && self.request_timeout() > interval {
            tracing::warn!(
                "⚠️ request timeout {:?} exceeds the retry interval {:?}; attempts are cut off at the interval",
                self.request_timeout(),
                interval
            );
        }

        if let Some(inspection) = &self.inspection {
            validation::validate_label("inspection.image", &inspection.image)?;
            if let Some(dir) = &inspection.report_dir {
                validation::validate_report_dir("inspection.report_dir", dir)?;
            }
            if let Some(file) = &inspection.report_file {
                validation::validate_report_file("inspection.report_file", file)?;
            }
        }

        if self.services.is_empty() {
            return Err(StackError::MissingConfigError {
                field: "services".to_string(),
            });
        }

        let mut names = HashSet::new();
        let mut ports: HashMap<u16, &str> = HashMap::new();
        for service in &self.services {
            validation::validate_name("services.name", &service.name)?;
            let polled_port = validation::validate_health_url(
                &format!("services.{}.health_url", service.name),
                &service.health_url,
            )?;
            if let Some(port) = service.port.filter(|p| *p != polled_port) {
                tracing::warn!(
                    "⚠️ {} reserves port {} but its health endpoint is on port {}",
                    service.name,
                    port,
                    polled_port
                );
            }

            if !names.insert(service.name.as_str()) {
                return Err(StackError::ConfigValidationError {
                    field: "services".to_string(),
                    message: format!("Service '{}' is defined more than once", service.name),
                });
            }
            if let Some(port) = service.port {
                if let Some(owner) = ports.insert(port, &service.name) {
                    return Err(StackError::ConfigValidationError {
                        field: format!("services.{}.port", service.name),
                        message: format!("Port {} is already claimed by '{}'", port, owner),
                    });
                }
            }
        }

        self.validate_dependencies()
    }

    /// Services are verified in file order, so every dependency must be
    /// declared before its dependent.
    fn validate_dependencies(&self) -> Result<()> {
        let position: HashMap<&str, usize> = self
            .services
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.as_str(), i))
            .collect();

        for (index, service) in self.services.iter().enumerate() {
            for dep in service.depends_on.iter().flatten() {
                match position.get(dep.as_str()) {
                    None => {
                        return Err(StackError::ConfigValidationError {
                            field: format!("services.{}.depends_on", service.name),
                            message: format!("Dependency service '{}' not found", dep),
                        })
                    }
                    Some(&dep_index) if dep_index >= index => {
                        let message = if self.has_circular_dependency(&service.name) {
                            "Circular dependency detected in service configuration".to_string()
                        } else {
                            format!(
                                "'{}' must be listed before '{}', which depends on it",
                                dep, service.name
                            )
                        };
                        return Err(StackError::ConfigValidationError {
                            field: format!("services.{}.depends_on", service.name),
                            message,
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(())
    }

    fn has_circular_dependency(&self, start: &str) -> bool {
        let mut visited = HashSet::new();
        let mut stack: Vec<&str> = self.dependencies_of(start);

        while let Some(name) = stack.pop() {
            if name == start {
                return true;
            }
            if visited.insert(name) {
                stack.extend(self.dependencies_of(name));
            }
        }
        false
    }

    fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.services
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| s.depends_on.as_ref())
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn deployment_plan(&self) -> DeploymentPlan {
        let services = self
            .services
            .iter()
            .map(|s| ServiceSpec {
                name: s.name.clone(),
                health_url: s.health_url.clone(),
                required_port: s.port,
                depends_on: s.depends_on.clone().unwrap_or_default(),
            })
            .collect();

        DeploymentPlan::new(self.deployment.name.clone(), services)
            .with_extra_ports(self.deployment.extra_ports.clone().unwrap_or_default())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.readiness.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            interval: self
                .readiness
                .interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_INTERVAL),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.readiness
            .request_timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn runtime(&self) -> &str {
        self.deployment.runtime.as_deref().unwrap_or(DEFAULT_RUNTIME)
    }

    /// Defaults to the container runtime alone.
    pub fn required_tools(&self) -> Vec<String> {
        self.deployment
            .required_tools
            .clone()
            .unwrap_or_else(|| vec![self.runtime().to_string()])
    }

    pub fn compose_file(&self) -> PathBuf {
        PathBuf::from(&self.deployment.compose_file)
    }

    pub fn inspection_enabled(&self) -> bool {
        self.inspection
            .as_ref()
            .map(|i| i.enabled.unwrap_or(true))
            .unwrap_or(false)
    }

    pub fn report_dir(&self) -> &str {
        self.inspection
            .as_ref()
            .and_then(|i| i.report_dir.as_deref())
            .unwrap_or(DEFAULT_REPORT_DIR)
    }

    pub fn report_file(&self) -> &str {
        self.inspection
            .as_ref()
            .and_then(|i| i.report_file.as_deref())
            .unwrap_or(DEFAULT_REPORT_FILE)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for DeploymentConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
