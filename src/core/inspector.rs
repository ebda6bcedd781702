use crate::adapters::storage::LocalStorage;
use crate::domain::model::{ContainerId, InspectionReport};
use crate::domain::ports::{CommandRunner, EnvironmentInspector, Storage};
use crate::utils::error::{Result, StackError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Subset of `docker image inspect` output that ends up in the report.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ImageDetails {
    #[serde(default)]
    repo_tags: Option<Vec<String>>,
    created: String,
    #[serde(default)]
    os: String,
    #[serde(default)]
    config: Option<ImageConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ImageConfig {
    #[serde(default)]
    exposed_ports: Option<HashMap<String, serde_json::Value>>,
}

/// Queries the container runtime CLI and writes the report to local storage.
pub struct RuntimeInspector {
    runner: Arc<dyn CommandRunner>,
    runtime: String,
    storage: LocalStorage,
    report_file: String,
}

impl RuntimeInspector {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        runtime: impl Into<String>,
        storage: LocalStorage,
        report_file: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            runtime: runtime.into(),
            storage,
            report_file: report_file.into(),
        }
    }

    async fn runtime_command(&self, args: Vec<String>) -> Result<String> {
        let output = self
            .runner
            .run(&self.runtime, &args)
            .await
            .map_err(|e| StackError::Inspection {
                message: format!("cannot run {}: {}", self.runtime, e),
            })?;

        if !output.success() {
            return Err(StackError::Inspection {
                message: format!(
                    "`{} {}` exited with {:?}: {}",
                    self.runtime,
                    args.join(" "),
                    output.exit_code,
                    output.stderr.trim()
                ),
            });
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl EnvironmentInspector for RuntimeInspector {
    async fn locate_running_container(&self, image_ref: &str) -> Result<ContainerId> {
        let stdout = self
            .runtime_command(vec![
                "ps".to_string(),
                "--filter".to_string(),
                format!("ancestor={}", image_ref),
                "--format".to_string(),
                "{{.ID}}".to_string(),
            ])
            .await?;

        first_container_id(&stdout).ok_or_else(|| StackError::ContainerNotFound {
            image: image_ref.to_string(),
        })
    }

    async fn inspect(&self, image_ref: &str) -> Result<InspectionReport> {
        let stdout = self
            .runtime_command(vec![
                "image".to_string(),
                "inspect".to_string(),
                image_ref.to_string(),
            ])
            .await?;
        parse_image_inspect(image_ref, &stdout)
    }

    async fn write_report(&self, report: &InspectionReport) -> Result<String> {
        let json = serde_json::to_string_pretty(report)?;
        self.storage
            .write_file(&self.report_file, json.as_bytes())
            .await?;
        Ok(self.storage.full_path(&self.report_file).display().to_string())
    }
}

pub fn first_container_id(ps_output: &str) -> Option<ContainerId> {
    ps_output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|id| ContainerId(id.to_string()))
}

/// Builds a report from the JSON array printed by `<runtime> image inspect`.
pub fn parse_image_inspect(image_ref: &str, json: &str) -> Result<InspectionReport> {
    let images: Vec<ImageDetails> =
        serde_json::from_str(json).map_err(|e| StackError::Inspection {
            message: format!("unreadable inspect output: {}", e),
        })?;

    let image = images.into_iter().next().ok_or_else(|| StackError::Inspection {
        message: format!("no image data returned for '{}'", image_ref),
    })?;

    let created_at = DateTime::parse_from_rfc3339(&image.created)
        .map_err(|e| StackError::Inspection {
            message: format!("invalid creation time '{}': {}", image.created, e),
        })?
        .with_timezone(&Utc);

    let exposed_ports: BTreeSet<String> = image
        .config
        .and_then(|c| c.exposed_ports)
        .map(|ports| ports.into_keys().collect())
        .unwrap_or_default();

    Ok(InspectionReport {
        image_ref: image_ref.to_string(),
        container_id: None,
        tags: image.repo_tags.unwrap_or_default(),
        created_at,
        os: image.os,
        exposed_ports,
        inspected_at: Utc::now(),
    })
}
