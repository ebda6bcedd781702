use crate::utils::error::{Result, StackError};
use regex::Regex;
use std::path::{Component, Path};
use url::Url;

/// Longest interval or request timeout accepted from configuration.
pub const MAX_WAIT_SECONDS: u64 = 300;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> StackError {
    StackError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Free-form label such as the deployment name.
pub fn validate_label(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, value, "Value cannot be empty or whitespace-only"));
    }
    Ok(())
}

/// Compose service names and executable names: no spaces, no path separators.
pub fn validate_name(field: &str, value: &str) -> Result<()> {
    let re = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").map_err(|e| {
        StackError::ConfigValidationError {
            field: field.to_string(),
            message: e.to_string(),
        }
    })?;

    if !re.is_match(value) {
        return Err(invalid(
            field,
            value,
            "Names must start with a letter or digit and contain only letters, digits, '.', '_' or '-'",
        ));
    }
    Ok(())
}

/// Checks that a health endpoint is an absolute http(s) URL with a host and
/// returns the TCP port it will be polled on.
pub fn validate_health_url(field: &str, url_str: &str) -> Result<u16> {
    if url_str.is_empty() {
        return Err(invalid(field, url_str, "URL cannot be empty"));
    }

    let url = Url::parse(url_str).map_err(|e| invalid(field, url_str, format!("Invalid URL format: {}", e)))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(invalid(
                field,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            ))
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid(field, url_str, "URL has no host"));
    }

    url.port_or_known_default()
        .ok_or_else(|| invalid(field, url_str, "URL has no port"))
}

fn validate_fs_path(field: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field, path, "Path cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field, path, "Path contains null bytes"));
    }
    Ok(())
}

/// The compose descriptor must name a file, not a directory.
pub fn validate_descriptor_path(field: &str, path: &str) -> Result<()> {
    validate_fs_path(field, path)?;
    if path.ends_with('/') || Path::new(path).file_name().is_none() {
        return Err(invalid(field, path, "Path must name a compose file"));
    }
    Ok(())
}

pub fn validate_report_dir(field: &str, path: &str) -> Result<()> {
    validate_fs_path(field, path)
}

/// Report files live directly inside the report directory.
pub fn validate_report_file(field: &str, name: &str) -> Result<()> {
    validate_fs_path(field, name)?;
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid(
            field,
            name,
            "Report file must be a plain file name inside the report directory",
        )),
    }
}

pub fn validate_attempts(field: &str, attempts: u32) -> Result<()> {
    if attempts == 0 {
        return Err(invalid(field, attempts, "At least one attempt is required"));
    }
    Ok(())
}

pub fn validate_wait_seconds(field: &str, seconds: u64, min: u64) -> Result<()> {
    if seconds < min || seconds > MAX_WAIT_SECONDS {
        return Err(invalid(
            field,
            seconds,
            format!("Value must be between {} and {} seconds", min, MAX_WAIT_SECONDS),
        ));
    }
    Ok(())
}
