// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as workspace-relative paths and positive limits.

use std::path::{Component, Path};

use crate::diagnostic::ConfigError;
use crate::model::MediaHookConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &MediaHookConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    check_workspace_relative(&mut errors, "workspace.upload_dir", &config.workspace.upload_dir);
    check_workspace_relative(&mut errors, "workspace.queue_file", &config.workspace.queue_file);

    if config.download.max_file_size_mb == 0 {
        errors.push(ConfigError::Validation {
            message: "download.max_file_size_mb must be greater than 0".to_string(),
        });
    }
    if config.download.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "download.timeout_secs must be greater than 0".to_string(),
        });
    }
    if config.download.max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "download.max_attempts must be at least 1".to_string(),
        });
    }
    if config.telegram.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "telegram.request_timeout_secs must be greater than 0".to_string(),
        });
    }
    if config.worker.idle_poll_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "worker.idle_poll_secs must be greater than 0".to_string(),
        });
    }

    let base = config.telegram.api_base_url.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        errors.push(ConfigError::Validation {
            message: format!("telegram.api_base_url `{base}` must be an http(s) URL"),
        });
    }

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if !LOG_LEVELS.contains(&config.log.level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "log.level `{}` must be one of: {}",
                config.log.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Paths stored in the queue are workspace-relative, so these may not escape it.
fn check_workspace_relative(errors: &mut Vec<ConfigError>, key: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: format!("{key} must not be empty"),
        });
        return;
    }
    let path = Path::new(value);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        errors.push(ConfigError::Validation {
            message: format!("{key} `{value}` must be a relative path inside the workspace"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = MediaHookConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn absolute_upload_dir_fails_validation() {
        let mut config = MediaHookConfig::default();
        config.workspace.upload_dir = "/tmp/uploads".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("workspace.upload_dir"));
    }

    #[test]
    fn parent_dir_queue_file_fails_validation() {
        let mut config = MediaHookConfig::default();
        config.workspace.queue_file = "../queue.json".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("workspace.queue_file"));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = MediaHookConfig::default();
        config.download.max_file_size_mb = 0;
        config.download.max_attempts = 0;
        config.log.level = "loud".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn invalid_host_fails_validation() {
        let mut config = MediaHookConfig::default();
        config.server.host = "not a host!".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("server.host"));
    }

    #[test]
    fn non_http_base_url_fails_validation() {
        let mut config = MediaHookConfig::default();
        config.telegram.api_base_url = "ftp://example".to_string();
        assert!(validate_config(&config).is_err());
    }
}
