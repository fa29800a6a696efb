//! `switchboard-config`: runtime configuration for the plugin registry.
//!
//! Provides:
//! - Typed config schema (logging, dispatch)
//! - YAML read/write with atomic replace
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with warnings and errors

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::{apply_all_defaults, DEFAULT_LOG_LEVEL};
pub use env::{collect_referenced_vars, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, write_config};
pub use schema::{DispatchConfig, LoggingConfig, SwitchboardConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

/// Load a config file, apply env substitution and defaults, then validate.
///
/// This is the main entry point for loading a config at runtime. Validation
/// warnings are logged; any validation error fails the load.
pub async fn load_and_prepare(path: &Path) -> Result<SwitchboardConfig> {
    let raw_config = load_config(path).await?;

    let value: Value = serde_json::to_value(&raw_config)
        .context("Failed to serialize config for processing")?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;

    let config: SwitchboardConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        bail!(
            "{} config error(s) in {}; first: {}",
            report.errors.len(),
            path.display(),
            report.errors[0]
        );
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::FaultPolicy;
    use tokio::fs;

    async fn write_raw(name: &str, body: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("switchboard-prepare-{}-{name}", std::process::id()));
        fs::create_dir_all(&dir).await.unwrap();
        let path = config_file_path(&dir);
        fs::write(&path, body).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_prepare_applies_defaults() {
        let path = write_raw("defaults", "dispatch:\n  faultPolicy: isolate\n").await;
        let cfg = load_and_prepare(&path).await.unwrap();
        assert_eq!(cfg.log_level(), "info");
        assert_eq!(cfg.dispatch_options().fault_policy, FaultPolicy::Isolate);
        assert_eq!(cfg.logging.unwrap().json, Some(false));
    }

    #[tokio::test]
    async fn test_prepare_rejects_invalid_level() {
        let path = write_raw("invalid", "logging:\n  level: shouty\n").await;
        let err = load_and_prepare(&path).await.unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[tokio::test]
    async fn test_prepare_reports_missing_env_var() {
        let path = write_raw(
            "env",
            "logging:\n  dir: ${SWITCHBOARD_TEST_SURELY_UNSET_DIR}\n",
        )
        .await;
        let err = load_and_prepare(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("SWITCHBOARD_TEST_SURELY_UNSET_DIR"));
    }
}
