//! Config file read/write.

use crate::schema::SwitchboardConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "switchboard.yaml";

/// Resolve the config directory: `SWITCHBOARD_CONFIG_DIR`, else `~/.switchboard`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SWITCHBOARD_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".switchboard"))
        .unwrap_or_else(|| PathBuf::from(".switchboard"))
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Load and parse the config from disk.
///
/// A missing file is not an error; it yields an empty config.
pub async fn load_config(path: &Path) -> Result<SwitchboardConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(SwitchboardConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    // An empty file parses to YAML null.
    if raw.trim().is_empty() {
        return Ok(SwitchboardConfig::default());
    }

    let config: SwitchboardConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Write config to disk atomically (temp file, then rename).
pub async fn write_config(config: &SwitchboardConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create config directory: {}", parent.display())
        })?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    let tmp_path = path.with_extension("yaml.tmp");
    fs::write(&tmp_path, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp config: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to rename temp config to: {}", path.display()))?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DispatchConfig, LoggingConfig};
    use switchboard_core::FaultPolicy;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("switchboard-config-{}-{name}", std::process::id()))
            .join(CONFIG_FILE_NAME)
    }

    #[tokio::test]
    async fn test_missing_file_yields_default() {
        let cfg = load_config(&scratch("missing")).await.unwrap();
        assert_eq!(cfg, SwitchboardConfig::default());
    }

    #[tokio::test]
    async fn test_write_then_load() {
        let path = scratch("roundtrip");
        let cfg = SwitchboardConfig {
            logging: Some(LoggingConfig {
                level: Some("debug".into()),
                ..Default::default()
            }),
            dispatch: Some(DispatchConfig {
                fault_policy: Some(FaultPolicy::Propagate),
                trace_invocations: None,
            }),
        };
        write_config(&cfg, &path).await.unwrap();
        assert!(!path.with_extension("yaml.tmp").exists());

        let loaded = load_config(&path).await.unwrap();
        assert_eq!(loaded, cfg);
    }

    #[tokio::test]
    async fn test_invalid_yaml_names_file() {
        let path = scratch("invalid");
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(&path, "dispatch: [not, a, map]").await.unwrap();
        let err = load_config(&path).await.unwrap_err();
        assert!(err.to_string().contains("switchboard.yaml"));
    }

    #[test]
    fn test_config_file_path_joins_name() {
        let p = config_file_path(Path::new("/etc/switchboard"));
        assert_eq!(p, PathBuf::from("/etc/switchboard/switchboard.yaml"));
    }
}
