//! Config validation: collects every problem in one pass.

use crate::schema::SwitchboardConfig;
use switchboard_core::FaultPolicy;
use thiserror::Error;

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &SwitchboardConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_logging(config, &mut report);
    validate_dispatch(config, &mut report);
    report
}

/// A bare word must be a known level. Anything with `=` or `,` is treated as
/// an `EnvFilter` directive and left to the subscriber to parse.
fn is_level_or_directive(level: &str) -> bool {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        return true;
    }
    LEVELS.contains(&level.to_ascii_lowercase().as_str())
}

fn validate_logging(config: &SwitchboardConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };
    if let Some(level) = &logging.level {
        if !is_level_or_directive(level) {
            report.error(
                "logging.level",
                format!("Unknown log level '{level}'. Use one of {}", LEVELS.join(", ")),
            );
        }
    }
    if let Some(dir) = &logging.dir {
        if dir.as_os_str().is_empty() {
            report.error("logging.dir", "Log directory cannot be empty; omit it for console only");
        }
    }
}

fn validate_dispatch(config: &SwitchboardConfig, report: &mut ValidationReport) {
    let Some(dispatch) = &config.dispatch else { return };
    if dispatch.fault_policy == Some(FaultPolicy::Propagate) {
        report.warn(
            "dispatch.faultPolicy",
            "A panicking handler will abort delivery to every later handler",
        );
    }
    if dispatch.trace_invocations == Some(true) {
        let verbose = matches!(config.log_level().trim(), "trace" | "debug");
        if !verbose {
            report.warn(
                "dispatch.traceInvocations",
                "Invocation traces are emitted at debug level and will be filtered out",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::apply_all_defaults;
    use crate::schema::{DispatchConfig, LoggingConfig};
    use std::path::PathBuf;

    #[test]
    fn defaulted_config_is_valid() {
        let report = validate(&apply_all_defaults(SwitchboardConfig::default()));
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn unknown_level_is_error() {
        let cfg = SwitchboardConfig {
            logging: Some(LoggingConfig {
                level: Some("loud".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "logging.level");
    }

    #[test]
    fn directive_level_is_accepted() {
        let cfg = SwitchboardConfig {
            logging: Some(LoggingConfig {
                level: Some("info,switchboard_plugins=trace".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(validate(&cfg).is_valid());
    }

    #[test]
    fn empty_dir_is_error() {
        let cfg = SwitchboardConfig {
            logging: Some(LoggingConfig {
                dir: Some(PathBuf::new()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(report.errors.iter().any(|e| e.path == "logging.dir"));
    }

    #[test]
    fn propagate_and_quiet_tracing_warn() {
        let cfg = SwitchboardConfig {
            dispatch: Some(DispatchConfig {
                fault_policy: Some(FaultPolicy::Propagate),
                trace_invocations: Some(true),
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(report.is_valid());
        let paths: Vec<_> = report.warnings.iter().map(|w| w.path.as_str()).collect();
        assert_eq!(paths, ["dispatch.faultPolicy", "dispatch.traceInvocations"]);
    }
}
