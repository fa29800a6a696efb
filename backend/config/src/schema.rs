//! Switchboard runtime configuration schema.
//!
//! Every field is optional in the file; `defaults::apply_all_defaults` fills
//! the gaps after loading.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use switchboard_core::{DispatchOptions, FaultPolicy};

use crate::defaults::DEFAULT_LOG_LEVEL;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchboardConfig {
    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    /// Handler dispatch behaviour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<DispatchConfig>,
}

impl SwitchboardConfig {
    /// Options to build a `PluginManager` with.
    pub fn dispatch_options(&self) -> DispatchOptions {
        let dispatch = self.dispatch.as_ref();
        DispatchOptions {
            fault_policy: dispatch.and_then(|d| d.fault_policy).unwrap_or_default(),
            trace_invocations: dispatch.and_then(|d| d.trace_invocations).unwrap_or(false),
        }
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Level or `EnvFilter` directive; `RUST_LOG` overrides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for the rolling NDJSON log. Console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault_policy: Option<FaultPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_invocations: Option<bool>,
}
