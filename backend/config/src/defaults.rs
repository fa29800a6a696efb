//! Config defaults: fills unset fields after parsing.

use switchboard_core::FaultPolicy;

use crate::schema::{DispatchConfig, LoggingConfig, SwitchboardConfig};

/// Default log level when neither the file nor `RUST_LOG` sets one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: SwitchboardConfig) -> SwitchboardConfig {
    let config = apply_logging_defaults(config);
    apply_dispatch_defaults(config)
}

fn apply_logging_defaults(mut config: SwitchboardConfig) -> SwitchboardConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    if logging.json.is_none() {
        logging.json = Some(false);
    }
    config
}

fn apply_dispatch_defaults(mut config: SwitchboardConfig) -> SwitchboardConfig {
    let dispatch = config.dispatch.get_or_insert_with(DispatchConfig::default);
    if dispatch.fault_policy.is_none() {
        dispatch.fault_policy = Some(FaultPolicy::Isolate);
    }
    if dispatch.trace_invocations.is_none() {
        dispatch.trace_invocations = Some(false);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_section() {
        let cfg = apply_all_defaults(SwitchboardConfig::default());
        let logging = cfg.logging.unwrap();
        assert_eq!(logging.level.as_deref(), Some("info"));
        assert_eq!(logging.json, Some(false));
        assert!(logging.dir.is_none());
        let dispatch = cfg.dispatch.unwrap();
        assert_eq!(dispatch.fault_policy, Some(FaultPolicy::Isolate));
        assert_eq!(dispatch.trace_invocations, Some(false));
    }

    #[test]
    fn keeps_explicit_values() {
        let cfg = SwitchboardConfig {
            dispatch: Some(DispatchConfig {
                fault_policy: Some(FaultPolicy::Propagate),
                trace_invocations: None,
            }),
            ..Default::default()
        };
        let cfg = apply_all_defaults(cfg);
        assert_eq!(
            cfg.dispatch.unwrap().fault_policy,
            Some(FaultPolicy::Propagate)
        );
    }
}
