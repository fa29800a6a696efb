use thiserror::Error;

/// Top-level error type for the Switchboard registry.
#[derive(Debug, Error)]
pub enum SwitchboardError {
    #[error("plugin '{name}' was created for a different manager")]
    ForeignPlugin { name: String },

    #[error("the plugin manager owning this plugin has been dropped")]
    ManagerDropped,
}

pub type Result<T, E = SwitchboardError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_plugin_message_names_plugin() {
        let err = SwitchboardError::ForeignPlugin { name: "echo".into() };
        assert_eq!(
            err.to_string(),
            "plugin 'echo' was created for a different manager"
        );
    }

    #[test]
    fn test_manager_dropped_converts_into_anyhow() {
        let err: anyhow::Error = SwitchboardError::ManagerDropped.into();
        assert!(err.downcast_ref::<SwitchboardError>().is_some());
        assert!(err.to_string().contains("has been dropped"));
    }
}
