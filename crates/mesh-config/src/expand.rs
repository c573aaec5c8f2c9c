//! Environment and home-directory expansion for string settings.

use crate::ConfigError;

/// Expand `$VAR`, `${VAR}` and `${VAR:-default}` references.
///
/// `field` names the setting in error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} {}", e.var_name, e.cause),
        })
}

/// Like [`expand_env`], and also expands a leading `~`.
pub(crate) fn expand_path(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::full(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} {}", e.var_name, e.cause),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_literal() {
        assert_eq!(expand_env("127.0.0.1", "server.host").unwrap(), "127.0.0.1");
    }

    #[test]
    fn test_expand_env_default_value() {
        let value = expand_env("${MESH_EXPAND_UNSET_VAR:-fallback}", "server.host").unwrap();
        assert_eq!(value, "fallback");
    }

    #[test]
    fn test_expand_env_missing_var_names_field() {
        let err = expand_env("${MESH_EXPAND_MISSING_VAR}", "cache.dir").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("cache.dir"), "{msg}");
        assert!(msg.contains("MESH_EXPAND_MISSING_VAR"), "{msg}");
    }
}
