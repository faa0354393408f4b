//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// Values without `$` are returned unchanged. `~` is not expanded.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains('$') {
        return Ok(value.to_owned());
    }

    shellexpand::env(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_is_unchanged() {
        assert_eq!(expand_env("plain", "f").unwrap(), "plain");
    }

    #[test]
    fn test_default_is_used_when_unset() {
        assert_eq!(
            expand_env("${RW_EXPAND_TEST_UNSET:-fallback}", "f").unwrap(),
            "fallback"
        );
    }

    #[test]
    fn test_unset_variable_is_an_error() {
        let err = expand_env("${RW_EXPAND_TEST_UNSET}", "site.name").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Environment variable error in site.name: ${RW_EXPAND_TEST_UNSET} not set"
        );
    }
}
