//! Environment variable expansion for configuration strings.
//!
//! Supports:
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default

use crate::ConfigError;

/// Expand environment variable references in a string.
///
/// Returns the original string unchanged if no `${}` patterns are present.
/// Bare `$VAR` syntax is not expanded (only `${VAR}` with braces).
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    // Fast path: no expansion needed
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    let references = braced_references(value);
    if let Some(missing) = references
        .iter()
        .find(|r| !r.has_default && std::env::var_os(r.name).is_none())
    {
        return Err(ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", missing.name),
        });
    }

    let expanded = shellexpand::env_with_context_no_errors(value, |var| {
        // Bare `$VAR` lookups return None and are left as written.
        if references.iter().any(|r| r.name == var) {
            std::env::var(var).ok()
        } else {
            None
        }
    });
    Ok(expanded.into_owned())
}

struct Reference<'a> {
    name: &'a str,
    has_default: bool,
}

/// All `${NAME}` and `${NAME:-default}` references in `value`.
fn braced_references(value: &str) -> Vec<Reference<'_>> {
    let mut references = Vec::new();
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let inner = &after[..end];
        let (name, has_default) = match inner.split_once(":-") {
            Some((name, _)) => (name, true),
            None => (inner, false),
        };
        references.push(Reference { name, has_default });
        rest = &after[end + 1..];
    }
    references
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_simple_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("DIAGEN_EXPAND_SIMPLE", "hello");
        }
        let result = expand_env("${DIAGEN_EXPAND_SIMPLE}", "test.field").unwrap();
        assert_eq!(result, "hello");
        unsafe {
            std::env::remove_var("DIAGEN_EXPAND_SIMPLE");
        }
    }

    #[test]
    fn test_expand_with_default_uses_value() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("DIAGEN_EXPAND_DEFAULT", "hello");
        }
        let result = expand_env("${DIAGEN_EXPAND_DEFAULT:-world}", "test.field").unwrap();
        assert_eq!(result, "hello");
        unsafe {
            std::env::remove_var("DIAGEN_EXPAND_DEFAULT");
        }
    }

    #[test]
    fn test_expand_with_default_uses_default() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("DIAGEN_EXPAND_UNSET");
        }
        let result = expand_env("${DIAGEN_EXPAND_UNSET:-bin/plantuml.jar}", "test.field").unwrap();
        assert_eq!(result, "bin/plantuml.jar");
    }

    #[test]
    fn test_expand_missing_var_error() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("DIAGEN_EXPAND_MISSING");
        }
        let err = expand_env("${DIAGEN_EXPAND_MISSING}", "renderer.jar").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("DIAGEN_EXPAND_MISSING"));
        assert!(err.to_string().contains("renderer.jar"));
    }

    #[test]
    fn test_expand_literal_unchanged() {
        let result = expand_env("literal string", "test.field").unwrap();
        assert_eq!(result, "literal string");
    }

    #[test]
    fn test_expand_embedded_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("DIAGEN_EXPAND_HOME", "/opt/tools");
        }
        let result = expand_env("${DIAGEN_EXPAND_HOME}/plantuml.jar", "renderer.jar").unwrap();
        assert_eq!(result, "/opt/tools/plantuml.jar");
        unsafe {
            std::env::remove_var("DIAGEN_EXPAND_HOME");
        }
    }

    #[test]
    fn test_bare_dollar_not_expanded() {
        let result = expand_env("$HOME", "test.field").unwrap();
        assert_eq!(result, "$HOME");
    }

    #[test]
    fn test_bare_dollar_beside_braced_not_expanded() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("DIAGEN_EXPAND_MIXED", "x");
        }
        let result = expand_env("${DIAGEN_EXPAND_MIXED}/$HOME", "test.field").unwrap();
        assert_eq!(result, "x/$HOME");
        unsafe {
            std::env::remove_var("DIAGEN_EXPAND_MIXED");
        }
    }
}
