//! Environment configuration helpers
//!
//! Thin wrappers over `std::env` used by the binary to build typed configs.
//! Unparseable values fall back to the default with a warning instead of
//! aborting startup; required values go through [`env_required`].

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// Raw string value, treating empty strings as unset
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env_opt(key).ok_or_else(|| ConfigError::Missing(key.to_string()))
}

/// Parse a value, falling back to `default` when unset or invalid
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => parse_or_default(key, &raw, default),
        None => default,
    }
}

/// Comma separated list, blank items dropped
pub fn env_list(key: &str) -> Vec<String> {
    env_opt(key).map(|raw| split_list(&raw)).unwrap_or_default()
}

/// `1/true/yes/on` and `0/false/no/off`, case-insensitive
pub fn env_bool(key: &str, default: bool) -> bool {
    match env_opt(key) {
        Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
            tracing::warn!(key, value = %raw, "Invalid boolean, using default");
            default
        }),
        None => default,
    }
}

fn parse_or_default<T>(key: &str, raw: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw.parse::<T>() {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "Invalid value, using default");
            default
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("http://a.test, ,http://b.test,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_parse_or_default() {
        assert_eq!(parse_or_default::<u16>("PORT", "8080", 1), 8080);
        assert_eq!(parse_or_default::<u16>("PORT", "not-a-port", 1), 1);
    }

    #[test]
    fn test_missing_required_variable() {
        let err = env_required("CREDENTIAL_MARKETPLACE_SURELY_UNSET_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }
}
