//! Display Name Value Object
//!
//! Human readable name shown on applications, messages and credential views.
//! Normalised with NFKC and whitespace-collapsed; unlike emails it is not
//! unique.

use std::fmt;

use kernel::error::app_error::{AppError, AppResult};
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

pub const DISPLAY_NAME_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(raw: impl AsRef<str>) -> AppResult<Self> {
        let normalized: String = raw.as_ref().nfkc().collect();
        let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

        if collapsed.is_empty() {
            return Err(AppError::bad_request("Display name cannot be empty"));
        }
        if collapsed.chars().count() > DISPLAY_NAME_MAX_CHARS {
            return Err(AppError::bad_request(format!(
                "Display name must be at most {} characters",
                DISPLAY_NAME_MAX_CHARS
            )));
        }
        if collapsed.chars().any(char::is_control) {
            return Err(AppError::bad_request("Display name contains control characters"));
        }

        Ok(Self(collapsed))
    }

    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_normalization() {
        let name = DisplayName::new("  Ｈａｎａｋｏ   Yamada ").unwrap();
        assert_eq!(name.as_str(), "Hanako Yamada");
    }

    #[test]
    fn test_display_name_invalid() {
        assert!(DisplayName::new("   ").is_err());
        assert!(DisplayName::new("a".repeat(DISPLAY_NAME_MAX_CHARS + 1)).is_err());
    }
}
