//! Input validation for source identifiers and configuration values.
//!
//! Table names reach DataFusion as identifiers and index patterns select
//! registered tables, so both are checked before any data is touched.
//! Numeric configuration values are checked when a config is validated.

use crate::error::{Result, RiskError};
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum accepted identifier length.
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// SQL identifier validation.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates a table identifier (optionally schema-qualified).
    ///
    /// # Examples
    /// ```rust
    /// use riskgate::security::SqlSecurity;
    ///
    /// assert!(SqlSecurity::validate_identifier("auth_events").is_ok());
    /// assert!(SqlSecurity::validate_identifier("public.auth_events").is_ok());
    /// assert!(SqlSecurity::validate_identifier("events; DROP TABLE users--").is_err());
    /// ```
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.trim().is_empty() {
            return Err(RiskError::SecurityError(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }

        if identifier.len() > MAX_IDENTIFIER_LENGTH {
            return Err(RiskError::SecurityError(format!(
                "SQL identifier too long (max {MAX_IDENTIFIER_LENGTH} characters)"
            )));
        }

        InputValidator::validate_no_null_bytes(identifier, "SQL identifier")?;

        static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
            #[allow(clippy::expect_used)]
            Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*$")
                .expect("Hard-coded regex pattern should be valid")
        });

        if !IDENTIFIER_REGEX.is_match(identifier) {
            return Err(RiskError::SecurityError(format!(
                "Invalid SQL identifier format: '{identifier}'. Identifiers must start with a letter or underscore and contain only letters, numbers, underscores, and dots"
            )));
        }

        Self::check_dangerous_patterns(identifier)
    }

    /// Validates an index glob used to select registered tables.
    ///
    /// Besides the identifier characters, `*`, `?` and `[...]` classes are allowed.
    pub fn validate_index_pattern(pattern: &str) -> Result<()> {
        if pattern.trim().is_empty() {
            return Err(RiskError::SecurityError(
                "Index pattern cannot be empty".to_string(),
            ));
        }
        InputValidator::validate_string_length(pattern, MAX_IDENTIFIER_LENGTH, "Index pattern")?;
        InputValidator::validate_no_null_bytes(pattern, "Index pattern")?;

        static PATTERN_REGEX: Lazy<Regex> = Lazy::new(|| {
            #[allow(clippy::expect_used)]
            Regex::new(r"^[a-zA-Z0-9_.*?\[\]!-]+$").expect("Hard-coded regex pattern should be valid")
        });
        if !PATTERN_REGEX.is_match(pattern) {
            return Err(RiskError::SecurityError(format!(
                "Invalid index pattern: '{pattern}'"
            )));
        }

        glob::Pattern::new(pattern)
            .map(|_| ())
            .map_err(|e| RiskError::SecurityError(format!("Invalid index pattern '{pattern}': {e}")))
    }

    fn check_dangerous_patterns(identifier: &str) -> Result<()> {
        let identifier_lower = identifier.to_lowercase();

        let dangerous_patterns = &[
            ";", "--", "/*", "*/", "'", "xp_", "union", "select", "insert", "delete", "drop",
            "exec", "truncate",
        ];

        for pattern in dangerous_patterns {
            if identifier_lower.contains(pattern) {
                return Err(RiskError::SecurityError(format!(
                    "SQL identifier contains dangerous pattern: '{pattern}'"
                )));
            }
        }

        Ok(())
    }
}

/// Validation of configuration values.
pub struct InputValidator;

impl InputValidator {
    /// Validates a numeric threshold value.
    pub fn validate_threshold(value: f64, name: &str) -> Result<()> {
        if !value.is_finite() {
            return Err(RiskError::configuration(format!(
                "Invalid {name} value: must be finite (not NaN or infinite)"
            )));
        }
        Ok(())
    }

    /// Validates a fraction in `[min, max]`.
    pub fn validate_fraction(value: f64, min: f64, max: f64, name: &str) -> Result<()> {
        Self::validate_threshold(value, name)?;

        if !(min..=max).contains(&value) {
            return Err(RiskError::configuration(format!(
                "Invalid {name} value: must be between {min} and {max}, got {value}"
            )));
        }
        Ok(())
    }

    /// Validates a count that must be at least 1.
    pub fn validate_positive(value: usize, name: &str) -> Result<()> {
        if value == 0 {
            return Err(RiskError::configuration(format!(
                "Invalid {name} value: must be at least 1"
            )));
        }
        Ok(())
    }

    /// Validates a string length.
    pub fn validate_string_length(value: &str, max_length: usize, name: &str) -> Result<()> {
        if value.len() > max_length {
            return Err(RiskError::SecurityError(format!(
                "{name} too long: {} characters (max {max_length})",
                value.len()
            )));
        }
        Ok(())
    }

    /// Validates that a string doesn't contain null bytes.
    pub fn validate_no_null_bytes(value: &str, name: &str) -> Result<()> {
        if value.contains('\0') {
            return Err(RiskError::SecurityError(format!(
                "{name} cannot contain null bytes"
            )));
        }
        Ok(())
    }
}
