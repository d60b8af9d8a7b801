// Configuration validation

use crate::{ConfigError, Result};

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Reusable validation rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that a value is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Validate that a number is within range (inclusive)
    pub fn in_range<T: PartialOrd + std::fmt::Display>(
        value: T,
        min: T,
        max: T,
        field: &str,
    ) -> Result<()> {
        if value < min || value > max {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between {} and {}",
                field, min, max
            )));
        }
        Ok(())
    }

    /// Validate that every entry of a list is non-blank
    pub fn no_blank_entries(values: &[String], field: &str) -> Result<()> {
        if values.iter().any(|v| v.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot contain blank entries",
                field
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty_validation() {
        assert!(ConfigValidator::not_empty("value", "field").is_ok());
        assert!(ConfigValidator::not_empty("", "field").is_err());
    }

    #[test]
    fn test_range_validation() {
        assert!(ConfigValidator::in_range(5, 1, 10, "field").is_ok());
        assert!(ConfigValidator::in_range(0, 1, 10, "field").is_err());

        let err = ConfigValidator::in_range(11, 1, 10, "expiry").unwrap_err();
        assert_eq!(err.to_string(), "Validation error: expiry must be between 1 and 10");
    }

    #[test]
    fn test_blank_entries() {
        let ok = vec!["GET".to_string(), "HEAD".to_string()];
        let bad = vec!["GET".to_string(), "  ".to_string()];
        assert!(ConfigValidator::no_blank_entries(&ok, "methods").is_ok());
        assert!(ConfigValidator::no_blank_entries(&bad, "methods").is_err());
    }
}
