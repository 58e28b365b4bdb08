// Configuration validation

use crate::{ConfigError, Result};
use keystone_core::container::is_type_path;

/// Trait for validating configuration before it is applied
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Validation rules shared by configuration sections
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::invalid(format!("{} cannot be empty", field)));
        }
        Ok(())
    }

    pub fn one_of<T: PartialEq + std::fmt::Debug>(value: &T, allowed: &[T], field: &str) -> Result<()> {
        if !allowed.contains(value) {
            return Err(ConfigError::invalid(format!(
                "{} must be one of {:?}, got {:?}",
                field, allowed, value
            )));
        }
        Ok(())
    }

    /// A fully-qualified type path such as `app::services::Mailer`
    pub fn is_type_path(value: &str, field: &str) -> Result<()> {
        Self::not_empty(value, field)?;
        if !is_type_path(value) || value.split("::").any(|segment| segment.is_empty()) {
            return Err(ConfigError::invalid(format!(
                "{} must be a type path like `app::Service`, got `{}`",
                field, value
            )));
        }
        Ok(())
    }

    /// A component or alias name: non-empty, no whitespace, no `/`
    pub fn is_component_name(value: &str, field: &str) -> Result<()> {
        Self::not_empty(value, field)?;
        if value.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(ConfigError::invalid(format!(
                "{} `{}` must not contain whitespace or `/`",
                field, value
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty() {
        assert!(ConfigValidator::not_empty("db", "name").is_ok());
        assert!(ConfigValidator::not_empty("  ", "name").is_err());
    }

    #[test]
    fn test_one_of() {
        assert!(ConfigValidator::one_of(&"json", &["json", "pretty"], "format").is_ok());
        let err = ConfigValidator::one_of(&"xml", &["json", "pretty"], "format").unwrap_err();
        assert!(err.is_invalid());
    }

    #[test]
    fn test_type_path() {
        assert!(ConfigValidator::is_type_path("app::Db", "type").is_ok());
        assert!(ConfigValidator::is_type_path("Db", "type").is_err());
        assert!(ConfigValidator::is_type_path("app::", "type").is_err());
    }

    #[test]
    fn test_component_name() {
        assert!(ConfigValidator::is_component_name("db", "component").is_ok());
        assert!(ConfigValidator::is_component_name("app::Db", "component").is_ok());
        assert!(ConfigValidator::is_component_name("my db", "component").is_err());
        assert!(ConfigValidator::is_component_name("a/b", "component").is_err());
    }
}
