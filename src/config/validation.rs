//! Configuration validation.
//!
//! Runs after parsing so a bad log directive is reported at load time
//! instead of being silently ignored by the subscriber.

use super::Config;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// `logging.filter` is blank.
    #[error("logging.filter is empty")]
    EmptyLogFilter,
    /// `logging.filter` does not parse as an `EnvFilter` directive.
    #[error("logging.filter {filter:?} is not a valid directive: {reason}")]
    InvalidLogFilter {
        /// Directive as written.
        filter: String,
        /// Parser message.
        reason: String,
    },
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let filter = config.logging.filter.trim();
    if filter.is_empty() {
        errors.push(ValidationError::EmptyLogFilter);
    } else if let Err(e) = EnvFilter::try_new(filter) {
        errors.push(ValidationError::InvalidLogFilter {
            filter: filter.to_string(),
            reason: e.to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
