//! Default value functions for configuration.

/// Log filter used when `[logging] filter` is absent.
pub fn default_log_filter() -> String {
    "info".to_string()
}
