//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into
//! [`crate::RepopulationService`]. The engine never reads environment variables itself, so
//! behaviour cannot drift between calls within one repopulation cycle.

use crate::constants::DEFAULT_ENABLE_WHEN_ACTIVATED;
use crate::{RepopError, RepopResult};

/// Core configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepopulateConfig {
    enable_when_activated: bool,
}

impl RepopulateConfig {
    /// Create a new `RepopulateConfig`.
    ///
    /// When `enable_when_activated` is false, enableWhen results are ignored and every item is
    /// treated as visible.
    pub fn new(enable_when_activated: bool) -> Self {
        Self {
            enable_when_activated,
        }
    }

    pub fn enable_when_activated(&self) -> bool {
        self.enable_when_activated
    }
}

impl Default for RepopulateConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENABLE_WHEN_ACTIVATED)
    }
}

/// Parse the enableWhen switch from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default (activated).
///
/// # Errors
///
/// Returns `RepopError::InvalidInput` if the value is not a recognised boolean spelling.
pub fn enable_when_activated_from_env_value(value: Option<String>) -> RepopResult<bool> {
    let value = value
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty());

    match value.as_deref() {
        None => Ok(DEFAULT_ENABLE_WHEN_ACTIVATED),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(other) => Err(RepopError::InvalidInput(format!(
            "unrecognised enableWhen switch value: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_or_blank_uses_default() {
        assert!(enable_when_activated_from_env_value(None).expect("default"));
        assert!(enable_when_activated_from_env_value(Some("  ".into())).expect("default"));
    }

    #[test]
    fn parses_boolean_spellings() {
        for v in ["true", "TRUE", "1", "yes", " on "] {
            assert!(enable_when_activated_from_env_value(Some(v.into())).expect("parse"));
        }
        for v in ["false", "0", "No", "off"] {
            assert!(!enable_when_activated_from_env_value(Some(v.into())).expect("parse"));
        }
    }

    #[test]
    fn rejects_unknown_values() {
        let err = enable_when_activated_from_env_value(Some("maybe".into()))
            .expect_err("should reject");
        assert!(matches!(err, RepopError::InvalidInput(msg) if msg.contains("maybe")));
    }

    #[test]
    fn default_config_activates_enable_when() {
        assert!(RepopulateConfig::default().enable_when_activated());
        assert!(!RepopulateConfig::new(false).enable_when_activated());
    }
}
