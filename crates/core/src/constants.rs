//! Constants used throughout the repopulation core crate.

/// Environment variable consulted by hosts to switch enableWhen filtering on or off.
pub const ENABLE_WHEN_ENV_VAR: &str = "REPOP_ENABLE_WHEN";

/// enableWhen filtering is on unless explicitly disabled.
pub const DEFAULT_ENABLE_WHEN_ACTIVATED: bool = true;

/// Review heading used for candidates that sit outside any section.
pub const UNSECTIONED_HEADING: &str = "";
