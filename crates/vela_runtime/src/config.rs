//! Runtime configuration

use serde::Deserialize;

use crate::error::Result;

/// Options for an application instance.
///
/// Every field has a default, so a partial TOML document is valid:
///
/// ```
/// use vela_runtime::AppConfig;
///
/// let config = AppConfig::from_toml_str("max_flush_passes = 10").unwrap();
/// assert_eq!(config.max_flush_passes, 10);
/// assert!(config.warn_missing_render);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Upper bound on flush passes in [`App::flush_until_idle`](crate::App::flush_until_idle)
    pub max_flush_passes: usize,
    /// Log every host operation at trace level
    pub trace_host_ops: bool,
    /// Warn when a component has no render function and no template
    pub warn_missing_render: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_flush_passes: 100,
            trace_host_ops: false,
            warn_missing_render: true,
        }
    }
}

impl AppConfig {
    /// Parse from a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }
}
