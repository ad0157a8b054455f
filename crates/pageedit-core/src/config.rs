//! Engine configuration
//!
//! Parsed from TOML text handed over by the host. Every field has a
//! default, so an empty document is a valid configuration.

use crate::error::{EditError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Preview rendering settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderConfig {
    /// Maximum previews rendered at the same time (default: 4)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Scale used when the caller gives no hint (default: 1.5)
    #[serde(default = "default_scale")]
    pub default_scale: f64,
}

/// Output document settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Compress streams when saving (default: true)
    #[serde(default = "default_true")]
    pub compress: bool,
    /// Drop objects no output page references (default: true)
    #[serde(default = "default_true")]
    pub prune_unused_objects: bool,
    /// Appended to the source file stem (default: "edited")
    #[serde(default = "default_suffix")]
    pub filename_suffix: String,
}

fn default_max_concurrent() -> usize {
    4
}

fn default_scale() -> f64 {
    1.5
}

fn default_true() -> bool {
    true
}

fn default_suffix() -> String {
    "edited".to_string()
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            default_scale: default_scale(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            compress: true,
            prune_unused_objects: true,
            filename_suffix: default_suffix(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)
            .map_err(|e| EditError::Config(format!("failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.render.max_concurrent == 0 {
            return Err(EditError::Config(
                "render.max_concurrent must be at least 1".into(),
            ));
        }
        if !(self.render.default_scale.is_finite() && self.render.default_scale > 0.0) {
            return Err(EditError::Config(format!(
                "render.default_scale must be positive, got {}",
                self.render.default_scale
            )));
        }
        if self.output.filename_suffix.trim().is_empty() {
            return Err(EditError::Config(
                "output.filename_suffix must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.render.max_concurrent, 4);
        assert_eq!(config.render.default_scale, 1.5);
        assert!(config.output.compress);
        assert_eq!(config.output.filename_suffix, "edited");
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [render]
            max_concurrent = 2

            [output]
            compress = false
        "#;
        let config = EngineConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.render.max_concurrent, 2);
        assert_eq!(config.render.default_scale, 1.5);
        assert!(!config.output.compress);
        assert!(config.output.prune_unused_objects);
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let err = EngineConfig::from_toml_str("[render]\nmax_concurrent = 0").unwrap_err();
        assert!(matches!(err, EditError::Config(_)));
    }

    #[test]
    fn test_rejects_bad_scale_and_suffix() {
        assert!(EngineConfig::from_toml_str("[render]\ndefault_scale = -1.0").is_err());
        assert!(EngineConfig::from_toml_str("[output]\nfilename_suffix = \"  \"").is_err());
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(EngineConfig::from_toml_str("[render").is_err());
    }
}
