//! Layout engine configuration
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! epsilon = 0.0001
//! max_cascade_depth = 512
//! measure_cache_capacity = 256
//! strict_non_finite = false
//! default_width = "fill"
//! default_height = "content"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};
use crate::strategy::AutoStrategy;

/// Tunables of a [`LayoutGraph`](crate::LayoutGraph)
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LayoutConfig {
    /// Changes smaller than this do not cascade
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,
    /// Floor of the open-cascade bound; the live cell count raises it
    #[serde(default = "default_max_cascade_depth")]
    pub max_cascade_depth: usize,
    /// Entries kept by the content measurement cache
    #[serde(default = "default_measure_cache_capacity")]
    pub measure_cache_capacity: usize,
    /// Panic on NaN or infinite resolved values instead of ignoring them
    #[serde(default = "default_strict_non_finite")]
    pub strict_non_finite: bool,
    /// Strategy installed on a new node's width
    #[serde(default = "default_width")]
    pub default_width: AutoStrategy,
    /// Strategy installed on a new node's height
    #[serde(default = "default_height")]
    pub default_height: AutoStrategy,
}

fn default_epsilon() -> f32 {
    1e-4
}

fn default_max_cascade_depth() -> usize {
    512
}

fn default_measure_cache_capacity() -> usize {
    256
}

fn default_strict_non_finite() -> bool {
    cfg!(debug_assertions)
}

fn default_width() -> AutoStrategy {
    AutoStrategy::Container
}

fn default_height() -> AutoStrategy {
    AutoStrategy::Content
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            max_cascade_depth: default_max_cascade_depth(),
            measure_cache_capacity: default_measure_cache_capacity(),
            strict_non_finite: default_strict_non_finite(),
            default_width: default_width(),
            default_height: default_height(),
        }
    }
}

impl LayoutConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|err| LayoutError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .map_err(|err| LayoutError::Config(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(LayoutError::Config(format!(
                "epsilon must be a non-negative finite number, got {}",
                self.epsilon
            )));
        }
        if self.max_cascade_depth == 0 {
            return Err(LayoutError::Config(
                "max_cascade_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = LayoutConfig::from_toml_str("").unwrap();
        assert_eq!(config, LayoutConfig::default());
    }

    #[test]
    fn test_parse_overrides() {
        let config = LayoutConfig::from_toml_str(
            r#"
                epsilon = 0.5
                max_cascade_depth = 16
                strict_non_finite = false
                default_width = "fill"
                default_height = "container"
            "#,
        )
        .unwrap();

        assert_eq!(config.epsilon, 0.5);
        assert_eq!(config.max_cascade_depth, 16);
        assert!(!config.strict_non_finite);
        assert_eq!(config.default_width, AutoStrategy::Container);
        assert_eq!(config.default_height, AutoStrategy::Container);
        assert_eq!(config.measure_cache_capacity, 256);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            LayoutConfig::from_toml_str("epsilon = -1.0"),
            Err(LayoutError::Config(_))
        ));
        assert!(matches!(
            LayoutConfig::from_toml_str("max_cascade_depth = 0"),
            Err(LayoutError::Config(_))
        ));
        assert!(matches!(
            LayoutConfig::from_toml_str("default_width = \"sideways\""),
            Err(LayoutError::Config(_))
        ));
    }

    #[test]
    fn test_from_missing_path() {
        let result = LayoutConfig::from_path("/definitely/not/here/trellis.toml");
        assert!(matches!(result, Err(LayoutError::Config(_))));
    }
}
