//! Model and adapter configuration.
//!
//! Resolution order is CLI flags > config file > defaults. The config file
//! is plain JSON deserialized into [`ModelConfig`]; semantic validation
//! (window sanity, order bounds) happens separately in [`ModelConfig::validate`]
//! so a loaded file and a flag-assembled config go through the same checks.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mp_common::{Symbol, SymbolRanges, SymbolWindow};

/// Largest cumulative total a context table may reach.
///
/// The register budget of a 16-bit arithmetic coder; every interval this
/// model reports is expressed on that scale.
pub const MAXIMUM_SCALE: u32 = 16383;

/// Cap on the ranked list returned by one prediction.
pub const MAX_PREDICTIONS: usize = 1500;

/// Longest training or test stream, in symbols.
pub const MAX_STRING_LENGTH: usize = 30_000;

/// Upper bound accepted for `max_order`.
pub const MAX_SUPPORTED_ORDER: usize = 16;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("invalid JSON in config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model order: {0} (must be in 0..={MAX_SUPPORTED_ORDER})")]
    InvalidOrder(usize),

    #[error("invalid alphabet window: {lowest:#06x}..={highest:#06x}")]
    InvalidAlphabet { lowest: Symbol, highest: Symbol },

    #[error("context table budget must be nonzero")]
    InvalidNodeBudget,
}

/// Configuration for the context-trie model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Highest context order maintained by the trie.
    #[serde(default = "default_max_order")]
    pub max_order: usize,

    /// Hard cap on allocated context tables; exceeding it is an allocation
    /// fault rather than an OOM kill.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,

    /// Walk count updates from the current order instead of from 0
    /// (classic update exclusion). Off by default: the trained trie then
    /// carries full statistics at every order, which the prediction fallback
    /// relies on.
    #[serde(default)]
    pub update_exclusion: bool,

    /// Inclusive symbol window seeding the uniform order minus-one table.
    #[serde(default = "default_alphabet")]
    pub alphabet: SymbolWindow,

    /// Kind-classification windows used by the evaluation drivers.
    #[serde(default)]
    pub ranges: SymbolRanges,
}

fn default_max_order() -> usize {
    3
}

fn default_max_nodes() -> usize {
    1 << 20
}

fn default_alphabet() -> SymbolWindow {
    // Location window start through start-time window end: the span every
    // binbox trace symbol falls into.
    SymbolWindow::new(0x2320, 0x2DFF)
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            max_order: default_max_order(),
            max_nodes: default_max_nodes(),
            update_exclusion: false,
            alphabet: default_alphabet(),
            ranges: SymbolRanges::default(),
        }
    }
}

impl ModelConfig {
    /// Config for the standard binbox trace layout at the given order.
    pub fn binbox(max_order: usize) -> Self {
        Self {
            max_order,
            ..Self::default()
        }
    }

    /// Semantic validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_order > MAX_SUPPORTED_ORDER {
            return Err(ConfigError::InvalidOrder(self.max_order));
        }
        if self.alphabet.is_empty() || self.alphabet.lowest <= 0 {
            return Err(ConfigError::InvalidAlphabet {
                lowest: self.alphabet.lowest,
                highest: self.alphabet.highest,
            });
        }
        if self.max_nodes == 0 {
            return Err(ConfigError::InvalidNodeBudget);
        }
        Ok(())
    }

    /// Load from a JSON file. Validation is the caller's step.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        assert!(ModelConfig::default().validate().is_ok());
    }

    #[test]
    fn default_alphabet_spans_binbox_windows() {
        let config = ModelConfig::default();
        assert!(config.alphabet.contains(config.ranges.location.lowest));
        assert!(config.alphabet.contains(config.ranges.start_time.highest));
        assert_eq!(config.alphabet.len(), 0x2DFF - 0x2320 + 1);
    }

    #[test]
    fn excessive_order_is_rejected() {
        let config = ModelConfig::binbox(MAX_SUPPORTED_ORDER + 1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOrder(_))
        ));
    }

    #[test]
    fn inverted_alphabet_is_rejected() {
        let config = ModelConfig {
            alphabet: SymbolWindow::new(0x2DFF, 0x2320),
            ..ModelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidAlphabet { .. })
        ));
    }

    #[test]
    fn nonpositive_alphabet_is_rejected() {
        let config = ModelConfig {
            alphabet: SymbolWindow::new(-4, 100),
            ..ModelConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_node_budget_is_rejected() {
        let config = ModelConfig {
            max_nodes: 0,
            ..ModelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidNodeBudget)
        ));
    }

    #[test]
    fn file_round_trip_with_partial_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_order": 5, "update_exclusion": true }}"#).unwrap();
        let config = ModelConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_order, 5);
        assert!(config.update_exclusion);
        // Unspecified fields fall back to defaults.
        assert_eq!(config.alphabet, default_alphabet());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = ModelConfig::from_file(Path::new("/nonexistent/mp.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = ModelConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
