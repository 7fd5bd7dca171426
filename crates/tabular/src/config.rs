//! Configuration for the tabular parser.
//!
//! [`TabularConfig`] is cheap to clone and deserializes from the same sources
//! as the rest of the server configuration (file or environment).
//!
//! ```rust
//! use tabular::TabularConfig;
//!
//! let config = TabularConfig::default();
//! config.validate().expect("default config is valid");
//! assert_eq!(config.delimiter, ',');
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default raw payload limit: 50 MiB.
pub const DEFAULT_MAX_BYTES: usize = 50 * 1024 * 1024;

/// Runtime configuration for parsing uploaded tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabularConfig {
    /// Field delimiter. Must be a single ASCII character.
    pub delimiter: char,

    /// Pad rows that are shorter than the header with missing cells instead
    /// of rejecting the table. Longer rows are always rejected.
    pub pad_short_rows: bool,

    /// Cell contents (besides the empty string) that count as missing.
    pub missing_markers: Vec<String>,

    /// Maximum number of data rows, excluding the header.
    pub max_rows: Option<usize>,

    /// Maximum raw input size in bytes.
    pub max_bytes: Option<usize>,
}

impl Default for TabularConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            pad_short_rows: false,
            missing_markers: ["NA", "N/A", "NaN", "NULL", "null"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_rows: None,
            max_bytes: Some(DEFAULT_MAX_BYTES),
        }
    }
}

/// Invalid tabular configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid delimiter {0:?}: {1}")]
    InvalidDelimiter(char, &'static str),

    #[error("max_bytes must be greater than zero")]
    ZeroMaxBytes,
}

impl TabularConfig {
    /// Check the configuration for values the parser cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = self.delimiter;
        if !d.is_ascii() {
            return Err(ConfigError::InvalidDelimiter(d, "must be ASCII"));
        }
        if matches!(d, '"' | '\r' | '\n') {
            return Err(ConfigError::InvalidDelimiter(
                d,
                "must not be a quote or line break",
            ));
        }
        if self.max_bytes == Some(0) {
            return Err(ConfigError::ZeroMaxBytes);
        }
        Ok(())
    }

    /// Delimiter as the byte the csv reader expects.
    pub fn delimiter_byte(&self) -> u8 {
        // validate() guarantees ASCII; fall back to comma otherwise.
        u8::try_from(self.delimiter).unwrap_or(b',')
    }

    /// Whether `cell` is one of the configured missing markers or empty.
    pub fn is_missing(&self, cell: &str) -> bool {
        cell.is_empty() || self.missing_markers.iter().any(|m| m == cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = TabularConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.delimiter_byte(), b',');
        assert!(!cfg.pad_short_rows);
        assert_eq!(cfg.max_bytes, Some(DEFAULT_MAX_BYTES));
    }

    #[test]
    fn rejects_bad_delimiters() {
        for d in ['"', '\n', '\r', 'é'] {
            let cfg = TabularConfig {
                delimiter: d,
                ..TabularConfig::default()
            };
            assert!(matches!(
                cfg.validate(),
                Err(ConfigError::InvalidDelimiter(c, _)) if c == d
            ));
        }
    }

    #[test]
    fn rejects_zero_byte_limit() {
        let cfg = TabularConfig {
            max_bytes: Some(0),
            ..TabularConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroMaxBytes));
    }

    #[test]
    fn missing_markers() {
        let cfg = TabularConfig::default();
        assert!(cfg.is_missing(""));
        assert!(cfg.is_missing("NA"));
        assert!(!cfg.is_missing(" "));
        assert!(!cfg.is_missing("na"));
    }

    #[test]
    fn deserializes_partial_config() {
        let cfg: TabularConfig =
            serde_json::from_str(r#"{ "delimiter": ";", "max_rows": 10 }"#).unwrap();
        assert_eq!(cfg.delimiter, ';');
        assert_eq!(cfg.max_rows, Some(10));
        assert_eq!(cfg.missing_markers, TabularConfig::default().missing_markers);
    }
}
