//! Importer configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use shapeasm_expr::DEFAULT_MAX_PASSES;
use shapeasm_source::TextEncoding;

use crate::error::Result;
use crate::header::DEFAULT_HEADER_MACRO;

/// Settings for one import, usually read from `shapeasm.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    /// Initial encoding guess.
    pub encoding: TextEncoding,
    /// Include files harvested for constants, in order.
    pub includes: Vec<PathBuf>,
    /// Macro name of shape header lines.
    pub header_macro: String,
    /// Bound on constant substitution passes.
    pub max_substitution_passes: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            encoding: TextEncoding::default(),
            includes: Vec::new(),
            header_macro: DEFAULT_HEADER_MACRO.to_string(),
            max_substitution_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl ImportConfig {
    /// Parse from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImportError;

    #[test]
    fn test_defaults() {
        let config = ImportConfig::from_toml_str("").unwrap();
        assert_eq!(config, ImportConfig::default());
        assert_eq!(config.header_macro, "shapehdr");
        assert_eq!(config.max_substitution_passes, 64);
    }

    #[test]
    fn test_full_config() {
        let config = ImportConfig::from_toml_str(
            r#"
encoding = "latin-1"
includes = ["consts.inc", "more.inc"]
header_macro = "objhdr"
max_substitution_passes = 8
"#,
        )
        .unwrap();
        assert_eq!(config.encoding, TextEncoding::Latin1);
        assert_eq!(config.includes.len(), 2);
        assert_eq!(config.header_macro, "objhdr");
        assert_eq!(config.max_substitution_passes, 8);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ImportConfig::from_toml_str("colour = 3").unwrap_err();
        assert!(matches!(err, ImportError::Config(_)));
    }
}
