use crate::error::Error;
use luadeob_parser::{CodegenOptions, RenameOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default cap on accepted source size (16 MiB).
pub const DEFAULT_MAX_INPUT_BYTES: usize = 16 * 1024 * 1024;

/// Runtime configuration for a deobfuscation run.
///
/// Loaded from an optional JSON file; every field may be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prefix of generated names (`v` gives `v1`, `v2`, ...).
    pub prefix: String,

    /// Names the generator must never produce.
    pub reserved: Vec<String>,

    /// Also keep generated names clear of every identifier in the input.
    pub avoid_existing: bool,

    /// Spaces per indentation level in the output.
    pub indent: usize,

    /// Print the output on a single line.
    pub minify: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Inputs larger than this are rejected before parsing.
    pub max_input_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: "v".to_string(),
            reserved: Vec::new(),
            avoid_existing: true,
            indent: 4,
            minify: false,
            verbosity: 0,
            json_logs: false,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

impl Config {
    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// Set the generated-name prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set single-line output.
    #[must_use]
    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    /// Set spaces per indentation level.
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Add reserved names.
    #[must_use]
    pub fn with_reserved(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.reserved.extend(names);
        self
    }

    /// Options for the rename pass.
    pub fn rename_options(&self) -> RenameOptions {
        RenameOptions {
            prefix: self.prefix.clone(),
            reserved: self.reserved.iter().cloned().collect(),
            avoid_existing: self.avoid_existing,
        }
    }

    /// Options for the printer.
    pub fn codegen_options(&self) -> CodegenOptions {
        CodegenOptions {
            minify: self.minify,
            indent: Some(" ".repeat(self.indent)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.prefix, "v");
        assert!(config.avoid_existing);
        assert_eq!(config.indent, 4);
        assert_eq!(config.max_input_bytes, DEFAULT_MAX_INPUT_BYTES);
    }

    #[test]
    fn test_builder() {
        let config = Config::default()
            .with_prefix("var")
            .with_minify(true)
            .with_indent(2)
            .with_verbosity(2)
            .with_json_logs(true)
            .with_reserved(["var1".to_string()]);
        assert_eq!(config.prefix, "var");
        assert!(config.minify);
        assert_eq!(config.codegen_options().indent.as_deref(), Some("  "));
        assert!(config.rename_options().reserved.contains("var1"));
        assert_eq!(config.verbosity, 2);
        assert!(config.json_logs);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "prefix": "local_", "reserved": ["local_1"] }}"#).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.prefix, "local_");
        assert_eq!(config.reserved, vec!["local_1".to_string()]);
        assert_eq!(config.indent, 4);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ prefix = ").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }
}
