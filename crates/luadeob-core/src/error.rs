use luadeob_parser::{LineIndex, ParseError, RenameError};
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for luadeob operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        message: String,
        line: u32,
        column: u32,
    },

    #[error("{0}")]
    Structural(#[from] RenameError),

    #[error("Input is {size} bytes, limit is {limit} bytes")]
    InputTooLarge { size: usize, limit: usize },
}

impl Error {
    /// Build a parse error with a 1-indexed position into `source`.
    #[must_use]
    pub fn parse(err: &ParseError, source: &str) -> Self {
        let (line, column) = LineIndex::new(source).position(err.span.start);
        Self::Parse {
            message: err.message.clone(),
            line,
            column,
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::ConfigRead { .. }
            | Self::ConfigParse { .. }
            | Self::Structural(RenameError::InvalidPrefix { .. }) => "CONFIG_ERROR",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::Structural(RenameError::GeneratorExhausted { .. }) => "GENERATOR_EXHAUSTED",
            Self::Structural(_) => "STRUCTURAL_ERROR",
            Self::InputTooLarge { .. } => "INPUT_TOO_LARGE",
        }
    }
}
