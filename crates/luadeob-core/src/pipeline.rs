//! Parse → rename → print.
//!
//! Every call builds its own AST and renamer, so concurrent callers share
//! nothing. A tree that failed to rename is dropped, never printed.

use crate::config::Config;
use crate::error::Error;
use luadeob_parser::{Codegen, Parser, RenameStats, Renamer};

/// Output of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deobfuscated {
    /// Renamed program text.
    pub code: String,
    /// Rename counters.
    pub stats: RenameStats,
}

/// Rename every local in `source` and print the result.
pub fn deobfuscate(source: &str, config: &Config) -> Result<Deobfuscated, Error> {
    if source.len() > config.max_input_bytes {
        return Err(Error::InputTooLarge {
            size: source.len(),
            limit: config.max_input_bytes,
        });
    }

    let mut ast = Parser::new(source)
        .parse()
        .map_err(|err| Error::parse(&err, source))?;
    let stats = Renamer::new(config.rename_options()).rename(&mut ast)?;
    let code = Codegen::new(&ast, config.codegen_options()).generate();

    Ok(Deobfuscated { code, stats })
}
