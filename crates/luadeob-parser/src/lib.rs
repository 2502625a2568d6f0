//! luadeob-parser: Lua/Luau parser, printer and scope-tracking renamer
//!
//! # Design Principles
//!
//! 1. **Lexing on-demand**
//!    - Lexer is called during parsing, not upfront
//!    - Comments and Luau type syntax never reach the AST
//!
//! 2. **Owned tree, in-place rewrite**
//!    - Nodes own their children; identifiers are plain `String`s
//!    - The rename pass mutates identifier text and nothing else
//!
//! 3. **One run, one state**
//!    - A `Renamer` is consumed by the tree it renames, so scopes and the
//!      name counter are never shared between runs
//!
//! # Example
//!
//! ```
//! use luadeob_parser::{transform, CodegenOptions, RenameOptions};
//!
//! let (output, stats) = transform(
//!     "local function add(a, b) return a + b end return add(1, 2)",
//!     &RenameOptions::default(),
//!     CodegenOptions::default(),
//! )
//! .unwrap();
//! assert!(output.starts_with("local function v1(v2, v3)"));
//! assert_eq!(stats.declarations, 3);
//! ```

mod ast;
mod codegen;
mod lexer;
mod parser;
mod rename;
mod span;
mod token;

// Re-exports
pub use ast::*;
pub use codegen::{Codegen, CodegenOptions};
pub use lexer::Lexer;
pub use parser::{ParseError, Parser, MAX_DEPTH};
pub use rename::{
    collect_identifiers, is_valid_prefix, rename, NameGenerator, RenameError, RenameOptions,
    RenameStats, Renamer, Resolution, ScopeStack,
};
pub use span::{LineIndex, Span};
pub use token::{is_valid_identifier, Token, TokenKind};

/// Failure of [`transform`].
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Rename(#[from] RenameError),
}

/// Parse Lua/Luau source code into an AST.
pub fn parse(source: &str) -> Result<Ast, ParseError> {
    Parser::new(source).parse()
}

/// Parse, rename locals and generate Lua output.
pub fn transform(
    source: &str,
    rename_opts: &RenameOptions,
    codegen_opts: CodegenOptions,
) -> Result<(String, RenameStats), TransformError> {
    let mut ast = parse(source)?;
    let stats = rename(&mut ast, rename_opts)?;
    Ok((Codegen::new(&ast, codegen_opts).generate(), stats))
}
