//! `luadeob rename` command implementation.
//!
//! Reads a script from a file or stdin, renames every local and prints or
//! writes the result.

use luadeob_core::{deobfuscate, Config, Deobfuscated, Error};
use miette::Result;
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// Rename command action.
#[derive(Debug, Clone, Default)]
pub struct RenameAction {
    /// Input file (`None` or `-` reads stdin).
    pub input: Option<PathBuf>,
    /// Output file (if None, prints to stdout).
    pub outfile: Option<PathBuf>,
    /// Config file.
    pub config: Option<PathBuf>,
    /// Generated-name prefix override.
    pub prefix: Option<String>,
    /// Single-line output.
    pub minify: bool,
    /// Spaces per indentation level override.
    pub indent: Option<usize>,
    /// Extra names the generator must avoid.
    pub reserved: Vec<String>,
}

impl RenameAction {
    fn reads_stdin(&self) -> bool {
        self.input.as_ref().map_or(true, |p| p.as_os_str() == "-")
    }

    fn input_label(&self) -> String {
        if self.reads_stdin() {
            "-".to_string()
        } else {
            self.input
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        }
    }

    /// The config file (if any) with command-line overrides applied.
    fn config(&self) -> Result<Config, Error> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(prefix) = &self.prefix {
            config = config.with_prefix(prefix.clone());
        }
        if let Some(indent) = self.indent {
            config = config.with_indent(indent);
        }
        if self.minify {
            config = config.with_minify(true);
        }
        Ok(config.with_reserved(self.reserved.iter().cloned()))
    }
}

/// JSON output for rename command.
#[derive(Serialize)]
struct RenameResultJson {
    ok: bool,
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    outfile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    declarations: usize,
    renamed_uses: usize,
    unresolved: usize,
    size_bytes: usize,
    duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RenameErrorJson>,
}

#[derive(Serialize)]
struct RenameErrorJson {
    code: String,
    message: String,
}

/// Run the rename command.
pub fn run(action: RenameAction, json: bool) -> Result<()> {
    let start = Instant::now();
    let result = execute(&action);
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(out) => {
            let stats = out.stats;
            info!(
                input = %action.input_label(),
                declarations = stats.declarations,
                renamed_uses = stats.renamed_uses,
                unresolved = stats.unresolved,
                duration_ms,
                "renamed"
            );

            if json {
                let json_result = RenameResultJson {
                    ok: true,
                    input: action.input_label(),
                    outfile: action.outfile.as_ref().map(|p| p.display().to_string()),
                    output: action.outfile.is_none().then(|| out.code.clone()),
                    declarations: stats.declarations,
                    renamed_uses: stats.renamed_uses,
                    unresolved: stats.unresolved,
                    size_bytes: out.code.len(),
                    duration_ms,
                    error: None,
                };
                println!("{}", to_json(&json_result));
            } else if let Some(outfile) = &action.outfile {
                println!(
                    "  {} -> {} ({} locals, {} globals, {}ms)",
                    action.input_label(),
                    outfile.display(),
                    stats.declarations,
                    stats.unresolved,
                    duration_ms
                );
            } else {
                print!("{}", out.code);
            }

            Ok(())
        }
        Err(e) => {
            if json {
                let json_result = RenameResultJson {
                    ok: false,
                    input: action.input_label(),
                    outfile: action.outfile.as_ref().map(|p| p.display().to_string()),
                    output: None,
                    declarations: 0,
                    renamed_uses: 0,
                    unresolved: 0,
                    size_bytes: 0,
                    duration_ms,
                    error: Some(RenameErrorJson {
                        code: e.code().to_string(),
                        message: e.to_string(),
                    }),
                };
                println!("{}", to_json(&json_result));
            } else {
                eprintln!("error: {e}");
            }
            std::process::exit(1);
        }
    }
}

/// Read, rename and (when requested) write the output file.
fn execute(action: &RenameAction) -> Result<Deobfuscated, Error> {
    let config = action.config()?;

    let source = match &action.input {
        Some(path) if !action.reads_stdin() => std::fs::read_to_string(path)?,
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    debug!(input = %action.input_label(), bytes = source.len(), "read input");

    let out = deobfuscate(&source, &config)?;

    if let Some(outfile) = &action.outfile {
        if let Some(parent) = outfile.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(outfile, &out.code)?;
    }

    Ok(out)
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        format!(r#"{{"ok":false,"error":{{"code":"INTERNAL_ERROR","message":"{e}"}}}}"#)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdin_detection() {
        assert!(RenameAction::default().reads_stdin());
        let action = RenameAction { input: Some(PathBuf::from("-")), ..Default::default() };
        assert!(action.reads_stdin());
        let action = RenameAction { input: Some(PathBuf::from("a.lua")), ..Default::default() };
        assert!(!action.reads_stdin());
        assert_eq!(action.input_label(), "a.lua");
    }

    #[test]
    fn test_overrides_apply_on_top_of_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("luadeob.json");
        std::fs::write(&path, r#"{ "prefix": "x", "indent": 8 }"#).unwrap();

        let action = RenameAction {
            config: Some(path),
            indent: Some(2),
            reserved: vec!["x1".to_string()],
            ..Default::default()
        };
        let config = action.config().unwrap();
        assert_eq!(config.prefix, "x");
        assert_eq!(config.indent, 2);
        assert_eq!(config.reserved, vec!["x1".to_string()]);
    }

    #[test]
    fn test_execute_writes_outfile() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.lua");
        let outfile = dir.path().join("out/renamed.lua");
        std::fs::write(&input, "local secret = 42 return secret").unwrap();

        let action = RenameAction {
            input: Some(input),
            outfile: Some(outfile.clone()),
            ..Default::default()
        };
        let out = execute(&action).unwrap();
        assert_eq!(out.stats.declarations, 1);
        assert_eq!(
            std::fs::read_to_string(outfile).unwrap(),
            "local v1 = 42\nreturn v1\n"
        );
    }

    #[test]
    fn test_execute_missing_input() {
        let action = RenameAction {
            input: Some(PathBuf::from("/definitely/not/here.lua")),
            ..Default::default()
        };
        assert_eq!(execute(&action).unwrap_err().code(), "IO_ERROR");
    }
}
