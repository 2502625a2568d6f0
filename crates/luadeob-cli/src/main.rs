#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::needless_raw_string_hashes)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use luadeob_core::Config;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "luadeob")]
#[command(author, version, about = "Rename obfuscated Lua/Luau locals to readable names", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Rename every local variable in a script
    Rename {
        /// Script to read ("-" or omitted reads stdin)
        input: Option<PathBuf>,

        /// Write the result to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        outfile: Option<PathBuf>,

        /// Prefix for generated names (default "v")
        #[arg(long)]
        prefix: Option<String>,

        /// Print the whole program on a single line
        #[arg(long)]
        minify: bool,

        /// Spaces per indentation level
        #[arg(long)]
        indent: Option<usize>,

        /// Name the generator must never produce (repeatable)
        #[arg(long = "reserve", value_name = "NAME")]
        reserved: Vec<String>,

        /// Path to a JSON config file
        #[arg(long, short = 'c', value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Serve the web form and JSON API
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(long, short = 'p', env = "PORT", default_value = "8000")]
        port: u16,

        /// Path to a JSON config file
        #[arg(long, short = 'c', value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::default()
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(cli.json),
        Some(Commands::Rename {
            input,
            outfile,
            prefix,
            minify,
            indent,
            reserved,
            config,
        }) => {
            let span = tracing::info_span!("rename", cmd = "rename");
            let _guard = span.enter();
            let action = commands::rename::RenameAction {
                input,
                outfile,
                config,
                prefix,
                minify,
                indent,
                reserved,
            };
            commands::rename::run(action, cli.json)
        }
        Some(Commands::Serve { host, port, config }) => {
            let action = commands::serve::ServeAction { host, port, config };
            let rt = tokio::runtime::Runtime::new().into_diagnostic()?;
            rt.block_on(commands::serve::run(action))
        }
    }
}
