#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod error;
pub mod pipeline;
pub mod version;

pub use config::Config;
pub use error::Error;
pub use pipeline::{deobfuscate, Deobfuscated};
pub use version::VERSION;
