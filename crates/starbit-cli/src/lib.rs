//! Command line front end for the starbit codecs.
//!
//! The `starbit` binary is a thin wrapper around this library:
//! - `config`: argument and environment parsing
//! - `commands`: one function per subcommand
//! - `search`: multi-threaded search across a directory of archives
//!
//! # Example
//!
//! ```no_run
//! use starbit_cli::{CliConfig, commands};
//! use std::sync::atomic::AtomicBool;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = CliConfig::from_args();
//!     config.validate()?;
//!
//!     let stop = AtomicBool::new(false);
//!     commands::run(&config, &stop, &mut std::io::stdout().lock())
//! }
//! ```

#![warn(missing_docs)]

pub mod commands;
pub mod config;
pub mod error;
pub mod search;

pub use config::{CliConfig, Command};
pub use error::{ConfigError, SearchError};
pub use search::{SearchConfig, SearchHit, SearchReport};
