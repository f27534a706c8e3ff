//! Command line configuration.
//!
//! Options can be given as arguments or through environment variables:
//! - `--names` / `STARBIT_NAMES`: field name lookup file
//! - `--threads` / `STARBIT_THREADS`: worker threads for `search`
//!
//! # Example
//!
//! ```
//! use clap::Parser;
//! use starbit_cli::{CliConfig, Command};
//!
//! let config = CliConfig::parse_from(["starbit", "--threads", "2", "hash", "l_id"]);
//! config.validate().unwrap();
//! assert!(matches!(config.command, Command::Hash { .. }));
//! ```

use crate::error::ConfigError;
use crate::search::SearchConfig;
use clap::{Parser, Subcommand};
use starbit_hash::{FieldNameTable, HashResult};
use std::path::PathBuf;

/// Largest accepted worker thread count
pub const MAX_THREADS: usize = 256;

/// Configuration loaded from CLI args and environment variables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "starbit",
    about = "Inspect Galaxy archives, BCSV tables, and message files",
    version
)]
pub struct CliConfig {
    /// Field name lookup file
    #[arg(long = "names", global = true, env = "STARBIT_NAMES")]
    pub names_file: Option<PathBuf>,

    /// Worker threads for bulk search
    #[arg(long, global = true, env = "STARBIT_THREADS", default_value_t = 4)]
    pub threads: usize,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the JMap hash of field names
    Hash {
        /// Names to hash
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// List the files in an archive
    Ls {
        /// Archive file, compressed or not
        archive: PathBuf,
    },

    /// Extract every file of an archive into a directory
    Extract {
        /// Archive file
        archive: PathBuf,
        /// Output directory
        output: PathBuf,
    },

    /// Dump a BCSV table
    Bcsv {
        /// Archive file
        archive: PathBuf,
        /// Table path inside the archive
        path: String,
    },

    /// Dump an MSBT message table
    Msbt {
        /// Archive file
        archive: PathBuf,
        /// Message file path inside the archive
        path: String,
    },

    /// Dump an MSBF flow graph
    Msbf {
        /// Archive file
        archive: PathBuf,
        /// Flow file path inside the archive
        path: String,
    },

    /// Search every archive below a directory
    Search {
        /// Directory to scan
        dir: PathBuf,
        /// Text or number to look for
        query: String,
        /// Stop after this many hits
        #[arg(long, default_value_t = 1000)]
        max_hits: usize,
    },

    /// Add field names to the lookup file
    Learn {
        /// Names to record
        #[arg(required = true)]
        names: Vec<String>,
    },
}

impl CliConfig {
    /// Parse configuration from command-line arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The thread count is zero or above [`MAX_THREADS`]
    /// - `learn` is used without a lookup file
    /// - `search` is given a hit limit of zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 || self.threads > MAX_THREADS {
            return Err(ConfigError::InvalidThreads(self.threads));
        }

        match &self.command {
            Command::Learn { .. } if self.names_file.is_none() => Err(
                ConfigError::MissingRequired("--names or STARBIT_NAMES for learn".to_string()),
            ),
            Command::Search { max_hits: 0, .. } => Err(ConfigError::InvalidMaxHits),
            _ => Ok(()),
        }
    }

    /// Load the default names plus the lookup file, if one is configured.
    pub fn load_names(&self) -> HashResult<FieldNameTable> {
        let mut names = FieldNameTable::with_defaults();
        if let Some(path) = &self.names_file {
            names.load(path)?;
        }
        Ok(names)
    }

    /// Search settings derived from the global options.
    #[must_use]
    pub fn search_config(&self, max_hits: usize) -> SearchConfig {
        SearchConfig::default()
            .with_threads(self.threads)
            .with_max_hits(max_hits)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_global_options_after_subcommand() {
        let config = CliConfig::parse_from(["starbit", "ls", "Stage.arc", "--json"]);
        assert!(config.json);
        assert_eq!(config.threads, 4);
        assert!(matches!(config.command, Command::Ls { .. }));
    }

    #[test]
    fn test_thread_bounds() {
        let config = CliConfig::parse_from(["starbit", "--threads", "0", "hash", "a"]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThreads(0))
        ));

        let config = CliConfig::parse_from(["starbit", "--threads", "1000", "hash", "a"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_learn_requires_names_file() {
        let config = CliConfig::parse_from(["starbit", "learn", "ScenarioNo"]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(_))
        ));

        let config = CliConfig::parse_from([
            "starbit",
            "--names",
            "names.txt",
            "learn",
            "ScenarioNo",
        ]);
        config.validate().unwrap();
    }

    #[test]
    fn test_search_limits() {
        let config = CliConfig::parse_from(["starbit", "search", ".", "Kuribo", "--max-hits", "0"]);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMaxHits)));

        let config = CliConfig::parse_from(["starbit", "--threads", "3", "search", ".", "Kuribo"]);
        config.validate().unwrap();
        let search = config.search_config(10);
        assert_eq!(search.threads, 3);
        assert_eq!(search.max_hits, 10);
    }

    #[test]
    fn test_load_names_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.txt");
        std::fs::write(&path, "# 00000000\nMyCustomField\n").unwrap();

        let config = CliConfig::parse_from([
            "starbit",
            "--names",
            path.to_str().unwrap(),
            "hash",
            "x",
        ]);
        let names = config.load_names().unwrap();
        assert_eq!(
            names.name_of(starbit_hash::field_name_to_hash("MyCustomField")),
            Some("MyCustomField")
        );
    }
}
