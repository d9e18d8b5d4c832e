//! Command-line argument parsing for deskdb.

use clap::{Parser, Subcommand, ValueEnum};
use deskdb::config::Config;
use std::path::PathBuf;

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table.
    #[default]
    Table,
    /// Pretty-printed JSON.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: table or json")),
        }
    }
}

/// Run SQL against desktop database files.
#[derive(Parser, Debug)]
#[command(name = "deskdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true, value_name = "PATH", env = "DESKDB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format (overrides config)
    #[arg(long, global = true, value_enum, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one statement and close the database
    Run {
        /// Database file
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// SQL statement
        #[arg(value_name = "SQL")]
        sql: String,
    },

    /// Keep a database open and read statements from stdin
    Shell {
        /// Database file
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Refresh linked tables and report the outcome
    Refresh {
        /// Database file
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path, using the default if not specified.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Output format from the flag, falling back to the config file.
    pub fn output_format(&self, config: &Config) -> OutputFormat {
        self.format
            .or_else(|| config.output.format.parse().ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["deskdb", "run", "people.db", "SELECT * FROM People"])
            .unwrap();
        match cli.command {
            Command::Run { path, sql } => {
                assert_eq!(path, PathBuf::from("people.db"));
                assert_eq!(sql, "SELECT * FROM People");
            }
            other => panic!("Expected Run, got {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "deskdb",
            "shell",
            "people.db",
            "--format",
            "json",
            "--log-file",
            "/tmp/deskdb.log",
        ])
        .unwrap();

        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/deskdb.log")));
        assert!(matches!(cli.command, Command::Shell { .. }));
    }

    #[test]
    fn test_output_format_falls_back_to_config() {
        let cli = Cli::try_parse_from(["deskdb", "refresh", "people.db"]).unwrap();
        let mut config = Config::default();
        assert_eq!(cli.output_format(&config), OutputFormat::Table);

        config.output.format = "json".to_string();
        assert_eq!(cli.output_format(&config), OutputFormat::Json);
    }

    #[test]
    fn test_missing_sql_is_rejected() {
        assert!(Cli::try_parse_from(["deskdb", "run", "people.db"]).is_err());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("csv".parse::<OutputFormat>().is_err());
    }
}
