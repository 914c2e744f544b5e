//! Configuration management.
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. Defaults embedded in the binary (`config/default.toml`)
//! 2. `tallylog.toml` in the working directory, if present
//! 3. A user file passed with `--config`
//! 4. Environment variables prefixed with `TALLYLOG_` (e.g. `TALLYLOG_LOG_PATH`)
//! 5. Command-line arguments

use std::path::PathBuf;

use clap::Args;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::reader::ErrorPolicy;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");
const LOCAL_CONFIG: &str = "tallylog.toml";

/// Options shared by every subcommand.
#[derive(Args, Debug, Default, Clone)]
pub struct CliArgs {
    /// Path to a configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log file path
    #[arg(short, long, env = "TALLYLOG_FILE", global = true)]
    pub file: Option<PathBuf>,

    /// Field delimiter (a single character)
    #[arg(long, global = true)]
    pub delimiter: Option<String>,

    /// Skip malformed lines instead of stopping at the first one
    #[arg(long, global = true)]
    pub skip_invalid: bool,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub log: LogSettings,
    pub reader: ReaderSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    /// Path of the measurement log
    pub path: PathBuf,
    /// Field separator, must be exactly one character
    pub delimiter: String,
}

#[derive(Debug, Deserialize)]
pub struct ReaderSettings {
    #[serde(default)]
    pub policy: ErrorPolicy,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Settings {
    pub fn new(cli: &CliArgs) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(PathBuf::from(LOCAL_CONFIG)).required(false));

        if let Some(ref path) = cli.config {
            builder = builder.add_source(File::from(path.clone()));
        }

        builder = builder.add_source(Environment::with_prefix("TALLYLOG").separator("_"));

        if let Some(ref file) = cli.file {
            builder = builder.set_override("log.path", file.to_string_lossy().as_ref())?;
        }
        if let Some(ref delimiter) = cli.delimiter {
            builder = builder.set_override("log.delimiter", delimiter.as_str())?;
        }
        if cli.skip_invalid {
            builder = builder.set_override("reader.policy", "skip")?;
        }

        builder.build()?.try_deserialize()
    }

    /// The configured delimiter as a single character.
    pub fn delimiter(&self) -> Result<char> {
        let mut chars = self.log.delimiter.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(Error::InvalidDelimiter(self.log.delimiter.clone())),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log: LogSettings {
                path: PathBuf::from("health.log"),
                delimiter: "\t".to_string(),
            },
            reader: ReaderSettings {
                policy: ErrorPolicy::Abort,
            },
            logging: LoggingSettings {
                level: "warn".to_string(),
            },
        }
    }
}
