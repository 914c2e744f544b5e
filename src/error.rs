//! Error types shared by the codec, reader and orchestration layers.

/// Why a single log line could not become a [`Record`](crate::record::Record).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid timestamp {0:?}, expected YYYY-MM-DD HH:MM:SS")]
    InvalidTimestamp(String),

    #[error("invalid value {0:?}")]
    InvalidValue(String),

    #[error("measurement name is empty")]
    EmptyMeasurement,

    #[error("{field} contains {found:?}, which cannot be stored in a log line")]
    ForbiddenCharacter { field: &'static str, found: char },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: ParseError,
    },

    #[error("invalid record: {0}")]
    Record(#[from] ParseError),

    #[error("failed to load configuration")]
    Config(#[from] config::ConfigError),

    #[error("delimiter must be exactly one character, got {0:?}")]
    InvalidDelimiter(String),

    #[error("unknown {kind} {value:?}")]
    UnknownMode { kind: &'static str, value: String },
}

impl Error {
    /// True for per-line failures that a skipping reader may drop.
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
