use kodi_core::{Dialect, UnknownDialect};
use thiserror::Error;

/// Failures that reject a whole statement before anything is persisted.
#[derive(Error, Debug)]
pub enum StatementError {
    #[error("Could not determine the statement format. Supported formats: {supported}")]
    FormatDetection { supported: String },
    #[error("{dialect} statement has {lines} usable line(s); expected a header and at least one transaction")]
    EmptyStatement { dialect: Dialect, lines: usize },
    #[error(transparent)]
    UnsupportedDialect(#[from] UnknownDialect),
}

impl StatementError {
    pub fn format_detection() -> Self {
        StatementError::FormatDetection {
            supported: Dialect::supported_list(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unrecognized date: '{0}'")]
pub struct DateParseError(pub String);

/// Why a single row was dropped. Logged, never propagated past the parser.
#[derive(Error, Debug)]
pub enum RowParseError {
    #[error(transparent)]
    InvalidDate(#[from] DateParseError),
    #[error("No amount could be resolved")]
    MissingAmount,
    #[error("Missing column: {0}")]
    MissingColumn(&'static str),
    #[error("Tokenize error: {0}")]
    Tokenize(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse matcher config: {0}")]
    Toml(#[from] toml::de::Error),
}
