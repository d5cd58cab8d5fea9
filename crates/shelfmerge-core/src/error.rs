use std::path::PathBuf;

use thiserror::Error;

/// All errors that can occur in shelfmerge-core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Landing directory does not exist: {0}")]
    LandingDirNotFound(PathBuf),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Quality gate failed: {0}")]
    Quality(#[from] QualityViolation),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// A blocking quality check that failed, with the value it measured.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QualityViolation {
    #[error("title coverage {ratio:.3} is below the minimum {threshold:.3}")]
    TitleCoverage { ratio: f64, threshold: f64 },

    #[error("isbn13 is not unique: {duplicated_rows} rows share a value (e.g. {sample:?})")]
    DuplicateIsbn13 {
        duplicated_rows: usize,
        sample: Vec<String>,
    },

    #[error("{count} negative price values (min {min})")]
    NegativePrice { count: usize, min: f64 },
}

/// Exit codes of the command-line tool.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidArgs = 3,
    FileSystemError = 4,
    NetworkError = 6,
    QualityGate = 9,
}

impl CoreError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Quality(_) => ExitCode::QualityGate,
            Self::ConfigError(_) | Self::TomlParse(_) => ExitCode::InvalidArgs,
            Self::LandingDirNotFound(_) | Self::Io(_) => ExitCode::FileSystemError,
            _ => ExitCode::GeneralError,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
