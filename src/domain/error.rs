//! Domain error types.

/// Top-level error type for ramtrader.
#[derive(Debug, thiserror::Error)]
pub enum RamtraderError {
    #[error("failed to load {path}: {reason}")]
    DataLoad { path: String, reason: String },

    #[error("invalid data for {symbol}: {reason}")]
    DataInvalid { symbol: String, reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    /// A position manager operation was called from the wrong state.
    #[error("invalid state: cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RamtraderError {
    pub(crate) fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        RamtraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&RamtraderError> for std::process::ExitCode {
    fn from(err: &RamtraderError) -> Self {
        let code: u8 = match err {
            RamtraderError::Io(_) | RamtraderError::Csv(_) => 1,
            RamtraderError::ConfigParse { .. }
            | RamtraderError::ConfigMissing { .. }
            | RamtraderError::ConfigInvalid { .. } => 2,
            RamtraderError::InvalidState { .. } => 3,
            RamtraderError::DataLoad { .. }
            | RamtraderError::DataInvalid { .. }
            | RamtraderError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
