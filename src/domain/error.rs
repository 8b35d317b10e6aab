//! Domain error types.

/// Top-level error type for ticksim.
#[derive(Debug, thiserror::Error)]
pub enum TicksimError {
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

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no tick data for {instrument}")]
    NoData { instrument: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TicksimError> for std::process::ExitCode {
    fn from(err: &TicksimError) -> Self {
        let code: u8 = match err {
            TicksimError::Io(_) => 1,
            TicksimError::ConfigParse { .. }
            | TicksimError::ConfigMissing { .. }
            | TicksimError::ConfigInvalid { .. } => 2,
            TicksimError::Data { .. } | TicksimError::NoData { .. } => 3,
            TicksimError::Report { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
