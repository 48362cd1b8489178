//! Error types shared by every dweather crate.

use thiserror::Error;

/// Result type alias using DWeatherError.
pub type DWeatherResult<T> = Result<T, DWeatherError>;

/// Primary error type for snapshot-chain queries.
#[derive(Debug, Error)]
pub enum DWeatherError {
    // === Lookup Errors ===
    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Input out of range: {0}")]
    InputOutOfRange(String),

    #[error("Coordinate not found: {0}")]
    CoordinateNotFound(String),

    #[error("Date out of range: {0}")]
    DateOutOfRange(String),

    // === Data Errors ===
    #[error("Data malformed: {0}")]
    DataMalformed(String),

    #[error("Unit error: {0}")]
    Unit(String),

    #[error("Corrupt chain: {0}")]
    CorruptChain(String),

    // === Store Errors ===
    /// A path is absent under a snapshot. Callers translate this into the
    /// lookup error that fits their context.
    #[error("Not found: {path} under {id}")]
    NotFound { id: String, path: String },

    #[error("I/O failure: {0}")]
    Io(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DWeatherError {
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn input_out_of_range(msg: impl Into<String>) -> Self {
        Self::InputOutOfRange(msg.into())
    }

    pub fn coordinate_not_found(msg: impl Into<String>) -> Self {
        Self::CoordinateNotFound(msg.into())
    }

    pub fn date_out_of_range(msg: impl Into<String>) -> Self {
        Self::DateOutOfRange(msg.into())
    }

    pub fn data_malformed(msg: impl Into<String>) -> Self {
        Self::DataMalformed(msg.into())
    }

    pub fn unit(msg: impl Into<String>) -> Self {
        Self::Unit(msg.into())
    }

    pub fn not_found(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self::NotFound {
            id: id.into(),
            path: path.into(),
        }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Transport-level failures a caller may retry. Data errors are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DWeatherError::Io(_) | DWeatherError::Timeout(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DWeatherError::NotFound { .. })
    }

    /// Short machine-readable kind, used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            DWeatherError::Dataset(_) => "dataset",
            DWeatherError::InputOutOfRange(_) => "input_out_of_range",
            DWeatherError::CoordinateNotFound(_) => "coordinate_not_found",
            DWeatherError::DateOutOfRange(_) => "date_out_of_range",
            DWeatherError::DataMalformed(_) => "data_malformed",
            DWeatherError::Unit(_) => "unit",
            DWeatherError::CorruptChain(_) => "corrupt_chain",
            DWeatherError::NotFound { .. } => "not_found",
            DWeatherError::Io(_) => "io",
            DWeatherError::Timeout(_) => "timeout",
            DWeatherError::Config(_) => "config",
        }
    }
}

impl From<std::io::Error> for DWeatherError {
    fn from(err: std::io::Error) -> Self {
        DWeatherError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DWeatherError {
    fn from(err: serde_json::Error) -> Self {
        DWeatherError::DataMalformed(format!("JSON error: {}", err))
    }
}
