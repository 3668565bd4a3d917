use thiserror::Error;

#[derive(Error, Debug)]
pub enum BaselineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid measurement at row {row}: {reason}")]
    InvalidMeasurement { row: usize, reason: String },

    #[error("{component} id {value} exceeds its digit budget (max {max})")]
    GroupKeyOverflow {
        component: &'static str,
        value: u64,
        max: u64,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Reference epoch service error: {0}")]
    ReferenceService(String),

    #[error("Reference epoch lookup timed out after {attempts} attempt(s)")]
    ReferenceTimeout { attempts: usize },

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, BaselineError>;
