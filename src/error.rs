use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The caller was cancelled, or the limiter shut down, while waiting for a slot.
    #[error("Interrupted while waiting for admission")]
    InterruptedWait,

    #[error("Document submission failed: {0}")]
    SubmissionFailed(#[from] SubmitError),

    #[error("Initialization error: {0}")]
    Init(String),
}

/// Failure reported by a [`DocumentSubmitter`](crate::http::submitter::DocumentSubmitter).
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed : HTTP error code : {status}")]
    Status { status: u16, body: String },
}

pub type Result<T> = std::result::Result<T, AppError>;
