use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sheets API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Document is not a native Google spreadsheet")]
    NotNativeSpreadsheet,
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(_) | Self::Http(_) => true,
            Self::Csv(e) => e.is_io_error(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::PermissionDenied(_) | Self::NotNativeSpreadsheet | Self::Config(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
