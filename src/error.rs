//! Error types for the drive_index crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when talking to Google Drive.
///
/// Lookups that find nothing are not errors; they return `None`.
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("I/O error: {0}")]
    CredentialsFileError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    CredentialsParseError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid URL or ID: {0}")]
    InvalidUrlOrId(String),

    #[error("Remote title has no usable local file name: {0:?}")]
    InvalidFileName(String),

    #[error("File not found at {}", .0.display())]
    LocalFileNotFound(PathBuf),

    #[error("JWT encoding error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Token refresh failed: {0}")]
    TokenRefreshError(String),
}

/// Result type alias for DriveError.
pub type Result<T> = std::result::Result<T, DriveError>;
