use thiserror::Error;

/// Main error type for the caption server
#[derive(Error, Debug)]
pub enum CaptionError {
    /// Required request input is missing or malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// The watch page could not be loaded or rendered in time
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// A caption payload could not be retrieved
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The browser engine refused a command or a session could not be opened
    #[error("Browser error: {0}")]
    Browser(String),

    /// Screenshot capture failed
    #[error("Screenshot error: {0}")]
    Screenshot(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptionError {
    /// Whether this error should reach the client as a 4xx response
    pub fn is_client_error(&self) -> bool {
        matches!(self, CaptionError::Validation(_))
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CaptionError>;
