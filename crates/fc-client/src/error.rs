//! Client-side error type.

/// Everything that can go wrong while talking to the server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Another upload from this coordinator has not finished yet.
    #[error("an upload is already in progress")]
    UploadInProgress,

    #[error("invalid upload path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Server {
        status: u16,
        code: Option<String>,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, ClientError>;
