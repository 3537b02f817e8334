/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server returned status {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("No authentication token found")]
    Unauthorized,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Whether repeating the same call could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Network(_) => true,
            AppError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
