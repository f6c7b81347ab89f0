use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemGitError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited by the API, try again later")]
    RateLimited,

    #[error("network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("could not render image: {0}")]
    Render(String),

    #[error("config line {line}: {reason}")]
    ConfigParse { line: usize, reason: String },

    #[error("invalid navigation: {0}")]
    Navigation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemGitError {
    /// Map an HTTP status to the matching remote error.
    pub fn from_status(status: u16, context: &str) -> Self {
        match status {
            404 => RemGitError::NotFound(context.to_string()),
            403 | 429 => RemGitError::RateLimited,
            _ => RemGitError::Api(format!("{} returned HTTP {}", context, status)),
        }
    }
}

impl From<reqwest::Error> for RemGitError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return RemGitError::Network("request timed out".to_string());
        }
        match err.status() {
            Some(status) => RemGitError::from_status(status.as_u16(), "request"),
            None => RemGitError::Network(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, RemGitError>;
