use thiserror::Error;

pub type Result<T> = std::result::Result<T, WordPressError>;

#[derive(Debug, Error)]
pub enum WordPressError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid site URL: {0}")]
    InvalidUrl(String),
}

impl WordPressError {
    /// Whether a retry could plausibly succeed. Timeouts, connection
    /// failures, rate limits, and 5xx responses are transient;
    /// authentication and payload errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            WordPressError::Network(_) => true,
            WordPressError::Api { status, .. } => *status == 429 || *status >= 500,
            WordPressError::Parse(_) | WordPressError::InvalidUrl(_) => false,
        }
    }
}

impl From<reqwest::Error> for WordPressError {
    fn from(err: reqwest::Error) -> Self {
        WordPressError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(WordPressError::Network("connection reset".into()).is_transient());
        assert!(WordPressError::Api {
            status: 503,
            message: "unavailable".into()
        }
        .is_transient());
        assert!(!WordPressError::Api {
            status: 401,
            message: "bad credentials".into()
        }
        .is_transient());
        assert!(!WordPressError::Api {
            status: 400,
            message: "malformed payload".into()
        }
        .is_transient());
    }
}
