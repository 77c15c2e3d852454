use thiserror::Error;

/// Fallback text when neither the server nor the failure carries a message.
pub const UNKNOWN_ERROR: &str = "unknown error";

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Connectivity problem or timeout before a response was read.
    #[error("network error: {message}")]
    Network { message: String },

    /// Non-2xx response; `message` comes from the server body when it has one.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// 2xx response whose envelope reports a failure.
    #[error("{message}")]
    Rejected { message: String },

    /// Response shape the client cannot make sense of.
    #[error("malformed response: {message}")]
    Malformed { message: String },

    /// Rejected before any request was sent.
    #[error("{message}")]
    InvalidInput { message: String },

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ClientError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed { message: message.into() }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into() }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_request() {
            Self::Network { message: e.to_string() }
        } else if e.is_decode() || e.is_body() {
            Self::Malformed { message: e.to_string() }
        } else {
            Self::Network { message: e.to_string() }
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed { message: e.to_string() }
    }
}
