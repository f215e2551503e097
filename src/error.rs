use http::StatusCode;
use thiserror::Error;

/// Errors raised by the relay itself, before or instead of an upstream response.
///
/// Upstream responses with a non-success status are not errors here: they are
/// relayed with their original status.
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    /// A required path parameter was empty or absent
    #[error("Missing required parameter: {name}")]
    MissingParameter { name: &'static str },

    /// A path parameter was present but could not be decoded
    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// The uploaded form did not carry an acceptable room file
    #[error("{0}")]
    InvalidUpload(String),

    /// The multipart body could not be read (malformed, or over the size limit)
    #[error("{message}")]
    Multipart { status: StatusCode, message: String },

    /// The upstream request failed before a response was received
    #[error("{0}")]
    Transport(String),
}

/// Errors building the upstream client
#[derive(Debug, Error)]
pub enum UpstreamConfigError {
    /// The base URL could not be parsed
    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL cannot have paths appended to it
    #[error("Upstream URL cannot be used as a base: {0}")]
    NotABase(String),

    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl RelayError {
    /// Wrap a transport-level failure from the upstream client, with its causes.
    pub fn transport(err: reqwest::Error) -> Self {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = std::error::Error::source(cause);
        }
        RelayError::Transport(message)
    }

    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingParameter { .. }
            | RelayError::InvalidParameter { .. }
            | RelayError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            RelayError::Multipart { status, .. } => *status,
            RelayError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for RelayError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        RelayError::Multipart {
            status: err.status(),
            message: format!("Failed to read upload: {}", err.body_text()),
        }
    }
}

impl From<axum::extract::multipart::MultipartRejection> for RelayError {
    fn from(err: axum::extract::multipart::MultipartRejection) -> Self {
        RelayError::InvalidUpload(format!("Expected a multipart form: {}", err.body_text()))
    }
}
