//! Error taxonomy shared by the HTTP client, the token store and the session.

/// Errors produced by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("server returned status {status}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The operation needs a loaded user and there is none.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Reading or writing the persisted token slot failed.
    #[error("token storage failed: {0}")]
    Storage(#[from] std::io::Error),

    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    Config(String),
}

impl SessionError {
    /// True for a 401 response, meaning the held token was rejected.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }

    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
