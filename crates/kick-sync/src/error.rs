use thiserror::Error;

/// Errors surfaced by the synchronization engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No credential is stored; the user must log in first.
    #[error("no authentication token")]
    NoCredential,

    /// The API rejected the credential (HTTP 401). The stored token has
    /// already been cleared by the time this error is observed.
    #[error("session expired")]
    AuthExpired,

    /// Non-success HTTP status other than 401.
    #[error("http status {0}")]
    HttpStatus(u16),

    /// Transport-level failure (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// Response body was not the expected JSON shape.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The cookie jar could not be read.
    #[error("cookie error: {0}")]
    Cookie(String),

    /// The login poller exhausted its attempts without seeing a cookie.
    #[error("login failed or session not set")]
    LoginTimeout,
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}
