// Error types for the weft framework

use thiserror::Error;

/// Everything a handler, middleware step, or framework operation can fail
/// with. A failure returned from a handler stops the chain and is passed to
/// the view's error handler exactly once.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid redirect code {0}")]
    InvalidRedirectCode(u16),

    #[error("no template engine configured")]
    NoTemplateEngine,

    #[error("render error: {0}")]
    Render(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("{0}")]
    Handler(String),
}

impl Error {
    /// Create a free-form handler error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Error::Handler(message.into())
    }
}
