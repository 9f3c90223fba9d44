use thiserror::Error;

/// Reasons a token could not be issued or a request could not be validated.
///
/// The `Display` strings are part of the public contract: callers surface
/// them verbatim in responses and tests assert on them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsrfError {
    #[error("Missing CSRF token")]
    MissingToken,

    #[error("Missing session ID")]
    MissingSession,

    #[error("Malformed token")]
    MalformedToken,

    /// Never issued, already consumed, or expired. The three cases are
    /// reported identically.
    #[error("Invalid session or token expired")]
    InvalidSession,

    #[error("Origin mismatch")]
    OriginMismatch,

    #[error("Invalid origin")]
    InvalidOrigin,

    #[error("Invalid token signature")]
    InvalidSignature,

    /// A signing backend could not produce a signature.
    #[error("Signing backend error: {0}")]
    Signing(String),

    #[error("Invalid CSRF configuration: {0}")]
    Config(String),
}

impl CsrfError {
    /// Create a signing backend error
    pub fn signing<S: Into<String>>(msg: S) -> Self {
        Self::Signing(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error was caused by the request rather than by the server.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Signing(_) | Self::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, CsrfError>;
