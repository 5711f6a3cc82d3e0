//! Backend error taxonomy shared by every adapter and data-access function.
//!
//! ERROR HANDLING
//! ==============
//! Adapters convert transport, status and decode failures into
//! [`BackendError`] at the call site. Nothing above the adapter layer inspects
//! raw HTTP or websocket errors; callers branch on variants or on the
//! grepable code from [`ErrorCode`].

/// Grepable error code and retryable flag for structured error reporting.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// A configuration value is missing or could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success HTTP status.
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The operation requires a signed-in user and there is none.
    #[error("not authenticated")]
    Unauthenticated,

    /// The realtime socket failed to connect, join, or stay open.
    #[error("realtime error: {0}")]
    Realtime(String),
}

impl ErrorCode for BackendError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "E_CONFIG",
            Self::Request(_) => "E_REQUEST",
            Self::Status { .. } => "E_STATUS",
            Self::Decode(_) => "E_DECODE",
            Self::Unauthenticated => "E_UNAUTHENTICATED",
            Self::Realtime(_) => "E_REALTIME",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Realtime(_) | Self::Status { status: 429 | 500..=599, .. })
    }
}

#[cfg(feature = "native")]
impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() { Self::Decode(e.to_string()) } else { Self::Request(e.to_string()) }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
