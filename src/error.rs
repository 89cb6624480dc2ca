//! Error types for matting and upscaling operations
//!
//! Provider failures are classified exactly once, at the adapter boundary,
//! into a closed [`ProviderErrorKind`]. Nothing downstream re-derives the
//! classification from message text.

use thiserror::Error;

use crate::types::MattingMethod;

/// Result type alias for matting operations
pub type Result<T, E = MattingError> = std::result::Result<T, E>;

/// Classified failure kind reported by a remote provider adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Invalid, missing, or rejected credentials
    Auth,
    /// Out of credits, rate limited, or quota exceeded
    Quota,
    /// Connection, DNS, TLS, or timeout failure (transient, eligible for fallback)
    Network,
    /// Provider rejected the image (size, resolution, format)
    Unsupported,
    /// Anything the adapter could not classify
    Unknown,
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Auth => "auth",
            Self::Quota => "quota",
            Self::Network => "network",
            Self::Unsupported => "unsupported",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A single classified provider failure
#[derive(Debug, Clone, Error)]
#[error("provider '{provider}' failed ({kind}): {message}")]
pub struct ProviderFailure {
    /// Human-readable provider name (e.g. "pixelcut")
    pub provider: String,
    /// Classified failure kind
    pub kind: ProviderErrorKind,
    /// Diagnostic message from the adapter
    pub message: String,
}

impl ProviderFailure {
    /// Create a new classified provider failure
    pub fn new<P: Into<String>, M: Into<String>>(
        provider: P,
        kind: ProviderErrorKind,
        message: M,
    ) -> Self {
        Self {
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }
}

/// One recorded attempt in an exhausted fallback chain
#[derive(Debug, Clone)]
pub struct AttemptFailure {
    /// Method that was attempted
    pub method: MattingMethod,
    /// Classified failure kind
    pub kind: ProviderErrorKind,
    /// Diagnostic message
    pub message: String,
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.method, self.kind, self.message)
    }
}

/// Errors produced by the matting pipeline
#[derive(Debug, Error)]
pub enum MattingError {
    /// Malformed input image; fatal, never retried
    #[error("decode error: {0}")]
    Decode(String),

    /// Pixel buffer violates the `len == w*h*4` invariant
    #[error("invalid pixel buffer: {0}")]
    InvalidBuffer(String),

    /// Invalid request parameters
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Image re-encoding failed
    #[error("encode error: {0}")]
    Encode(String),

    /// A remote provider failed (surfaced only outside a fallback chain)
    #[error(transparent)]
    Provider(#[from] ProviderFailure),

    /// Every method in the fallback chain failed
    #[error("all matting methods exhausted after {} attempts", attempts.len())]
    AllMethodsExhausted {
        /// Each attempted method with its classified failure, in order
        attempts: Vec<AttemptFailure>,
    },

    /// The caller cancelled the request mid-chain
    #[error("matting cancelled by caller")]
    Cancelled,
}

impl MattingError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new invalid buffer error
    pub fn invalid_buffer<S: Into<String>>(msg: S) -> Self {
        Self::InvalidBuffer(msg.into())
    }

    /// Create a new invalid request error
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }
}

/// Errors produced by the upscale decision engine
#[derive(Debug, Error)]
pub enum UpscaleError {
    /// Invalid request parameters or malformed buffer
    #[error("invalid upscale request: {0}")]
    InvalidRequest(String),

    /// The AI upscale provider failed and no local fallback was possible
    #[error(transparent)]
    Provider(#[from] ProviderFailure),

    /// Local resampling failed; always fatal, never expected for valid input
    #[error("local resample failed: {0}")]
    Resample(String),
}

impl UpscaleError {
    /// Create a new invalid request error
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a new resample error
    pub fn resample<S: Into<String>>(msg: S) -> Self {
        Self::Resample(msg.into())
    }
}
