//! Shared error type across mbridge crates.

use thiserror::Error;

/// Stable, machine-readable failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Endpoint address could not be turned into a connection.
    BadAddress,
    /// Connection refused, dropped, or timed out.
    TransportFailure,
    /// Reply had no recognizable type, or an unexpected shape.
    ProtocolDecode,
    /// Bridge answered with an ERROR envelope.
    RemoteError,
    /// A numeric payload token did not parse.
    MalformedNumber,
    /// Invalid configuration value.
    BadConfig,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal failure (runtime setup, I/O).
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and tests.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadAddress => "BAD_ADDRESS",
            ErrorCode::TransportFailure => "TRANSPORT_FAILURE",
            ErrorCode::ProtocolDecode => "PROTOCOL_DECODE",
            ErrorCode::RemoteError => "REMOTE_ERROR",
            ErrorCode::MalformedNumber => "MALFORMED_NUMBER",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Unified error type used by core and client.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error("bad address: {0}")]
    BadAddress(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("protocol decode failure: {0}")]
    Protocol(String),
    #[error("remote error: {0}")]
    Remote(String),
    #[error("malformed numeric token for `{key}`: {token:?}")]
    MalformedNumber { key: String, token: String },
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            BridgeError::BadAddress(_) => ErrorCode::BadAddress,
            BridgeError::Transport(_) => ErrorCode::TransportFailure,
            BridgeError::Protocol(_) => ErrorCode::ProtocolDecode,
            BridgeError::Remote(_) => ErrorCode::RemoteError,
            BridgeError::MalformedNumber { .. } => ErrorCode::MalformedNumber,
            BridgeError::BadConfig(_) => ErrorCode::BadConfig,
            BridgeError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            BridgeError::Internal(_) => ErrorCode::Internal,
        }
    }
}
