use serde::{Deserialize, Serialize};
use std::fmt;

pub type IpcResult<T> = Result<T, IpcError>;

/// Transport-safe error carried in reply frames.
///
/// The struct serializes with serde, so sending it across the channel and
/// decoding it on the other side reconstructs an error with the same code
/// and message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IpcError {
    /// Standardized error code
    pub code: IpcErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Additional error context/details
    pub data: Option<serde_json::Value>,
}

/// Standardized error codes
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum IpcErrorCode {
    // Frame/payload errors (1000-1999)
    InvalidFrame = 1000,
    InvalidParams = 1001,
    ParseError = 1002,

    // Dispatch errors (2000-2999)
    HandlerFailed = 2000,
    EndpointUnreachable = 2001,

    // Internal errors (3000-3999)
    InternalError = 3000,
}

impl IpcError {
    /// Create a new error
    pub fn new(code: IpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create an error with additional data
    pub fn with_data(
        code: IpcErrorCode,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    // Convenience constructors for common errors

    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::new(IpcErrorCode::InvalidFrame, message)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(IpcErrorCode::InvalidParams, message)
    }

    pub fn handler_failed(message: impl Into<String>) -> Self {
        Self::new(IpcErrorCode::HandlerFailed, message)
    }

    pub fn endpoint_unreachable(message: impl Into<String>) -> Self {
        Self::new(IpcErrorCode::EndpointUnreachable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(IpcErrorCode::InternalError, message)
    }

    /// Check if this error originated in a handler rather than the layer
    pub fn is_handler_error(&self) -> bool {
        self.code == IpcErrorCode::HandlerFailed
    }
}

impl fmt::Display for IpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code as u32, self.message)
    }
}

impl std::error::Error for IpcError {}

impl IpcErrorCode {
    /// Get human-readable description of the error code
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidFrame => "Message payload is not a valid frame",
            Self::InvalidParams => "Invalid frame parameters",
            Self::ParseError => "Value could not be decoded",
            Self::HandlerFailed => "Handler returned an error",
            Self::EndpointUnreachable => "Target endpoint is gone",
            Self::InternalError => "Internal correlation error",
        }
    }
}

impl fmt::Display for IpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code_and_message() {
        let err = IpcError::handler_failed("boom");
        assert_eq!(err.to_string(), "[2000] boom");
    }

    #[test]
    fn test_serde_round_trip_preserves_code_and_message() {
        let err = IpcError::with_data(
            IpcErrorCode::InvalidParams,
            "expected string at position 0",
            serde_json::json!({ "position": 0 }),
        );

        let encoded = serde_json::to_value(&err).unwrap();
        let decoded: IpcError = serde_json::from_value(encoded).unwrap();

        assert_eq!(decoded.code, err.code);
        assert_eq!(decoded.message, err.message);
        assert_eq!(decoded.data, err.data);
    }

    #[test]
    fn test_descriptions_are_non_empty() {
        for code in [
            IpcErrorCode::InvalidFrame,
            IpcErrorCode::InvalidParams,
            IpcErrorCode::ParseError,
            IpcErrorCode::HandlerFailed,
            IpcErrorCode::EndpointUnreachable,
            IpcErrorCode::InternalError,
        ] {
            assert!(!code.description().is_empty());
        }
    }
}
