use crate::error::types::{IpcError, IpcErrorCode};

/// Convert from common error types
impl From<std::io::Error> for IpcError {
    fn from(err: std::io::Error) -> Self {
        IpcError::with_data(
            IpcErrorCode::InternalError,
            format!("I/O error: {}", err),
            serde_json::json!({ "io_error": err.to_string() }),
        )
    }
}

impl From<serde_json::Error> for IpcError {
    fn from(err: serde_json::Error) -> Self {
        IpcError::with_data(
            IpcErrorCode::ParseError,
            format!("JSON decoding error: {}", err),
            serde_json::json!({ "json_error": err.to_string() }),
        )
    }
}

/// Helper trait for converting Results
pub trait MapIpcError<T> {
    fn map_ipc_error(self, code: IpcErrorCode, message: &str) -> Result<T, IpcError>;
}

impl<T, E> MapIpcError<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn map_ipc_error(self, code: IpcErrorCode, message: &str) -> Result<T, IpcError> {
        self.map_err(|e| IpcError::new(code, format!("{}: {}", message, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_maps_to_parse_error() {
        let err = serde_json::from_str::<u64>("not a number").unwrap_err();
        let ipc: IpcError = err.into();
        assert_eq!(ipc.code, IpcErrorCode::ParseError);
        assert!(ipc.data.is_some());
    }

    #[test]
    fn test_map_ipc_error_prefixes_message() {
        let res: Result<(), &str> = Err("inner");
        let err = res
            .map_ipc_error(IpcErrorCode::InvalidParams, "decoding argument")
            .unwrap_err();
        assert_eq!(err.code, IpcErrorCode::InvalidParams);
        assert_eq!(err.message, "decoding argument: inner");
    }
}
