use crate::error::{IpcError, IpcErrorCode};
use crate::protocol::payload::{Payload, Value};
use serde::{Deserialize, Serialize};

/// Inbound request as seen by a dispatcher.
///
/// Wire shape is the positional tuple `[request_id | null, ...args]` on the
/// command's channel. A request without an id expects its reply through the
/// originating event's return-value slot instead of a reply channel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RequestFrame {
    pub request_id: Option<u64>,
    pub args: Payload,
}

impl RequestFrame {
    /// Request expecting a correlated reply message
    pub fn correlated(request_id: u64, args: Payload) -> Self {
        Self {
            request_id: Some(request_id),
            args,
        }
    }

    /// Request expecting its reply through the synchronous return slot
    pub fn fire_and_forget(args: Payload) -> Self {
        Self {
            request_id: None,
            args,
        }
    }

    /// Encode to the positional wire tuple
    pub fn into_payload(self) -> Payload {
        let mut values = Vec::with_capacity(self.args.len() + 1);
        values.push(match self.request_id {
            Some(id) => Value::from(id),
            None => Value::Null,
        });
        values.extend(self.args);
        Payload::from(values)
    }

    /// Decode from the positional wire tuple.
    ///
    /// A leading `null` or `0` means uncorrelated.
    pub fn from_payload(payload: Payload) -> Result<Self, IpcError> {
        let mut values = payload.into_values().into_iter();
        let head = values
            .next()
            .ok_or_else(|| IpcError::invalid_frame("request frame is empty"))?;

        let request_id = match head {
            Value::Null => None,
            Value::Number(n) => match n.as_u64() {
                Some(0) => None,
                Some(id) => Some(id),
                None => {
                    return Err(IpcError::new(
                        IpcErrorCode::InvalidFrame,
                        format!("request id is not a non-negative integer: {}", n),
                    ));
                }
            },
            other => {
                return Err(IpcError::new(
                    IpcErrorCode::InvalidFrame,
                    format!("request id slot holds a {}", type_name(&other)),
                ));
            }
        };

        Ok(Self {
            request_id,
            args: values.collect(),
        })
    }
}

/// Outcome of a handled request.
///
/// Wire shape matches the originating implementation's reply tuples:
/// `[error]` on failure and `[null, result]` on success.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReplyFrame {
    pub error: Option<IpcError>,
    pub result: Value,
}

impl ReplyFrame {
    /// Successful reply carrying a result value
    pub fn ok(result: impl Into<Value>) -> Self {
        Self {
            error: None,
            result: result.into(),
        }
    }

    /// Failed reply carrying a transport-safe error
    pub fn err(error: IpcError) -> Self {
        Self {
            error: Some(error),
            result: Value::Null,
        }
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    /// Encode to the positional wire tuple
    pub fn into_payload(self) -> Result<Payload, IpcError> {
        match self.error {
            Some(error) => {
                let serialized = serde_json::to_value(&error)?;
                Ok(Payload::from(vec![serialized]))
            }
            None => Ok(Payload::from(vec![Value::Null, self.result])),
        }
    }

    /// Decode from the positional wire tuple
    pub fn from_payload(payload: Payload) -> Result<Self, IpcError> {
        if payload.is_empty() || payload.len() > 2 {
            return Err(IpcError::new(
                IpcErrorCode::InvalidFrame,
                format!("reply frame has {} elements", payload.len()),
            ));
        }

        let mut values = payload.into_values().into_iter();
        let head = values.next().unwrap_or(Value::Null);

        match head {
            Value::Null => Ok(Self {
                error: None,
                result: values.next().unwrap_or(Value::Null),
            }),
            serialized => {
                let error: IpcError = serde_json::from_value(serialized).map_err(|e| {
                    IpcError::new(
                        IpcErrorCode::InvalidFrame,
                        format!("reply error slot is not a serialized error: {}", e),
                    )
                })?;
                Ok(Self {
                    error: Some(error),
                    result: Value::Null,
                })
            }
        }
    }

    /// Collapse into the caller-facing result
    pub fn into_result(self) -> Result<Value, IpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload;

    #[test]
    fn test_correlated_request_round_trip() {
        let frame = RequestFrame::correlated(7, payload!["a", 1]);
        let decoded = RequestFrame::from_payload(frame.clone().into_payload()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_uncorrelated_request_encodes_null_head() {
        let wire = RequestFrame::fire_and_forget(payload![true]).into_payload();
        assert_eq!(wire.get(0), Some(&Value::Null));

        let decoded = RequestFrame::from_payload(wire).unwrap();
        assert_eq!(decoded.request_id, None);
    }

    #[test]
    fn test_zero_request_id_decodes_as_uncorrelated() {
        let decoded = RequestFrame::from_payload(payload![0, "arg"]).unwrap();
        assert_eq!(decoded.request_id, None);
        assert_eq!(decoded.args.arg::<String>(0).unwrap(), "arg");
    }

    #[test]
    fn test_empty_request_payload_is_invalid() {
        let err = RequestFrame::from_payload(Payload::new()).unwrap_err();
        assert_eq!(err.code, IpcErrorCode::InvalidFrame);
    }

    #[test]
    fn test_non_numeric_request_id_is_invalid() {
        let err = RequestFrame::from_payload(payload!["nope"]).unwrap_err();
        assert_eq!(err.code, IpcErrorCode::InvalidFrame);
    }

    #[test]
    fn test_success_reply_is_two_element_tuple() {
        let wire = ReplyFrame::ok("pong").into_payload().unwrap();
        assert_eq!(wire.len(), 2);
        assert_eq!(wire.get(0), Some(&Value::Null));

        let decoded = ReplyFrame::from_payload(wire).unwrap();
        assert!(!decoded.is_err());
        assert_eq!(decoded.result, Value::from("pong"));
    }

    #[test]
    fn test_error_reply_is_single_element_tuple() {
        let wire = ReplyFrame::err(IpcError::handler_failed("boom"))
            .into_payload()
            .unwrap();
        assert_eq!(wire.len(), 1);

        let decoded = ReplyFrame::from_payload(wire).unwrap();
        let err = decoded.into_result().unwrap_err();
        assert_eq!(err.code, IpcErrorCode::HandlerFailed);
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn test_oversized_reply_payload_is_invalid() {
        let err = ReplyFrame::from_payload(payload![Value::Null, 1, 2]).unwrap_err();
        assert_eq!(err.code, IpcErrorCode::InvalidFrame);
    }

    #[test]
    fn test_garbage_error_slot_is_invalid() {
        let err = ReplyFrame::from_payload(payload!["not an error"]).unwrap_err();
        assert_eq!(err.code, IpcErrorCode::InvalidFrame);
    }
}
