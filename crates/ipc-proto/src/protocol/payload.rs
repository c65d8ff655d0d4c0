use crate::error::{IpcError, IpcErrorCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Unit of payload data carried on the channel.
pub type Value = serde_json::Value;

/// Ordered sequence of values carried by a single message.
///
/// Positional access replaces untyped variadic arguments: each channel
/// documents which position holds what, and `arg` decodes a position into a
/// concrete type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Payload(Vec<Value>);

impl Payload {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a value at the next position
    pub fn push(&mut self, value: impl Into<Value>) {
        self.0.push(value.into());
    }

    /// Borrow the value at a position
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Decode the value at a position into a concrete type
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T, IpcError> {
        let value = self.0.get(index).ok_or_else(|| {
            IpcError::new(
                IpcErrorCode::InvalidParams,
                format!("missing argument at position {}", index),
            )
        })?;
        serde_json::from_value(value.clone()).map_err(|e| {
            IpcError::new(
                IpcErrorCode::InvalidParams,
                format!("argument at position {} has wrong type: {}", index, e),
            )
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the payload, yielding its values in order
    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for Payload {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for Payload {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Payload {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Build a [`Payload`] from a list of JSON-convertible expressions
#[macro_export]
macro_rules! payload {
    () => {
        $crate::protocol::Payload::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::protocol::Payload::from(vec![$(::serde_json::json!($value)),+])
    };
}
