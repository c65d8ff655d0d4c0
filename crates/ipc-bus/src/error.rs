//! Bus-local error types

use crate::endpoint::EndpointId;
use thiserror::Error;

pub type BusResult<T> = Result<T, BusError>;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("Endpoint {id} is gone")]
    EndpointGone { id: EndpointId },

    #[error("No return value produced on channel {channel}")]
    NoReturnValue { channel: String },
}

impl BusError {
    /// Check if the failure means the peer will never be reachable again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::EndpointGone { .. })
    }
}
