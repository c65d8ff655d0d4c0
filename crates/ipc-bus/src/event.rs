use crate::endpoint::{Delivery, EndpointHandle, EndpointId};
use crate::error::BusResult;
use ipc_proto::Payload;
use tokio::sync::oneshot;

/// Originating-event surface a listener sees for one delivery.
///
/// Carries the sender's identity, a route for sending reply messages back to
/// the originating endpoint, and, for uncorrelated requests, the slot whose
/// value becomes the sender's synchronous return value.
#[derive(Debug)]
pub struct MessageEvent {
    from: EndpointHandle,
    local: EndpointHandle,
    return_slot: Option<oneshot::Sender<Payload>>,
}

impl MessageEvent {
    pub(crate) fn new(
        from: EndpointHandle,
        local: EndpointHandle,
        return_slot: Option<oneshot::Sender<Payload>>,
    ) -> Self {
        Self {
            from,
            local,
            return_slot,
        }
    }

    /// Identity of the endpoint that sent this message
    pub fn sender(&self) -> EndpointId {
        self.from.id()
    }

    /// Handle addressing the endpoint that sent this message
    pub fn sender_handle(&self) -> &EndpointHandle {
        &self.from
    }

    /// Send a message back to the originating endpoint.
    ///
    /// The reply is stamped with the receiving endpoint's identity, so the
    /// far side can validate who answered.
    pub fn reply(&self, channel: &str, payload: Payload) -> BusResult<()> {
        self.from.deliver(Delivery {
            channel: channel.to_string(),
            from: self.local.clone(),
            payload,
            return_slot: None,
        })
    }

    /// Whether the sender is waiting on the synchronous return-value slot
    pub fn has_return_slot(&self) -> bool {
        self.return_slot.is_some()
    }

    /// Settle the synchronous return-value slot.
    ///
    /// Returns false if there is no slot, or if it was already settled, or
    /// if the sender stopped waiting.
    pub fn set_return_value(&mut self, payload: Payload) -> bool {
        match self.return_slot.take() {
            Some(slot) => slot.send(payload).is_ok(),
            None => false,
        }
    }
}
