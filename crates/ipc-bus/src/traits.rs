use crate::event::MessageEvent;
use async_trait::async_trait;
use ipc_proto::Payload;

/// Listener bound to a named channel on an endpoint.
///
/// Each delivery runs as its own task, so a listener that suspends only
/// delays its own message, never the endpoint's queue.
#[async_trait]
pub trait BusListener: Send + Sync + 'static {
    async fn on_message(&self, event: MessageEvent, payload: Payload);
}
