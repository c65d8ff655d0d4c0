use crate::bus::BusInner;
use crate::error::{BusError, BusResult};
use crate::event::MessageEvent;
use crate::traits::BusListener;
use ipc_proto::Payload;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Identity of a bus endpoint, unique for the lifetime of the bus
pub type EndpointId = u64;

/// One queued message on its way to an endpoint
#[derive(Debug)]
pub(crate) struct Delivery {
    pub(crate) channel: String,
    pub(crate) from: EndpointHandle,
    pub(crate) payload: Payload,
    pub(crate) return_slot: Option<oneshot::Sender<Payload>>,
}

/// Addressable identity of an endpoint: its id plus a route to its inbox.
///
/// Handles stay valid after the endpoint is dropped; delivering to one then
/// fails with [`BusError::EndpointGone`].
#[derive(Clone, Debug)]
pub struct EndpointHandle {
    id: EndpointId,
    inbox: mpsc::UnboundedSender<Delivery>,
}

impl EndpointHandle {
    pub fn id(&self) -> EndpointId {
        self.id
    }

    pub(crate) fn deliver(&self, delivery: Delivery) -> BusResult<()> {
        self.inbox
            .send(delivery)
            .map_err(|_| BusError::EndpointGone { id: self.id })
    }
}

pub(crate) struct EndpointInner {
    id: EndpointId,
    listeners: Mutex<HashMap<String, Arc<dyn BusListener>>>,
    inbox: mpsc::UnboundedSender<Delivery>,
    bus: Arc<BusInner>,
}

impl EndpointInner {
    fn listeners(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn BusListener>>> {
        self.listeners.lock().expect("listener table lock poisoned")
    }

    fn handle(&self) -> EndpointHandle {
        EndpointHandle {
            id: self.id,
            inbox: self.inbox.clone(),
        }
    }
}

impl Drop for EndpointInner {
    fn drop(&mut self) {
        self.bus.remove(self.id);
    }
}

/// A registered participant on a [`LocalBus`](crate::bus::LocalBus).
///
/// Cloning is cheap and clones address the same endpoint. Dropping the last
/// clone unregisters the endpoint and stops its delivery pump.
#[derive(Clone)]
pub struct Endpoint {
    inner: Arc<EndpointInner>,
}

impl Endpoint {
    pub(crate) fn create(bus: Arc<BusInner>, id: EndpointId) -> Self {
        let (inbox, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(EndpointInner {
            id,
            listeners: Mutex::new(HashMap::new()),
            inbox,
            bus,
        });
        tokio::spawn(pump(Arc::downgrade(&inner), rx));
        Self { inner }
    }

    pub fn id(&self) -> EndpointId {
        self.inner.id
    }

    /// Handle other endpoints can use to address this one
    pub fn handle(&self) -> EndpointHandle {
        self.inner.handle()
    }

    pub fn downgrade(&self) -> WeakEndpoint {
        WeakEndpoint {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Bind a listener to a named channel.
    ///
    /// At most one listener per channel: registering again replaces the
    /// previous listener.
    pub fn subscribe<L: BusListener>(&self, channel: &str, listener: L) {
        self.inner
            .listeners()
            .insert(channel.to_string(), Arc::new(listener));
    }

    /// Remove the listener bound to a channel, if any
    pub fn unsubscribe(&self, channel: &str) -> bool {
        self.inner.listeners().remove(channel).is_some()
    }

    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.inner.listeners().contains_key(channel)
    }

    /// Channels that currently have a listener bound
    pub fn channels(&self) -> Vec<String> {
        self.inner.listeners().keys().cloned().collect()
    }

    /// Directed send to a single endpoint
    pub fn send_to(
        &self,
        target: &EndpointHandle,
        channel: &str,
        payload: Payload,
    ) -> BusResult<()> {
        target.deliver(Delivery {
            channel: channel.to_string(),
            from: self.handle(),
            payload,
            return_slot: None,
        })
    }

    /// Directed send that waits for the receiver to settle the return-value
    /// slot, the in-process rendition of a synchronous call.
    ///
    /// Fails with [`BusError::NoReturnValue`] if the receiver drops the
    /// event without setting a value (no listener, or an async-only one).
    pub async fn send_sync(
        &self,
        target: &EndpointHandle,
        channel: &str,
        payload: Payload,
    ) -> BusResult<Payload> {
        let (slot, settled) = oneshot::channel();
        target.deliver(Delivery {
            channel: channel.to_string(),
            from: self.handle(),
            payload,
            return_slot: Some(slot),
        })?;
        settled.await.map_err(|_| BusError::NoReturnValue {
            channel: channel.to_string(),
        })
    }

    /// Send to every other endpoint registered on the bus.
    ///
    /// Returns the number of endpoints the message was queued for. Stale
    /// registrations are skipped rather than failing the whole broadcast.
    pub fn broadcast(&self, channel: &str, payload: Payload) -> BusResult<usize> {
        let mut delivered = 0;
        for handle in self.inner.bus.handles_except(self.id()) {
            let ok = handle
                .deliver(Delivery {
                    channel: channel.to_string(),
                    from: self.handle(),
                    payload: payload.clone(),
                    return_slot: None,
                })
                .is_ok();
            if ok {
                delivered += 1;
            }
        }
        Ok(delivered)
    }
}

/// Weak reference to an endpoint, for listeners that must not keep their own
/// endpoint alive
pub struct WeakEndpoint {
    inner: Weak<EndpointInner>,
}

impl WeakEndpoint {
    pub fn upgrade(&self) -> Option<Endpoint> {
        self.inner.upgrade().map(|inner| Endpoint { inner })
    }
}

/// Delivery pump: picks deliveries off the inbox in order and dispatches
/// each one as its own task.
async fn pump(inner: Weak<EndpointInner>, mut rx: mpsc::UnboundedReceiver<Delivery>) {
    while let Some(delivery) = rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };

        let listener = inner.listeners().get(&delivery.channel).cloned();
        match listener {
            Some(listener) => {
                let event =
                    MessageEvent::new(delivery.from, inner.handle(), delivery.return_slot);
                tokio::spawn(async move {
                    listener.on_message(event, delivery.payload).await;
                });
            }
            None => {
                // Unsubscribed or never-registered channel: this layer
                // drops the message.
                debug!(
                    endpoint = inner.id,
                    channel = %delivery.channel,
                    "message on channel with no listener"
                );
            }
        }
    }
}
