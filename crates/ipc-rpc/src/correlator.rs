use async_trait::async_trait;
use ipc_bus::{BusListener, Endpoint, EndpointHandle, EndpointId, MessageEvent, WeakEndpoint};
use ipc_proto::{response_channel, IpcError, IpcErrorCode, Payload, ReplyFrame, RequestFrame, Value};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::{error, warn};

type PendingMap = HashMap<String, PendingCall>;

/// Bookkeeping for one outstanding call: who is allowed to answer, and
/// where the answer goes.
struct PendingCall {
    expected: EndpointId,
    settle: oneshot::Sender<Result<Value, IpcError>>,
}

/// Issues correlated calls to remote endpoints.
///
/// Owns its request-id counter, so ids are unique and strictly increasing
/// per correlator instance for the life of the process. A call with no
/// correctly-sourced reply stays pending indefinitely; bounding the wait is
/// the caller's concern.
pub struct Correlator {
    endpoint: Endpoint,
    next_id: AtomicU64,
    pending: Arc<Mutex<PendingMap>>,
}

impl Correlator {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            next_id: AtomicU64::new(0),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Number of calls still waiting on a reply
    pub fn pending_calls(&self) -> usize {
        lock_pending(&self.pending).len()
    }

    /// Call a command on `target` and decode the reply into `T`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        target: &EndpointHandle,
        broadcast: bool,
        command: &str,
        args: Payload,
    ) -> Result<T, IpcError> {
        let value = self.call_value(target, broadcast, command, args).await?;
        serde_json::from_value(value).map_err(|e| {
            IpcError::new(
                IpcErrorCode::ParseError,
                format!("reply to {} does not decode into the requested type: {}", command, e),
            )
        })
    }

    /// Call a command on `target`, resolving with the raw reply value.
    ///
    /// With `broadcast` set the request goes to every other endpoint on the
    /// bus; only a reply stamped with `target`'s identity settles the call,
    /// anything else is reported and ignored.
    pub async fn call_value(
        &self,
        target: &EndpointHandle,
        broadcast: bool,
        command: &str,
        args: Payload,
    ) -> Result<Value, IpcError> {
        let request_id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let reply_channel = response_channel(command, request_id);

        // Pending record and listener both exist before the request leaves,
        // so a reply cannot arrive unmatched however fast the far side is.
        let (settle, settled) = oneshot::channel();
        lock_pending(&self.pending).insert(
            reply_channel.clone(),
            PendingCall {
                expected: target.id(),
                settle,
            },
        );
        self.endpoint.subscribe(
            &reply_channel,
            ReplyListener {
                command: command.to_string(),
                channel: reply_channel.clone(),
                pending: Arc::clone(&self.pending),
                endpoint: self.endpoint.downgrade(),
            },
        );

        let frame = RequestFrame::correlated(request_id, args);
        let sent = if broadcast {
            self.endpoint
                .broadcast(command, frame.into_payload())
                .map(|_| ())
        } else {
            self.endpoint.send_to(target, command, frame.into_payload())
        };

        if let Err(send_error) = sent {
            lock_pending(&self.pending).remove(&reply_channel);
            self.endpoint.unsubscribe(&reply_channel);
            return Err(IpcError::endpoint_unreachable(format!(
                "sending {} to endpoint {}: {}",
                command,
                target.id(),
                send_error
            )));
        }

        match settled.await {
            Ok(outcome) => outcome,
            // Only reachable if the correlator's pending table is torn down
            // while the call is in flight.
            Err(_) => Err(IpcError::internal(format!(
                "reply channel for {} closed before settlement",
                command
            ))),
        }
    }
}

/// One-shot listener for a single derived reply channel.
struct ReplyListener {
    command: String,
    channel: String,
    pending: Arc<Mutex<PendingMap>>,
    endpoint: WeakEndpoint,
}

#[async_trait]
impl BusListener for ReplyListener {
    async fn on_message(&self, event: MessageEvent, payload: Payload) {
        let frame = match ReplyFrame::from_payload(payload) {
            Ok(frame) => frame,
            Err(decode_error) => {
                // Noise, not an answer: the call stays pending.
                warn!(
                    command = %self.command,
                    error = %decode_error,
                    "ignoring malformed reply"
                );
                return;
            }
        };

        let call = {
            let mut pending = lock_pending(&self.pending);
            match pending.get(&self.channel) {
                None => return,
                Some(call) if call.expected != event.sender() => {
                    let expected = call.expected;
                    drop(pending);
                    error!(
                        command = %self.command,
                        expected,
                        sender = event.sender(),
                        "reply sent by unexpected endpoint"
                    );
                    return;
                }
                Some(_) => {}
            }

            // Correctly-sourced reply: retire the pending call and the
            // listener together, then settle outside the lock.
            let call = pending.remove(&self.channel);
            if let Some(endpoint) = self.endpoint.upgrade() {
                endpoint.unsubscribe(&self.channel);
            }
            call
        };

        if let Some(call) = call {
            let _ = call.settle.send(frame.into_result());
        }
    }
}

fn lock_pending(pending: &Mutex<PendingMap>) -> MutexGuard<'_, PendingMap> {
    pending.lock().expect("pending-call table lock poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipc_bus::LocalBus;
    use ipc_proto::payload;
    use tokio::sync::mpsc;

    /// Captures request frames and answers each one with its own request id
    struct IdEcho;

    #[async_trait]
    impl BusListener for IdEcho {
        async fn on_message(&self, event: MessageEvent, payload: Payload) {
            let frame = RequestFrame::from_payload(payload).unwrap();
            let id = frame.request_id.unwrap();
            let reply = ReplyFrame::ok(id).into_payload().unwrap();
            event.reply(&response_channel("next-id", id), reply).unwrap();
        }
    }

    #[tokio::test]
    async fn test_request_ids_start_at_one_and_increase() {
        let bus = LocalBus::new();
        let caller = bus.endpoint();
        let callee = bus.endpoint();
        callee.subscribe("next-id", IdEcho);

        let correlator = Correlator::new(caller);
        for expected in 1u64..=3 {
            let id: u64 = correlator
                .call(&callee.handle(), false, "next-id", payload![])
                .await
                .unwrap();
            assert_eq!(id, expected);
        }
        assert_eq!(correlator.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_calls_get_unique_ids() {
        let bus = LocalBus::new();
        let caller = bus.endpoint();
        let callee = bus.endpoint();
        callee.subscribe("next-id", IdEcho);

        let correlator = Arc::new(Correlator::new(caller));
        let target = callee.handle();

        let (tx, mut rx) = mpsc::unbounded_channel();
        for _ in 0..10 {
            let correlator = Arc::clone(&correlator);
            let target = target.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let id: u64 = correlator
                    .call(&target, false, "next-id", payload![])
                    .await
                    .unwrap();
                tx.send(id).unwrap();
            });
        }
        drop(tx);

        let mut ids = Vec::new();
        while let Some(id) = rx.recv().await {
            ids.push(id);
        }
        ids.sort_unstable();
        assert_eq!(ids, (1u64..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_send_failure_cleans_up_the_pending_call() {
        let bus = LocalBus::new();
        let caller = bus.endpoint();
        let callee = bus.endpoint();
        let stale = callee.handle();

        // Stop the callee's pump so delivery fails outright.
        drop(callee);
        let probe = bus.endpoint();
        let _ = probe.send_to(&stale, "wake", payload![]);
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }

        let correlator = Correlator::new(caller.clone());
        let err = correlator
            .call_value(&stale, false, "ping", payload![])
            .await
            .unwrap_err();

        assert_eq!(err.code, IpcErrorCode::EndpointUnreachable);
        assert_eq!(correlator.pending_calls(), 0);
        assert!(!caller.is_subscribed("ping_RESPONSE_1"));
    }
}
