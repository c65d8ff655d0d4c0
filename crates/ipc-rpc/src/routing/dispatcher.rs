use crate::routing::handler::{DispatchMode, HandlerReply, InboundHandler};
use async_trait::async_trait;
use ipc_bus::{BusListener, Endpoint, MessageEvent};
use ipc_proto::{response_channel, IpcError, Payload, ReplyFrame, RequestFrame, Value};
use tracing::{debug, warn};

/// Binds inbound command channels to handlers and turns every outcome into
/// a reply.
///
/// Handler failures never propagate past the dispatcher: they become a
/// serialized-error reply to the caller.
pub struct Dispatcher {
    endpoint: Endpoint,
}

impl Dispatcher {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Bind `handler` to `channel` under an explicit dispatch mode
    pub fn register<H: InboundHandler>(&self, channel: &str, mode: DispatchMode, handler: H) {
        debug!(channel, ?mode, "registering handler");
        self.endpoint.subscribe(
            channel,
            Registration {
                channel: channel.to_string(),
                mode,
                handler,
            },
        );
    }

    /// Bind a handler whose deferred outcome means "scheduled", not "done"
    pub fn handle<H: InboundHandler>(&self, channel: &str, handler: H) {
        self.register(channel, DispatchMode::Immediate, handler);
    }

    /// Bind a handler whose deferred outcome must settle before the reply
    pub fn handle_await<H: InboundHandler>(&self, channel: &str, handler: H) {
        self.register(channel, DispatchMode::AwaitDeferred, handler);
    }

    /// Remove the handler bound to a channel, if any
    pub fn unregister(&self, channel: &str) -> bool {
        self.endpoint.unsubscribe(channel)
    }
}

struct Registration<H> {
    channel: String,
    mode: DispatchMode,
    handler: H,
}

impl<H: InboundHandler> Registration<H> {
    async fn run_handler(&self, event: &MessageEvent, args: Payload) -> Result<Value, IpcError> {
        match self.handler.call(event, args) {
            Ok(HandlerReply::Value(value)) => Ok(value),
            Ok(HandlerReply::Deferred(future)) => match self.mode {
                DispatchMode::AwaitDeferred => future.await,
                DispatchMode::Immediate => {
                    // The deferred computation keeps running detached; its
                    // outcome has no reply to land in.
                    let channel = self.channel.clone();
                    tokio::spawn(async move {
                        if let Err(error) = future.await {
                            debug!(
                                channel = %channel,
                                error = %error,
                                "detached deferred computation failed"
                            );
                        }
                    });
                    Ok(Value::Null)
                }
            },
            Err(error) => Err(error),
        }
    }
}

#[async_trait]
impl<H: InboundHandler> BusListener for Registration<H> {
    async fn on_message(&self, mut event: MessageEvent, payload: Payload) {
        let frame = match RequestFrame::from_payload(payload) {
            Ok(frame) => frame,
            Err(error) => {
                warn!(
                    channel = %self.channel,
                    error = %error,
                    "dropping malformed request frame"
                );
                return;
            }
        };

        let reply = match self.run_handler(&event, frame.args).await {
            Ok(result) => ReplyFrame::ok(result),
            Err(error) => {
                debug!(
                    channel = %self.channel,
                    error = %error,
                    "handler failed, replying with serialized error"
                );
                ReplyFrame::err(error)
            }
        };

        let reply_payload = match reply.into_payload() {
            Ok(payload) => payload,
            Err(error) => {
                warn!(channel = %self.channel, error = %error, "reply not serializable");
                return;
            }
        };

        match frame.request_id {
            Some(request_id) => {
                let reply_channel = response_channel(&self.channel, request_id);
                if let Err(error) = event.reply(&reply_channel, reply_payload) {
                    warn!(
                        channel = %reply_channel,
                        error = %error,
                        "failed to deliver reply"
                    );
                }
            }
            None => {
                if !event.set_return_value(reply_payload) {
                    debug!(
                        channel = %self.channel,
                        "uncorrelated request had no return slot, reply dropped"
                    );
                }
            }
        }
    }
}
