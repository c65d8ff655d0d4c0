use ipc_bus::MessageEvent;
use ipc_proto::{IpcError, Payload, Value};
use std::fmt;
use std::future::Future;
use std::pin::Pin;

pub type HandlerResult = Result<HandlerReply, IpcError>;
pub type BoxReplyFuture = Pin<Box<dyn Future<Output = Result<Value, IpcError>> + Send + 'static>>;

/// How a registration treats a handler's deferred outcome.
///
/// The author of the handler must choose: pick `AwaitDeferred` when the
/// deferred value means "the operation is complete", `Immediate` when it
/// means "the operation is scheduled" and the reply must not wait for it
/// (e.g. a navigation that settles only when the page finishes loading).
/// Registering one channel under both modes is caller error; the bus keeps
/// whichever registration came last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Reply with the handler's outcome as-is; a deferred outcome is
    /// detached and acknowledged at once
    Immediate,
    /// Suspend this message's reply until the deferred outcome settles
    AwaitDeferred,
}

/// Outcome of one handler invocation
pub enum HandlerReply {
    /// A result that is already available
    Value(Value),
    /// Work that completes later
    Deferred(BoxReplyFuture),
}

impl HandlerReply {
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, IpcError>> + Send + 'static,
    {
        Self::Deferred(Box::pin(future))
    }
}

impl fmt::Debug for HandlerReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Deferred(_) => f.debug_tuple("Deferred").field(&"<future>").finish(),
        }
    }
}

/// Handler bound to an inbound command channel.
///
/// The call itself is synchronous; long-running work is expressed by
/// returning [`HandlerReply::Deferred`].
pub trait InboundHandler: Send + Sync + 'static {
    fn call(&self, event: &MessageEvent, args: Payload) -> HandlerResult;
}

impl<F> InboundHandler for F
where
    F: Fn(&MessageEvent, Payload) -> HandlerResult + Send + Sync + 'static,
{
    fn call(&self, event: &MessageEvent, args: Payload) -> HandlerResult {
        self(event, args)
    }
}
