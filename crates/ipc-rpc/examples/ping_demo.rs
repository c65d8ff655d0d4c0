//! Minimal end-to-end walkthrough: a controller endpoint calling into a
//! content endpoint over the in-process bus.
//!
//! Run with: cargo run -p ipc-rpc --example ping_demo

use ipc_bus::{LocalBus, MessageEvent};
use ipc_proto::{payload, IpcError, Payload};
use ipc_rpc::{Correlator, Dispatcher, HandlerReply};

#[tokio::main]
async fn main() {
    let bus = LocalBus::new();
    let controller = bus.endpoint();
    let content = bus.endpoint();

    // Content side: register handlers.
    let dispatcher = Dispatcher::new(content.clone());
    dispatcher.handle("ping", |_event: &MessageEvent, _args: Payload| {
        Ok(HandlerReply::value("pong"))
    });
    dispatcher.handle("add", |_event: &MessageEvent, args: Payload| {
        let a: i64 = args.arg(0)?;
        let b: i64 = args.arg(1)?;
        Ok(HandlerReply::value(a + b))
    });
    dispatcher.handle("fail", |_event: &MessageEvent, _args: Payload| {
        Err(IpcError::handler_failed("this command always fails"))
    });

    // Controller side: issue correlated calls.
    let correlator = Correlator::new(controller);
    let target = content.handle();

    let pong: String = correlator
        .call(&target, false, "ping", payload![])
        .await
        .expect("ping should resolve");
    println!("ping      -> {}", pong);

    let sum: i64 = correlator
        .call(&target, false, "add", payload![20, 22])
        .await
        .expect("add should resolve");
    println!("add 20 22 -> {}", sum);

    match correlator.call_value(&target, false, "fail", payload![]).await {
        Ok(value) => println!("fail      -> unexpected success: {}", value),
        Err(error) => println!("fail      -> rejected as expected: {}", error),
    }
}
