//! Request/reply correlation over a fire-and-forget message bus
//!
//! Two cooperating halves: the [`Dispatcher`] binds named handlers on the
//! receiving side and turns every outcome into a reply tuple; the
//! [`Correlator`] issues calls, tags each with a unique request id, and
//! settles the caller's future when a correctly-sourced reply arrives on
//! the derived reply channel.

#![forbid(unsafe_code)]

pub mod correlator;
pub mod routing;

pub use correlator::*;
pub use routing::*;
