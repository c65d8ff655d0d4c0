pub mod channel;
pub mod frames;
pub mod payload;

pub use channel::*;
pub use frames::*;
pub use payload::*;
