pub mod dispatcher;
pub mod handler;

pub use dispatcher::*;
pub use handler::*;
