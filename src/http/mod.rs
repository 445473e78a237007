//! HTTP serving: the listener adapter and the request handler.

pub mod handler;
pub mod listener;

pub use handler::{BroadcastFrameSource, FrameSource, RequestHandler};
pub use listener::{HyperListener, ListenerController, ListenerHandle};
