//! Server lifecycle: phases, events, and the actor that owns the state.

pub mod actor;
pub mod state;

pub use actor::StreamServer;
pub use state::Phase;
