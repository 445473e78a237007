//! Error taxonomy and the reporter callback used to surface failures.

use crate::server::Phase;
use std::net::SocketAddr;

/// Failure raised by the server core or the listener layer.
///
/// Every error is either *fixable* (the caller may retry with adjusted
/// parameters) or *fatal* (the instance should be destroyed and recreated).
/// Use [`ServerError::is_fixable`] to tell them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// The requested address is already bound by another process.
    /// Fixable: retry `start` with a different port.
    AddrInUse(SocketAddr),
    /// Port outside the allowed [1025, 65535] range. Rejected before any
    /// bind attempt.
    InvalidPort(u32),
    /// The listener failed to bind for a reason other than a busy address.
    Bind { addr: SocketAddr, message: String },
    /// An event arrived in a phase that does not allow it.
    IllegalTransition { phase: Phase, event: &'static str },
    /// A named asset is missing or empty.
    AssetMissing(String),
    /// An asset that must be UTF-8 text could not be decoded.
    AssetInvalid(String),
    /// The actor's event queue is closed or full; the instance is unusable.
    EventQueueUnavailable,
    /// Unexpected internal failure.
    Internal(String),
}

impl ServerError {
    /// Whether the caller can recover by retrying with different parameters.
    pub fn is_fixable(&self) -> bool {
        matches!(self, ServerError::AddrInUse(_))
    }

    /// Whether the instance should be treated as unusable.
    pub fn is_fatal(&self) -> bool {
        !self.is_fixable()
    }
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::AddrInUse(addr) => write!(f, "address already in use: {}", addr),
            ServerError::InvalidPort(port) => {
                write!(f, "port {} outside allowed range [1025, 65535]", port)
            }
            ServerError::Bind { addr, message } => {
                write!(f, "failed to bind {}: {}", addr, message)
            }
            ServerError::IllegalTransition { phase, event } => {
                write!(f, "event '{}' not allowed in phase {:?}", event, phase)
            }
            ServerError::AssetMissing(name) => write!(f, "asset '{}' missing or empty", name),
            ServerError::AssetInvalid(name) => write!(f, "asset '{}' is not valid UTF-8", name),
            ServerError::EventQueueUnavailable => write!(f, "server event queue unavailable"),
            ServerError::Internal(message) => write!(f, "internal server error: {}", message),
        }
    }
}

impl std::error::Error for ServerError {}

/// Callback through which the server surfaces failures to its owner.
///
/// Every error is reported exactly once per occurrence. The reporter runs
/// on the actor task; implementations must not block.
pub trait ErrorReporter: Send + Sync {
    /// Receive one error occurrence.
    fn report(&self, error: ServerError);
}

/// Reporter that forwards errors to the `tracing` log, fixable ones as
/// warnings and fatal ones as errors.
#[derive(Debug, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, error: ServerError) {
        if error.is_fixable() {
            tracing::warn!("recoverable server error: {}", error);
        } else {
            tracing::error!("fatal server error: {}", error);
        }
    }
}
