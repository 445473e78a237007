//! Per-event traffic statistics emitted by the request-handling layer.

use std::net::SocketAddr;

/// One statistic record. Emitted by the request handler as clients come
/// and go; aggregation happens outside the server core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticEvent {
    /// A client opened the MJPEG stream.
    ClientConnected(SocketAddr),
    /// A client's stream connection ended.
    ClientDisconnected(SocketAddr),
    /// Payload bytes written to a stream client.
    TrafficBytes(SocketAddr, u64),
    /// A client submitted a wrong PIN.
    WrongPinAttempt(SocketAddr),
}

/// Sink for statistic records.
///
/// Runs on connection tasks; implementations must be cheap and must not
/// block. The sink is shared as an `Arc` and may be dropped by its owner
/// independently of the server lifecycle.
pub trait StatisticsSink: Send + Sync {
    /// Receive one statistic record.
    fn record(&self, event: StatisticEvent);
}

/// Sink that emits statistics as `tracing` debug events.
#[derive(Debug, Default)]
pub struct LogStatistics;

impl StatisticsSink for LogStatistics {
    fn record(&self, event: StatisticEvent) {
        match event {
            StatisticEvent::ClientConnected(addr) => {
                tracing::debug!("stream client connected: {}", addr);
            }
            StatisticEvent::ClientDisconnected(addr) => {
                tracing::debug!("stream client disconnected: {}", addr);
            }
            StatisticEvent::TrafficBytes(addr, bytes) => {
                tracing::trace!("sent {} bytes to {}", bytes, addr);
            }
            StatisticEvent::WrongPinAttempt(addr) => {
                tracing::debug!("wrong PIN attempt from {}", addr);
            }
        }
    }
}
