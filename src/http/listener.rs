//! Binding and tearing down the network listener.
//!
//! The lifecycle actor only ever sees the [`ListenerController`] trait, so
//! the state machine and its tests stay independent of hyper. The
//! production implementation runs one accept loop per started listener
//! and one hyper http1 connection per accepted socket.

use crate::content::templates::ServedContent;
use crate::error::{ErrorReporter, ServerError};
use crate::http::handler::{FrameSource, RequestHandler};
use crate::settings::BindAddress;
use crate::stats::StatisticsSink;
use async_trait::async_trait;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// How long `stop` waits for in-flight connections before aborting them.
/// MJPEG connections are effectively endless, so this is a drain for the
/// page/asset requests, not a promise to finish streams.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(3);

/// How long `stop` waits for the accept task itself.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to one live listener. Returned by [`ListenerController::start`]
/// and consumed by [`ListenerController::stop`].
#[derive(Debug)]
pub struct ListenerHandle {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Assemble a handle from its parts. Implementations of
    /// [`ListenerController`] build one per successful start.
    pub fn new(
        local_addr: SocketAddr,
        shutdown: watch::Sender<bool>,
        accept_task: JoinHandle<()>,
    ) -> Self {
        Self {
            local_addr,
            shutdown,
            accept_task,
        }
    }

    /// Address the listener actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// Narrow adapter between the lifecycle actor and the serving machinery.
#[async_trait]
pub trait ListenerController: Send + Sync {
    /// Bind `address` and serve `content` until stopped.
    ///
    /// The port must be in [1025, 65535]; a violation is a fatal
    /// configuration error raised before any bind attempt. An address
    /// already in use is a fixable error; any other bind failure is
    /// fatal. Failures observed later by the serving layer go through
    /// `errors`, never to the caller directly.
    async fn start(
        &self,
        address: BindAddress,
        content: ServedContent,
        frames: Arc<dyn FrameSource>,
        statistics: Arc<dyn StatisticsSink>,
        errors: Arc<dyn ErrorReporter>,
    ) -> Result<ListenerHandle, ServerError>;

    /// Tear a listener down: best effort, bounded wait, never fails.
    /// Must tolerate sub-resources that are already gone.
    async fn stop(&self, handle: ListenerHandle);
}

/// Production listener: tokio `TcpListener` + hyper http1.
#[derive(Debug, Default)]
pub struct HyperListener;

#[async_trait]
impl ListenerController for HyperListener {
    async fn start(
        &self,
        address: BindAddress,
        content: ServedContent,
        frames: Arc<dyn FrameSource>,
        statistics: Arc<dyn StatisticsSink>,
        errors: Arc<dyn ErrorReporter>,
    ) -> Result<ListenerHandle, ServerError> {
        let addr = address.validate()?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                ServerError::AddrInUse(addr)
            } else {
                ServerError::Bind {
                    addr,
                    message: e.to_string(),
                }
            }
        })?;
        let local_addr = listener.local_addr().map_err(|e| ServerError::Bind {
            addr,
            message: e.to_string(),
        })?;
        info!("listening on http://{}", local_addr);

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let handler = Arc::new(RequestHandler::new(content, frames, statistics));
        let accept_task = tokio::spawn(async move {
            let mut connections = JoinSet::new();
            loop {
                tokio::select! {
                    // A dropped sender counts as shutdown too.
                    _ = shutdown_rx.changed() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, remote)) => {
                            let io = TokioIo::new(stream);
                            let handler = handler.clone();
                            connections.spawn(async move {
                                let service = service_fn(move |req| {
                                    let handler = handler.clone();
                                    async move {
                                        Ok::<_, Infallible>(handler.handle(req, remote).await)
                                    }
                                });
                                if let Err(err) =
                                    http1::Builder::new().serve_connection(io, service).await
                                {
                                    debug!("connection from {} ended: {:?}", remote, err);
                                }
                            });
                        }
                        Err(e) => {
                            warn!("accept failed: {}", e);
                            errors.report(ServerError::Internal(format!(
                                "accept failed: {}",
                                e
                            )));
                        }
                    }
                }
            }
            // Close the socket before draining so no new clients sneak in.
            drop(listener);
            let drain = async {
                while connections.join_next().await.is_some() {}
            };
            if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
                debug!("aborting connections still open after {:?}", DRAIN_TIMEOUT);
            }
        });

        Ok(ListenerHandle::new(local_addr, shutdown, accept_task))
    }

    async fn stop(&self, handle: ListenerHandle) {
        let ListenerHandle {
            local_addr,
            shutdown,
            mut accept_task,
        } = handle;

        if shutdown.send(true).is_err() {
            debug!("listener at {} already shut down", local_addr);
        }
        match tokio::time::timeout(STOP_TIMEOUT, &mut accept_task).await {
            Ok(Ok(())) => info!("listener at {} stopped", local_addr),
            Ok(Err(join_error)) => {
                warn!("listener task at {} ended abnormally: {}", local_addr, join_error);
            }
            Err(_) => {
                warn!("listener at {} did not stop in time, aborting", local_addr);
                accept_task.abort();
            }
        }
    }
}
