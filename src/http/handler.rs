//! Request routing for the generated pages, asset bytes, the PIN gate,
//! and the MJPEG multipart stream.

use crate::content::templates::{self, ServedContent};
use crate::stats::{StatisticEvent, StatisticsSink};
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::StreamExt;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::Frame;
use hyper::{header, Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::{BroadcastStream, ReceiverStream};
use tracing::debug;

/// Multipart boundary between MJPEG frames.
const FRAME_BOUNDARY: &str = "screenserve-frame";

/// One client's view of the frame sequence.
pub type FrameStream = BoxStream<'static, Bytes>;

/// Source of encoded JPEG frames.
///
/// The sequence is lazy, unbounded, and not restartable; how frames are
/// produced (capture, encoding) is entirely outside this crate. Each
/// connected client opens its own view through [`FrameSource::frames`].
pub trait FrameSource: Send + Sync {
    /// Open a stream of frames for one client.
    fn frames(&self) -> FrameStream;
}

/// Frame source fanning published frames out to every connected client
/// over a tokio broadcast channel. Clients that fall behind skip frames
/// instead of stalling the publisher.
pub struct BroadcastFrameSource {
    frames: broadcast::Sender<Bytes>,
}

impl BroadcastFrameSource {
    /// Create a source buffering up to `capacity` frames per client.
    pub fn new(capacity: usize) -> Self {
        let (frames, _) = broadcast::channel(capacity);
        Self { frames }
    }

    /// Publish one encoded frame to all connected clients. A frame
    /// published while nobody is connected is simply dropped.
    pub fn publish(&self, frame: Bytes) {
        let _ = self.frames.send(frame);
    }
}

impl FrameSource for BroadcastFrameSource {
    fn frames(&self) -> FrameStream {
        BroadcastStream::new(self.frames.subscribe())
            .filter_map(|frame| async move { frame.ok() })
            .boxed()
    }
}

type HandlerBody = BoxBody<Bytes, Infallible>;

/// Routes requests against one captured [`ServedContent`].
///
/// Constructed by the listener at start with the artifacts derived by the
/// most recent configure; a later configure only takes effect through a
/// stop/start cycle, which builds a fresh handler.
pub struct RequestHandler {
    content: ServedContent,
    frames: Arc<dyn FrameSource>,
    statistics: Arc<dyn StatisticsSink>,
}

impl RequestHandler {
    /// Create a handler serving the given content.
    pub fn new(
        content: ServedContent,
        frames: Arc<dyn FrameSource>,
        statistics: Arc<dyn StatisticsSink>,
    ) -> Self {
        Self {
            content,
            frames,
            statistics,
        }
    }

    /// Handle one request. Never fails; every outcome is a response.
    pub async fn handle<B>(&self, req: Request<B>, remote: SocketAddr) -> Response<HandlerBody> {
        if req.method() != Method::GET {
            return text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        }

        let path = req.uri().path();
        // PIN submissions arrive as a query, so the gate matches on the
        // full path-and-query target.
        let target = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or(templates::DEFAULT_HTML_ADDRESS);
        debug!("GET {} from {}", target, remote);

        if path == templates::FAVICON_ADDRESS {
            return bytes_response(self.content.favicon.clone(), "image/x-icon");
        }
        if path == templates::LOGO_ADDRESS {
            return bytes_response(self.content.logo.clone(), "image/png");
        }
        if path == self.content.stream_path {
            return self.stream_response(remote);
        }

        if !self.content.pin_enabled {
            if path == templates::DEFAULT_HTML_ADDRESS {
                return html_response(&self.content.index_html);
            }
            return text_response(StatusCode::NOT_FOUND, "Not Found");
        }

        if target == self.content.pin_path {
            return html_response(&self.content.index_html);
        }
        if target == templates::DEFAULT_HTML_ADDRESS {
            return html_response(&self.content.pin_entry_html);
        }
        if target.starts_with(templates::DEFAULT_PIN_ADDRESS) {
            self.statistics.record(StatisticEvent::WrongPinAttempt(remote));
            return html_response(&self.content.pin_error_html);
        }
        text_response(StatusCode::NOT_FOUND, "Not Found")
    }

    /// Open the MJPEG stream: a pump task turns the client's frame stream
    /// into boundary-delimited `image/jpeg` parts until the client hangs
    /// up or the source ends.
    fn stream_response(&self, remote: SocketAddr) -> Response<HandlerBody> {
        self.statistics.record(StatisticEvent::ClientConnected(remote));

        let mut frames = self.frames.frames();
        let statistics = self.statistics.clone();
        let (parts, body_rx) = mpsc::channel::<Result<Frame<Bytes>, Infallible>>(2);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    next = frames.next() => match next {
                        Some(jpeg) => {
                            let part = multipart_frame(&jpeg);
                            let sent = part.len() as u64;
                            if parts.send(Ok(Frame::data(part))).await.is_err() {
                                break;
                            }
                            statistics.record(StatisticEvent::TrafficBytes(remote, sent));
                        }
                        None => break,
                    },
                    _ = parts.closed() => break,
                }
            }
            statistics.record(StatisticEvent::ClientDisconnected(remote));
        });

        // StreamBody is both a Stream and a Body; name the trait so
        // `boxed` is unambiguous.
        let body = BodyExt::boxed(StreamBody::new(ReceiverStream::new(body_rx)));
        Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/x-mixed-replace; boundary={}", FRAME_BOUNDARY),
            )
            .header(header::CACHE_CONTROL, "no-cache, private")
            .header(header::PRAGMA, "no-cache")
            .header(header::CONNECTION, "close")
            .body(body)
            .unwrap()
    }
}

/// One boundary-delimited multipart part wrapping a JPEG frame.
fn multipart_frame(jpeg: &Bytes) -> Bytes {
    let head = format!(
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        FRAME_BOUNDARY,
        jpeg.len()
    );
    let mut part = BytesMut::with_capacity(head.len() + jpeg.len() + 2);
    part.put_slice(head.as_bytes());
    part.put_slice(jpeg);
    part.put_slice(b"\r\n");
    part.freeze()
}

fn html_response(content: &str) -> Response<HandlerBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Full::new(Bytes::copy_from_slice(content.as_bytes())).boxed())
        .unwrap()
}

fn bytes_response(bytes: Bytes, content_type: &str) -> Response<HandlerBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .body(Full::new(bytes).boxed())
        .unwrap()
}

fn text_response(status: StatusCode, message: &str) -> Response<HandlerBody> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Full::new(Bytes::copy_from_slice(message.as_bytes())).boxed())
        .unwrap()
}
