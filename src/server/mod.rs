//! SSE server driver.
//!
//! [`SseServer`] owns one background task that drains pushed [`Message`]s
//! onto a byte sink in push order, flushing after each so events reach the
//! peer without buffering delay. [`handshake`] builds the one-time response
//! head the caller sends before any event.

use crate::error::Error;
use crate::shared::{EventStream, Message};
use crate::MEDIA_TYPE;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Build the SSE handshake response head.
///
/// Status 200 with `Content-Type: text/event-stream`,
/// `Cache-Control: no-cache` and `Connection: keep-alive`. The caller sends
/// this head exactly once, flushing it before any event is pushed, so
/// intermediaries start forwarding bytes immediately. On sinks without
/// flush semantics, flushing is a no-op, never an error.
///
/// # Examples
///
/// ```rust
/// let head = sseflow::handshake();
/// assert_eq!(head.status(), 200);
/// assert_eq!(head.headers()["content-type"], "text/event-stream");
/// ```
pub fn handshake() -> http::Response<()> {
    let mut response = http::Response::new(());
    *response.status_mut() = http::StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static(MEDIA_TYPE),
    );
    headers.insert(
        http::header::CACHE_CONTROL,
        http::HeaderValue::from_static("no-cache"),
    );
    headers.insert(
        http::header::CONNECTION,
        http::HeaderValue::from_static("keep-alive"),
    );
    response
}

/// Outbound event-stream driver.
///
/// # Examples
///
/// ```rust,no_run
/// use sseflow::{Message, SseServer};
///
/// # async fn example(socket: tokio::net::TcpStream) {
/// let server = SseServer::new(socket);
/// server.push([Message::new().with_event("tick").with_data("1")]);
/// if let Err(err) = server.close().await {
///     eprintln!("stream failed: {err}");
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct SseServer {
    events: EventStream<Arc<Message>>,
    task: Mutex<Option<JoinHandle<Result<(), Error>>>>,
    terminal: OnceCell<Result<(), Arc<Error>>>,
}

impl SseServer {
    /// Spawn the drain task over `sink`.
    ///
    /// The caller is expected to have sent (and flushed) the [`handshake`]
    /// head first. Must be called from within a Tokio runtime.
    pub fn new<W>(sink: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let events = EventStream::new();
        let rx = events.listen(CancellationToken::new());
        let task = tokio::spawn(drain(sink, rx));
        Self {
            events,
            task: Mutex::new(Some(task)),
            terminal: OnceCell::new(),
        }
    }

    /// Enqueue messages for the drain task, preserving caller order.
    ///
    /// All messages from one call are enqueued before any from a subsequent
    /// call. Never blocks. After a sink failure or [`close`](Self::close),
    /// pushed messages are silently dropped.
    pub fn push<I>(&self, messages: I)
    where
        I: IntoIterator<Item = Message>,
    {
        self.events.push(messages.into_iter().map(Arc::new));
    }

    /// Stop accepting pushes, drain what is already enqueued, and report
    /// any recorded write error.
    ///
    /// Blocks until the background task has fully terminated; no writes
    /// happen after this returns. Idempotent; every call returns the same
    /// recorded result.
    ///
    /// # Errors
    ///
    /// The first sink write or flush failure, if one occurred.
    pub async fn close(&self) -> Result<(), Arc<Error>> {
        self.events.close();
        self.terminal
            .get_or_init(|| async {
                let task = self.task.lock().take();
                match task {
                    Some(task) => match task.await {
                        Ok(result) => result.map_err(Arc::new),
                        Err(err) => Err(Arc::new(Error::Transport(io::Error::other(err)))),
                    },
                    None => Ok(()),
                }
            })
            .await
            .clone()
    }
}

impl Drop for SseServer {
    fn drop(&mut self) {
        // Ends the drain task even when close was never awaited.
        self.events.close();
    }
}

/// The background drain loop: encode each pushed message onto the sink and
/// flush it, stopping on the first sink failure.
async fn drain<W>(mut sink: W, mut rx: UnboundedReceiver<Arc<Message>>) -> Result<(), Error>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    while let Some(msg) = rx.recv().await {
        let frame = msg.to_string();
        if frame.is_empty() {
            continue;
        }
        if let Err(err) = sink.write_all(frame.as_bytes()).await {
            warn!(error = %err, "sse sink write failed");
            return Err(Error::Transport(err));
        }
        if let Err(err) = sink.flush().await {
            warn!(error = %err, "sse sink flush failed");
            return Err(Error::Transport(err));
        }
    }
    debug!("sse drain loop ended");
    Ok(())
}
