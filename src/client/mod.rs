//! SSE client driver.
//!
//! [`SseClient`] owns one background task that decodes an inbound event
//! stream into [`Message`]s and publishes them to subscribers, while
//! tracking the reconnection advice (last event id, retry delay) the caller
//! needs when the stream ends.

use crate::error::{Error, ReconnectAdvice, Result, StreamClosed};
use crate::shared::{EventStream, Message};
use crate::MEDIA_TYPE;
use futures::TryStreamExt;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::{oneshot, OnceCell};
use tokio::task::JoinHandle;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Inbound event-stream driver with reconnect bookkeeping.
///
/// The driver does not read a single byte until [`start`](Self::start) is
/// called, so callers can attach their [`listen`](Self::listen)
/// subscriptions first without racing early messages. All termination
/// causes, including a clean end-of-stream, are reported through
/// [`close`](Self::close) as a [`StreamClosed`] value.
///
/// # Examples
///
/// ```rust,no_run
/// use sseflow::SseClient;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let response = reqwest::get("http://localhost:8080/events").await?;
/// let client = SseClient::new(response)?;
///
/// let mut events = client.listen(CancellationToken::new());
/// client.start();
/// while let Some(event) = events.recv().await {
///     println!("{}: {}", event.event, event.data);
/// }
///
/// let closed = client.close().await;
/// println!("reconnect with {}", closed.advice);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SseClient {
    events: EventStream<Arc<Message>>,
    start: Mutex<Option<oneshot::Sender<()>>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<StreamClosed>>>,
    terminal: OnceCell<Arc<StreamClosed>>,
}

impl SseClient {
    /// Create a client from an HTTP response carrying an event stream.
    ///
    /// # Errors
    ///
    /// [`Error::ContentType`] when the response `Content-Type` is not
    /// exactly `text/event-stream`. No background work starts in that case.
    pub fn new(response: reqwest::Response) -> Result<Self> {
        let content_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        let body = StreamReader::new(Box::pin(response.bytes_stream().map_err(io::Error::other)));
        Self::from_parts(&content_type, BufReader::new(body))
    }

    /// Create a client from a declared content type and a raw line source.
    ///
    /// This is the transport-agnostic constructor behind
    /// [`new`](Self::new); it spawns the decode loop (parked until
    /// [`start`](Self::start)) and must be called from within a Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// [`Error::ContentType`] when `content_type` is not exactly
    /// `text/event-stream`.
    pub fn from_parts<R>(content_type: &str, body: R) -> Result<Self>
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        if content_type != MEDIA_TYPE {
            return Err(Error::ContentType(content_type.to_string()));
        }

        let events = EventStream::new();
        let cancel = CancellationToken::new();
        let (start_tx, start_rx) = oneshot::channel();
        let task = tokio::spawn(decode_loop(body, events.clone(), cancel.clone(), start_rx));

        Ok(Self {
            events,
            start: Mutex::new(Some(start_tx)),
            cancel,
            task: Mutex::new(Some(task)),
            terminal: OnceCell::new(),
        })
    }

    /// Release the decode loop. Idempotent; calls after the first are no-ops.
    pub fn start(&self) {
        if let Some(tx) = self.start.lock().take() {
            let _ = tx.send(());
        }
    }

    /// Subscribe to decoded messages.
    ///
    /// The token scopes only this subscription: cancelling it detaches this
    /// receiver and leaves the decode loop (and other subscribers) running.
    /// The receiver reports end-of-stream once the loop terminates.
    pub fn listen(&self, cancel: CancellationToken) -> UnboundedReceiver<Arc<Message>> {
        self.events.listen(cancel)
    }

    /// Stop the driver and collect its terminal status.
    ///
    /// Cancels the decode loop if it is still running, waits for the
    /// background task to fully terminate, and returns the composite
    /// [`StreamClosed`]: decode and transport failures when present, plus
    /// the always-present reconnection advice. Idempotent; every call
    /// returns the same recorded value.
    pub async fn close(&self) -> Arc<StreamClosed> {
        self.cancel.cancel();
        self.terminal
            .get_or_init(|| async {
                let task = self.task.lock().take();
                let closed = match task {
                    Some(task) => task.await.unwrap_or_else(|err| StreamClosed {
                        decode: None,
                        transport: Some(io::Error::other(err)),
                        advice: ReconnectAdvice::default(),
                    }),
                    None => StreamClosed::default(),
                };
                Arc::new(closed)
            })
            .await
            .clone()
    }
}

impl Drop for SseClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The background decode loop: wait for the start signal, then group
/// non-blank lines into a pending message and publish it on each blank line,
/// updating reconnection advice as fields arrive.
async fn decode_loop<R>(
    body: R,
    events: EventStream<Arc<Message>>,
    cancel: CancellationToken,
    start: oneshot::Receiver<()>,
) -> StreamClosed
where
    R: AsyncBufRead + Send + Unpin + 'static,
{
    let mut closed = StreamClosed::default();

    tokio::select! {
        _ = cancel.cancelled() => {
            events.close();
            return closed;
        }
        armed = start => {
            // A dropped sender means the client went away before starting.
            if armed.is_err() {
                events.close();
                return closed;
            }
        }
    }

    debug!("sse decode loop started");
    let mut lines = body.lines();
    let mut pending: Option<Message> = None;
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(line)) if line.is_empty() => {
                // Blank line: the pending message is complete.
                if let Some(msg) = pending.take() {
                    events.push([Arc::new(msg)]);
                }
            },
            Ok(Some(line)) => {
                let msg = pending.get_or_insert_with(Message::new);
                if let Err(err) = msg.decode_line(&line) {
                    closed.decode = Some(err);
                    break;
                }
                if msg.retry > 0 {
                    closed.advice.retry = Duration::from_millis(msg.retry);
                }
                if let Some(id) = &msg.id {
                    closed.advice.last_id = Some(id.clone());
                }
            },
            Ok(None) => break,
            Err(err) => {
                closed.transport = Some(err);
                break;
            },
        }
    }

    events.close();
    debug!(advice = %closed.advice, clean = closed.is_clean(), "sse decode loop ended");
    closed
}
