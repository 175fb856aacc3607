//! Multi-consumer fan-out channel used by both drivers.
//!
//! [`EventStream`] is the publish side of a closeable broadcast: items pushed
//! while the stream is open are delivered, in order, to every live
//! subscriber; closing the stream unblocks all current and future
//! subscribers. Each subscription is scoped by a caller-supplied
//! [`CancellationToken`], which detaches that subscriber only.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

struct Inner<T> {
    next_key: u64,
    subscribers: HashMap<u64, UnboundedSender<T>>,
    closed: bool,
}

/// A closeable, multi-consumer event channel.
///
/// Cloning an `EventStream` yields another handle onto the same channel.
/// Only the owning driver pushes and closes; subscribers just receive.
///
/// # Examples
///
/// ```rust
/// use sseflow::EventStream;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let stream = EventStream::new();
/// let mut sub = stream.listen(CancellationToken::new());
/// stream.push([1, 2, 3]);
/// stream.close();
/// assert_eq!(sub.recv().await, Some(1));
/// assert_eq!(sub.recv().await, Some(2));
/// assert_eq!(sub.recv().await, Some(3));
/// assert_eq!(sub.recv().await, None);
/// # }
/// ```
pub struct EventStream<T> {
    inner: Arc<Mutex<Inner<T>>>,
    closed: CancellationToken,
}

impl<T> Clone for EventStream<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            closed: self.closed.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> EventStream<T> {
    /// Create an open stream with no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_key: 0,
                subscribers: HashMap::new(),
                closed: false,
            })),
            closed: CancellationToken::new(),
        }
    }

    /// Deliver items to every live subscriber, in order.
    ///
    /// The whole batch is delivered under one lock acquisition, so items
    /// from a single call are never interleaved with another call's.
    /// Pushing onto a closed stream is a no-op.
    pub fn push<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        for item in items {
            inner
                .subscribers
                .retain(|_, tx| tx.send(item.clone()).is_ok());
        }
    }

    /// Register a subscriber scoped by `cancel`.
    ///
    /// Cancelling the token detaches this subscriber without affecting the
    /// stream or any other subscriber. Listening on a closed stream returns
    /// a receiver that is already at end-of-stream.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn listen(&self, cancel: CancellationToken) -> UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        if inner.closed {
            return rx;
        }
        let key = inner.next_key;
        inner.next_key += 1;
        inner.subscribers.insert(key, tx);
        drop(inner);

        let inner = Arc::clone(&self.inner);
        let closed = self.closed.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    inner.lock().subscribers.remove(&key);
                }
                _ = closed.cancelled() => {}
            }
        });
        rx
    }

    /// Close the stream, unblocking all current and future subscribers.
    ///
    /// Idempotent. Items already delivered to a subscriber's queue remain
    /// receivable; the receiver then reports end-of-stream.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        inner.closed = true;
        inner.subscribers.clear();
        drop(inner);
        self.closed.cancel();
    }

    /// Whether the stream has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl<T: Clone + Send + 'static> Default for EventStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("EventStream")
            .field("subscribers", &inner.subscribers.len())
            .field("closed", &inner.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fan_out_delivers_to_every_subscriber() {
        let stream = EventStream::new();
        let mut a = stream.listen(CancellationToken::new());
        let mut b = stream.listen(CancellationToken::new());

        stream.push(["x"]);
        stream.close();

        assert_eq!(a.recv().await, Some("x"));
        assert_eq!(a.recv().await, None);
        assert_eq!(b.recv().await, Some("x"));
        assert_eq!(b.recv().await, None);
    }

    #[tokio::test]
    async fn batch_push_preserves_order() {
        let stream = EventStream::new();
        let mut sub = stream.listen(CancellationToken::new());

        stream.push([1, 2]);
        stream.push([3]);
        stream.close();

        assert_eq!(sub.recv().await, Some(1));
        assert_eq!(sub.recv().await, Some(2));
        assert_eq!(sub.recv().await, Some(3));
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn cancellation_detaches_one_subscriber() {
        let stream = EventStream::new();
        let cancel = CancellationToken::new();
        let mut cancelled = stream.listen(cancel.clone());
        let mut kept = stream.listen(CancellationToken::new());

        cancel.cancel();
        assert_eq!(cancelled.recv().await, None);

        stream.push(["still flowing"]);
        assert_eq!(kept.recv().await, Some("still flowing"));
    }

    #[tokio::test]
    async fn listen_after_close_is_end_of_stream() {
        let stream = EventStream::<&str>::new();
        stream.close();
        assert!(stream.is_closed());

        let mut sub = stream.listen(CancellationToken::new());
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn push_after_close_is_dropped() {
        let stream = EventStream::new();
        let mut sub = stream.listen(CancellationToken::new());
        stream.close();
        stream.push(["lost"]);
        assert_eq!(sub.recv().await, None);
    }
}
