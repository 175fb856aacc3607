//! Error types for the sseflow crate.
//!
//! Background-task failures are never thrown across the concurrency
//! boundary; they are accumulated into a [`StreamClosed`] value and observed
//! through the driver's `close` call.

use crate::DEFAULT_RETRY;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for sseflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sseflow operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The upstream response does not declare the SSE media type. Raised
    /// synchronously at client construction, before any background work.
    #[error("invalid content type {0:?}, expected text/event-stream")]
    ContentType(String),

    /// A `retry` field value is not a non-negative base-10 integer. This
    /// terminates the decode loop.
    #[error("invalid retry value {value:?}")]
    Retry {
        /// The offending field value.
        value: String,
        /// Underlying integer parse failure.
        #[source]
        source: std::num::ParseIntError,
    },

    /// Underlying read or write failure, propagated verbatim.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

/// Reconnection advice tracked across a whole inbound stream.
///
/// This is not part of any one [`Message`](crate::Message): the most recent
/// positive `retry` and the most recent `id` field (even an empty one)
/// overwrite it, independent of which message carried them. The client reads
/// it once, when the stream ends, to build the terminal [`StreamClosed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectAdvice {
    /// Last event id seen on the stream. `Some("")` means an empty `id:`
    /// field was sent, which is distinct from no id field at all.
    pub last_id: Option<String>,
    /// Delay the caller should wait before reconnecting.
    pub retry: Duration,
}

impl Default for ReconnectAdvice {
    fn default() -> Self {
        Self {
            last_id: None,
            retry: DEFAULT_RETRY,
        }
    }
}

impl fmt::Display for ReconnectAdvice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.last_id {
            Some(id) => write!(f, "last-id({id}) retry({:?})", self.retry),
            None => write!(f, "last-id(none) retry({:?})", self.retry),
        }
    }
}

/// Terminal status of a client stream, returned by
/// [`SseClient::close`](crate::SseClient::close).
///
/// The decode and transport components are present only when the loop ended
/// for that reason; the reconnection advice is always present, even on a
/// clean end-of-stream, because callers need it to reconnect correctly
/// regardless of why the stream ended.
#[derive(Debug, Default)]
pub struct StreamClosed {
    /// Decode failure that terminated the loop, if any.
    pub decode: Option<Error>,
    /// Underlying read failure that terminated the loop, if any.
    pub transport: Option<std::io::Error>,
    /// Reconnection advice accumulated over the stream.
    pub advice: ReconnectAdvice,
}

impl StreamClosed {
    /// Whether the stream ended without a decode or transport failure.
    pub fn is_clean(&self) -> bool {
        self.decode.is_none() && self.transport.is_none()
    }
}

impl fmt::Display for StreamClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream closed: {}", self.advice)?;
        if let Some(err) = &self.decode {
            write!(f, "; decode: {err}")?;
        }
        if let Some(err) = &self.transport {
            write!(f, "; transport: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for StreamClosed {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.decode
            .as_ref()
            .map(|err| err as &(dyn std::error::Error + 'static))
            .or_else(|| {
                self.transport
                    .as_ref()
                    .map(|err| err as &(dyn std::error::Error + 'static))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advice_defaults_to_documented_retry() {
        let advice = ReconnectAdvice::default();
        assert_eq!(advice.last_id, None);
        assert_eq!(advice.retry, Duration::from_millis(5000));
    }

    #[test]
    fn stream_closed_display_elides_absent_parts() {
        let closed = StreamClosed::default();
        assert_eq!(closed.to_string(), "stream closed: last-id(none) retry(5s)");
        assert!(closed.is_clean());

        let closed = StreamClosed {
            transport: Some(std::io::Error::other("connection reset")),
            advice: ReconnectAdvice {
                last_id: Some("42".to_string()),
                retry: Duration::from_millis(250),
            },
            ..Default::default()
        };
        assert_eq!(
            closed.to_string(),
            "stream closed: last-id(42) retry(250ms); transport: connection reset"
        );
        assert!(!closed.is_clean());
    }
}
