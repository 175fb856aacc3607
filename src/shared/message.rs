//! The SSE message data model and its wire codec.
//!
//! A [`Message`] is a mutable accumulator while a stream is being decoded
//! line by line, and a read-only value when it is serialized back onto the
//! wire. Serialization goes through [`std::fmt::Display`] and is a pure
//! function of the field values.

use crate::error::{Error, Result};
use std::fmt::{self, Write as _};

/// A single Server-Sent Event.
///
/// Fields map one-to-one onto the wire format: zero or more comment lines,
/// then `id`, `retry`, `event` and `data` lines, then a blank terminator
/// line. Unset fields are omitted on encode; `retry == 0` and an empty
/// `event` both mean "unset".
///
/// # Examples
///
/// ```rust
/// use sseflow::Message;
///
/// let msg = Message::new().with_event("tick").with_data("one\ntwo");
/// assert_eq!(msg.to_string(), "event:tick\ndata:one\ndata:two\n\n");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Comment lines, in insertion order.
    pub comments: Vec<String>,
    /// Last-event-id. `Some("")` is distinct from never having seen an id.
    pub id: Option<String>,
    /// Reconnection delay hint in milliseconds; zero means unset.
    pub retry: u64,
    /// Event name; empty means unset.
    pub event: String,
    /// Data payload; multiple `data:` lines accumulate joined by `\n`.
    pub data: String,
}

impl Message {
    /// Create an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the event id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the retry hint in milliseconds.
    pub fn with_retry(mut self, retry: u64) -> Self {
        self.retry = retry;
        self
    }

    /// Set the event name.
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    /// Set the data payload.
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }

    /// Append a comment line.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comments.push(comment.into());
        self
    }

    /// Whether no field has been set at all.
    ///
    /// An empty message encodes to nothing, not even a terminator line. Note
    /// that a message holding a single empty comment is not empty: it encodes
    /// to a lone `:` line.
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
            && self.id.is_none()
            && self.retry == 0
            && self.event.is_empty()
            && self.data.is_empty()
    }

    /// Feed one wire line (without its trailing newline) into the message.
    ///
    /// The line is split on the first `:` into field name and value, and
    /// exactly one leading space is stripped from the value. Unknown field
    /// names are ignored for forward compatibility. Blank-line handling is
    /// the caller's job; this routine only accumulates fields.
    ///
    /// # Errors
    ///
    /// [`Error::Retry`] when a `retry` value is not a base-10 unsigned
    /// integer. All other malformed input is absorbed silently.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sseflow::Message;
    ///
    /// let mut msg = Message::new();
    /// msg.decode_line("event: update").unwrap();
    /// msg.decode_line("data: first").unwrap();
    /// msg.decode_line("data: second").unwrap();
    /// assert_eq!(msg.event, "update");
    /// assert_eq!(msg.data, "first\nsecond");
    /// ```
    pub fn decode_line(&mut self, line: &str) -> Result<()> {
        let (name, value) = match line.split_once(':') {
            Some((name, value)) => (name, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match name {
            "" => self.comments.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            "retry" => {
                let ms: u64 = value.parse().map_err(|source| Error::Retry {
                    value: value.to_string(),
                    source,
                })?;
                // Zero is not a valid override.
                if ms > 0 {
                    self.retry = ms;
                }
            },
            "event" => {
                self.event = if value.is_empty() {
                    // The SSE default event name.
                    "message".to_string()
                } else {
                    value.to_string()
                };
            },
            "data" => {
                if !self.data.is_empty() {
                    self.data.push('\n');
                }
                self.data.push_str(value);
            },
            _ => {},
        }
        Ok(())
    }
}

/// How a field value is escaped on the wire.
enum FieldEscape {
    /// `\n` and `\r` become the literal two-character sequences `\n` / `\r`.
    Text,
    /// `\n` re-emits the `data:` prefix; `\r` becomes the literal `\r`.
    Data,
    /// No escaping (numeric values).
    Verbatim,
}

fn write_field(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    value: &str,
    escape: FieldEscape,
) -> fmt::Result {
    f.write_str(name)?;
    if !value.is_empty() {
        f.write_char(':')?;
        // A doubled divider keeps a leading space unambiguous across the
        // one-space-strip convention on decode.
        if value.starts_with(' ') {
            f.write_char(' ')?;
        }
    } else if name.is_empty() {
        // Degenerate comment marker.
        f.write_char(':')?;
    }

    match escape {
        FieldEscape::Verbatim => f.write_str(value)?,
        FieldEscape::Text => {
            for ch in value.chars() {
                match ch {
                    '\n' => f.write_str("\\n")?,
                    '\r' => f.write_str("\\r")?,
                    ch => f.write_char(ch)?,
                }
            }
        },
        FieldEscape::Data => {
            for ch in value.chars() {
                match ch {
                    '\n' => f.write_str("\ndata:")?,
                    '\r' => f.write_str("\\r")?,
                    ch => f.write_char(ch)?,
                }
            }
        },
    }
    f.write_char('\n')
}

impl fmt::Display for Message {
    /// Render the exact wire bytes: comments, id, retry, event, data in
    /// fixed order, one line each, then a blank terminator line. An empty
    /// message renders as nothing at all.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        for comment in &self.comments {
            write_field(f, "", comment, FieldEscape::Text)?;
        }
        if let Some(id) = &self.id {
            write_field(f, "id", id, FieldEscape::Text)?;
        }
        if self.retry > 0 {
            write_field(f, "retry", &self.retry.to_string(), FieldEscape::Verbatim)?;
        }
        if !self.event.is_empty() {
            write_field(f, "event", &self.event, FieldEscape::Text)?;
        }
        if !self.data.is_empty() {
            write_field(f, "data", &self.data, FieldEscape::Data)?;
        }
        f.write_char('\n')
    }
}
