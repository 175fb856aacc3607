//! # sseflow
//!
//! Server-Sent Events (SSE) wire codec with asynchronous client and server
//! stream drivers.
//!
//! This crate provides:
//! - [`Message`]: the SSE data model with a line-oriented decoder and a
//!   byte-exact wire encoder
//! - [`SseClient`]: consumes an inbound event stream and tracks the
//!   reconnection advice (last event id, retry delay) reported when the
//!   stream ends
//! - [`SseServer`]: drains application-pushed messages onto a byte sink,
//!   flushing per event
//! - [`EventStream`]: the closeable multi-consumer channel both drivers
//!   publish through
//!
//! Reconnecting is deliberately left to the caller: the client computes and
//! reports the advice, nothing more.
//!
//! ## Quick Start
//!
//! ### Consuming a stream
//!
//! ```rust,no_run
//! use sseflow::SseClient;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let response = reqwest::get("http://localhost:8080/events").await?;
//! let client = SseClient::new(response)?;
//!
//! // Subscribe before starting so no early message is dropped.
//! let mut events = client.listen(CancellationToken::new());
//! client.start();
//! while let Some(event) = events.recv().await {
//!     println!("{}", event.data);
//! }
//!
//! let closed = client.close().await;
//! println!("reconnect with {}", closed.advice);
//! # Ok(())
//! # }
//! ```
//!
//! ### Producing a stream
//!
//! ```rust,no_run
//! use sseflow::{Message, SseServer};
//!
//! # async fn example(socket: tokio::net::TcpStream) {
//! // Send sseflow::handshake() over the connection first, then stream.
//! let server = SseServer::new(socket);
//! server.push([Message::new().with_id("1").with_data("hello")]);
//! if let Err(err) = server.close().await {
//!     eprintln!("stream failed: {err}");
//! }
//! # }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]
#![deny(unsafe_code)]
#![allow(clippy::missing_errors_doc)]

use std::time::Duration;

pub mod client;
pub mod error;
pub mod server;
pub mod shared;

// Re-export commonly used types
pub use client::SseClient;
pub use error::{Error, ReconnectAdvice, Result, StreamClosed};
pub use server::{handshake, SseServer};
pub use shared::{EventStream, Message};

/// The SSE media type.
///
/// A client response must declare exactly this `Content-Type`; the server
/// handshake emits it.
///
/// # Examples
///
/// ```rust
/// assert_eq!(sseflow::MEDIA_TYPE, "text/event-stream");
/// ```
pub const MEDIA_TYPE: &str = "text/event-stream";

/// Default reconnection delay advised when a stream never carried a
/// positive `retry` field.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// assert_eq!(sseflow::DEFAULT_RETRY, Duration::from_millis(5000));
/// ```
pub const DEFAULT_RETRY: Duration = Duration::from_millis(5000);
