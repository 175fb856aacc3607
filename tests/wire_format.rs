//! Server driver wire output, byte for byte.

use pretty_assertions::assert_eq;
use sseflow::{Error, Message, SseServer};
use tokio::io::AsyncReadExt;

#[tokio::test]
async fn golden_stream_bytes() {
    let (server_io, mut peer) = tokio::io::duplex(64 * 1024);
    let server = SseServer::new(server_io);

    server.push([Message::new().with_data("foo")]);
    server.push([Message::new().with_event("foo").with_data("bar")]);
    server.push([Message::new()
        .with_id("baz")
        .with_retry(32)
        .with_event("bar")
        .with_data("foo")]);
    server.push([Message::new().with_comment("hello world")]);
    server.push([Message::new().with_comment("")]);

    assert!(server.close().await.is_ok());
    drop(server);

    let mut body = String::new();
    peer.read_to_string(&mut body).await.unwrap();
    assert_eq!(
        body,
        "data:foo\n\n\
         event:foo\ndata:bar\n\n\
         id:baz\nretry:32\nevent:bar\ndata:foo\n\n\
         :hello world\n\n\
         :\n\n"
    );
}

#[tokio::test]
async fn batch_push_keeps_caller_order() {
    let (server_io, mut peer) = tokio::io::duplex(4096);
    let server = SseServer::new(server_io);

    server.push([
        Message::new().with_data("1"),
        Message::new().with_data("2"),
    ]);
    server.push([Message::new().with_data("3")]);

    assert!(server.close().await.is_ok());
    drop(server);

    let mut body = String::new();
    peer.read_to_string(&mut body).await.unwrap();
    assert_eq!(body, "data:1\n\ndata:2\n\ndata:3\n\n");
}

#[tokio::test]
async fn empty_messages_write_nothing() {
    let (server_io, mut peer) = tokio::io::duplex(4096);
    let server = SseServer::new(server_io);

    server.push([Message::new()]);
    server.push([Message::new().with_data("real")]);

    assert!(server.close().await.is_ok());
    drop(server);

    let mut body = String::new();
    peer.read_to_string(&mut body).await.unwrap();
    assert_eq!(body, "data:real\n\n");
}

#[tokio::test]
async fn sink_failure_is_reported_via_close() {
    let (server_io, peer) = tokio::io::duplex(64);
    drop(peer);
    let server = SseServer::new(server_io);

    server.push([Message::new().with_data("x")]);

    let err = server.close().await.unwrap_err();
    assert!(matches!(*err, Error::Transport(_)));

    // Idempotent: the same recorded error comes back again.
    assert!(server.close().await.is_err());
}
