// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for framing and timeout behavior

use super::*;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn message_round_trips_through_a_stream() {
    let (mut client, mut server) = tokio::io::duplex(4096);

    write_message(&mut client, &Request::Get { id: "svc-a".to_string() }).await.unwrap();
    let request: Request = read_message(&mut server).await.unwrap();
    assert_eq!(request, Request::Get { id: "svc-a".to_string() });
}

#[tokio::test]
async fn eof_before_any_frame_is_connection_closed() {
    let (client, mut server) = tokio::io::duplex(64);
    drop(client);

    let err = read_message::<_, Request>(&mut server).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn truncated_frame_is_connection_closed() {
    let (mut client, mut server) = tokio::io::duplex(64);

    // Announce 100 bytes, deliver 3, hang up.
    client.write_all(&100u32.to_be_bytes()).await.unwrap();
    client.write_all(b"abc").await.unwrap();
    drop(client);

    let err = read_message::<_, Request>(&mut server).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn oversized_length_prefix_is_rejected() {
    let (mut client, mut server) = tokio::io::duplex(64);
    client.write_all(&u32::MAX.to_be_bytes()).await.unwrap();

    let err = read_message::<_, Request>(&mut server).await.unwrap_err();
    assert!(matches!(err, ProtocolError::FrameTooLarge(_)));
}

#[tokio::test]
async fn stalled_peer_times_out() {
    let (_client, mut server) = tokio::io::duplex(64);

    let err = read_request(&mut server, Duration::from_millis(50)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout));
}

#[test]
fn encode_rejects_oversized_payload() {
    let response = Response::Health { version: "x".repeat(2 * 1024 * 1024) };
    let err = encode(&response).unwrap_err();
    assert!(matches!(err, ProtocolError::FrameTooLarge(_)));
}

#[test]
fn decode_surfaces_serde_errors() {
    let err = decode::<Request>(b"not json").unwrap_err();
    assert!(matches!(err, ProtocolError::Serde(_)));
}
