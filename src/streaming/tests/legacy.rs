use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

use crate::error::RaopError;
use crate::protocol::rtp::LegacyFrameHeader;
use crate::protocol::rtp::constants::TIMESTAMP_ORIGIN;
use crate::protocol::rtsp::{LowerTransport, ServerTransport};
use crate::streaming::{LegacyTransport, Transport};

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

fn transport() -> LegacyTransport {
    LegacyTransport::new(Duration::from_secs(2), Duration::from_secs(2))
}

#[tokio::test]
async fn test_setup_header_and_sizes() {
    let mut transport = transport();
    assert_eq!(transport.kind(), LowerTransport::Tcp);
    assert_eq!(transport.frames_per_packet(), 4096);
    assert_eq!(transport.frame_bytes(), 16384);
    assert_eq!(
        transport.prepare_setup(LOCALHOST).await.unwrap(),
        "RTP/AVP/TCP;unicast;interleaved=0-1;mode=record"
    );
}

#[tokio::test]
async fn test_configure_requires_server_port() {
    let mut transport = transport();
    let err = transport
        .configure(LOCALHOST, &ServerTransport::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RaopError::Protocol { .. }));
}

#[tokio::test]
async fn test_send_before_open_is_disconnected() {
    let mut transport = transport();
    let err = transport.send(&[0u8; 8], 2).await.unwrap_err();
    assert!(matches!(err, RaopError::Disconnected));
    assert_eq!(transport.clock().sequence(), 0);
}

#[tokio::test]
async fn test_frames_are_length_prefixed() {
    let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut transport = transport();
    transport
        .configure(
            LOCALHOST,
            &ServerTransport {
                server_port: Some(port),
                ..ServerTransport::default()
            },
        )
        .await
        .unwrap();
    transport.open().await.unwrap();
    assert!(transport.is_open());

    let (mut peer, _) = listener.accept().await.unwrap();

    let frame: Vec<u8> = (0..100u8).collect();
    transport.send(&frame, 25).await.unwrap();
    transport.send(&frame[..40], 10).await.unwrap();

    let mut header = [0u8; LegacyFrameHeader::SIZE];
    peer.read_exact(&mut header).await.unwrap();
    assert_eq!(&header[..6], &[0x24, 0x00, 0x00, 112, 0xF0, 0xFF]);
    assert!(header[6..].iter().all(|b| *b == 0));
    let mut body = vec![0u8; 100];
    peer.read_exact(&mut body).await.unwrap();
    assert_eq!(body, frame);

    peer.read_exact(&mut header).await.unwrap();
    assert_eq!(LegacyFrameHeader::decode(&header).unwrap().frame_len, 40);

    assert_eq!(transport.clock().sequence(), 2);
    assert_eq!(transport.clock().timestamp(), TIMESTAMP_ORIGIN + 35);
}

#[tokio::test]
async fn test_open_refused() {
    // Grab a free port, then release it so nothing listens there
    let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut transport = transport();
    transport
        .configure(
            LOCALHOST,
            &ServerTransport {
                server_port: Some(port),
                ..ServerTransport::default()
            },
        )
        .await
        .unwrap();
    let err = transport.open().await.unwrap_err();
    assert!(matches!(err, RaopError::ConnectFailed { .. }));
}

#[tokio::test]
async fn test_send_after_peer_close_fails() {
    let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut transport = transport();
    transport
        .configure(
            LOCALHOST,
            &ServerTransport {
                server_port: Some(port),
                ..ServerTransport::default()
            },
        )
        .await
        .unwrap();
    transport.open().await.unwrap();
    let (peer, _) = listener.accept().await.unwrap();
    drop(peer);

    // The first writes may still land in the socket buffer
    let frame = vec![0u8; 16384];
    let mut failed = false;
    for _ in 0..50 {
        if transport.send(&frame, 4096).await.is_err() {
            failed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(failed);
}

#[tokio::test]
async fn test_shutdown_closes_stream() {
    let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut transport = transport();
    transport
        .configure(
            LOCALHOST,
            &ServerTransport {
                server_port: Some(port),
                ..ServerTransport::default()
            },
        )
        .await
        .unwrap();
    transport.open().await.unwrap();
    let (mut peer, _) = listener.accept().await.unwrap();

    transport.shutdown().await;
    assert!(!transport.is_open());

    let mut buf = [0u8; 1];
    assert_eq!(peer.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn test_write_timeout_closes_audio_connection() {
    let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut transport = LegacyTransport::new(Duration::from_secs(2), Duration::from_millis(200));
    transport
        .configure(
            LOCALHOST,
            &ServerTransport {
                server_port: Some(port),
                ..ServerTransport::default()
            },
        )
        .await
        .unwrap();
    transport.open().await.unwrap();
    // Accepted but never read until the sender gives up
    let (mut peer, _) = listener.accept().await.unwrap();

    let frame = vec![0x5Au8; 16384];
    let mut sent = 0u16;
    let err = loop {
        match transport.send(&frame, 4096).await {
            Ok(()) => sent += 1,
            Err(e) => break e,
        }
        assert!(sent < 5000, "socket buffers never filled");
    };
    assert!(matches!(err, RaopError::IoTimeout { .. }));
    assert!(!transport.is_open());
    assert_eq!(transport.clock().sequence(), sent);

    // Nothing more may follow the cut-off frame on that connection
    let err = transport.send(&frame, 4096).await.unwrap_err();
    assert!(matches!(err, RaopError::Disconnected));

    let mut received = Vec::new();
    peer.read_to_end(&mut received).await.unwrap();
    let mut offset = 0;
    let mut complete = 0u16;
    while received.len() - offset >= LegacyFrameHeader::SIZE + frame.len() {
        let header = LegacyFrameHeader::decode(&received[offset..]).unwrap();
        assert_eq!(usize::from(header.frame_len), frame.len());
        offset += LegacyFrameHeader::SIZE + frame.len();
        complete += 1;
    }
    assert_eq!(complete, sent);
    assert!(received.len() - offset < LegacyFrameHeader::SIZE + frame.len());

    // Reopening gives a clean connection for the next frame
    transport.open().await.unwrap();
    let (mut peer, _) = listener.accept().await.unwrap();
    transport.send(&frame[..8], 2).await.unwrap();
    let mut header = [0u8; LegacyFrameHeader::SIZE];
    peer.read_exact(&mut header).await.unwrap();
    assert_eq!(LegacyFrameHeader::decode(&header).unwrap().frame_len, 8);
}
