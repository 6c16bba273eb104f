use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::protocol::rtp::{NtpTimestamp, RaopPayloadType, TimingPacket};
use crate::streaming::TimingResponder;

async fn bound() -> (Arc<UdpSocket>, std::net::SocketAddr) {
    let socket = UdpSocket::bind((IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
        .await
        .unwrap();
    let addr = socket.local_addr().unwrap();
    (Arc::new(socket), addr)
}

#[tokio::test]
async fn test_responds_and_ignores_garbage() {
    let (socket, addr) = bound().await;
    let mut responder =
        TimingResponder::spawn(socket, Duration::from_secs(5), Duration::from_secs(1));

    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    peer.send_to(&[0xFF; 5], addr).await.unwrap();

    let origin = NtpTimestamp {
        seconds: 7,
        fraction: 9,
    };
    peer.send_to(&TimingPacket::request(origin).encode(), addr)
        .await
        .unwrap();

    let mut buf = [0u8; 64];
    let len = tokio::time::timeout(Duration::from_secs(2), peer.recv(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(len, TimingPacket::SIZE);
    assert_eq!(&buf[..4], &[0x80, 0xD3, 0x00, 0x07]);
    let response = TimingPacket::decode(&buf[..len]).unwrap();
    assert_eq!(response.payload_type, RaopPayloadType::TimingResponse);
    assert_eq!(response.reference_time, origin);

    assert!(responder.is_running());
    responder.shutdown().await;
    assert!(!responder.is_running());
}

#[tokio::test]
async fn test_shutdown_on_unspecified_address() {
    let socket = Arc::new(UdpSocket::bind("0.0.0.0:0").await.unwrap());
    let mut responder =
        TimingResponder::spawn(socket, Duration::from_secs(30), Duration::from_secs(2));

    let started = std::time::Instant::now();
    responder.shutdown().await;
    assert!(!responder.is_running());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_stops_after_receive_timeout() {
    let (socket, _) = bound().await;
    let responder =
        TimingResponder::spawn(socket, Duration::from_millis(50), Duration::from_secs(1));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!responder.is_running());
}

#[tokio::test]
async fn test_shutdown_twice_is_noop() {
    let (socket, _) = bound().await;
    let mut responder =
        TimingResponder::spawn(socket, Duration::from_secs(5), Duration::from_secs(1));
    responder.shutdown().await;
    responder.shutdown().await;
    assert!(!responder.is_running());
}
