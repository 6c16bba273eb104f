use std::time::Duration;

use super::RaopClient;
use crate::audio::{AudioFormat, SampleFormat};
use crate::connection::SessionState;
use crate::error::RaopError;
use crate::protocol::rtp::constants::TIMESTAMP_ORIGIN;
use crate::protocol::rtp::{RtpAudioHeader, SyncPacket};
use crate::protocol::rtsp::Method;
use crate::streaming::AudioSink;
use crate::testing::{MockRaopConfig, MockRaopServer};
use crate::types::RaopConfig;

const LEGACY_BUFFER: usize = 16384;
const RTP_BUFFER: usize = 1408;

async fn start_mock(config: MockRaopConfig) -> MockRaopServer {
    let mut server = MockRaopServer::new(config);
    server.start().await.unwrap();
    server
}

fn config() -> RaopConfig {
    RaopConfig::builder()
        .connect_timeout(Duration::from_secs(2))
        .io_timeout(Duration::from_secs(2))
        .base_port(47000)
        .build()
}

/// Poll the mock until `check` holds
async fn wait_for(server: &MockRaopServer, check: impl Fn(&crate::testing::MockRaopState) -> bool) {
    for _ in 0..100 {
        if check(&server.state()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("mock state never satisfied the condition");
}

#[test]
fn test_invalid_target() {
    let err = RaopClient::new("http://127.0.0.1:5000", RaopConfig::default()).unwrap_err();
    assert!(matches!(err, RaopError::InvalidTarget { .. }));
}

#[tokio::test]
async fn test_connect_sequence_and_headers() {
    let server = start_mock(MockRaopConfig::default()).await;
    let mut client = RaopClient::new(&server.tcp_target(), config()).unwrap();
    assert_eq!(client.state(), SessionState::Disconnected);

    client.start().await.unwrap();
    assert_eq!(client.state(), SessionState::Recording);
    assert!(client.session_id().is_some());
    assert!(client.is_encrypted());

    let state = server.state();
    let methods: Vec<Method> = state.requests.iter().map(|r| r.method).collect();
    assert_eq!(
        methods,
        vec![Method::Options, Method::Announce, Method::Setup, Method::Record]
    );

    let options = &state.requests[0];
    assert_eq!(options.uri, "*");
    assert_eq!(options.headers.cseq(), Some(1));
    let instance = options.headers.get("Client-Instance").unwrap();
    assert_eq!(instance.len(), 16);
    assert_eq!(options.headers.get("DACP-ID"), Some(instance));
    assert_eq!(
        options.headers.get("User-Agent"),
        Some("iTunes/7.6.2 (Windows; N;)")
    );

    let announce = &state.requests[1];
    assert!(announce.uri.starts_with("rtsp://127.0.0.1/"));
    assert_eq!(announce.headers.content_type(), Some("application/sdp"));
    let sdp = state.announced_sdp.as_deref().unwrap();
    assert!(sdp.contains("a=fmtp:96 4096 0 16 40 10 14 2 255 0 0 44100"));
    assert!(sdp.contains("a=aesiv:AAAAAAAAAAAAAAAAAAAAAA"));
    assert!(state.encrypted);

    let setup = &state.requests[2];
    assert_eq!(
        setup.headers.get("Transport"),
        Some("RTP/AVP/TCP;unicast;interleaved=0-1;mode=record")
    );

    let record = &state.requests[3];
    assert_eq!(record.headers.get("Range"), Some("npt=0-"));
    assert_eq!(
        record.headers.get("RTP-Info"),
        Some(format!("seq=0;rtptime={TIMESTAMP_ORIGIN}").as_str())
    );
    assert_eq!(record.headers.cseq(), Some(4));
    assert!(record.headers.get("Session").is_some());
}

#[tokio::test]
async fn test_no_encryption_when_not_offered() {
    let server = start_mock(MockRaopConfig {
        offer_encryption: false,
        ..MockRaopConfig::default()
    })
    .await;
    let mut client = RaopClient::new(&server.tcp_target(), config()).unwrap();
    client.start().await.unwrap();

    assert!(!client.is_encrypted());
    let sdp = server.state().announced_sdp.unwrap();
    assert!(!sdp.contains("rsaaeskey"));
    assert!(!sdp.contains("aesiv"));
}

#[tokio::test]
async fn test_encryption_disabled_by_config() {
    let server = start_mock(MockRaopConfig::default()).await;
    let config = RaopConfig::builder().encryption(false).build();
    let mut client = RaopClient::new(&server.tcp_target(), config).unwrap();
    client.start().await.unwrap();
    assert!(!client.is_encrypted());
    assert!(!server.state().encrypted);
}

#[tokio::test]
async fn test_legacy_audio_frames_and_drain() {
    let server = start_mock(MockRaopConfig::default()).await;
    let mut client = RaopClient::new(&server.tcp_target(), config()).unwrap();

    let pcm: Vec<u8> = (0..LEGACY_BUFFER + 100).map(|i| (i % 251) as u8).collect();
    client
        .put_audio(AudioFormat::CD_QUALITY, &pcm)
        .await
        .unwrap();
    assert_eq!(client.buffered(), 100);

    client.drain().await.unwrap();
    assert_eq!(client.buffered(), 0);
    // Drain of an empty buffer sends nothing
    client.drain().await.unwrap();

    wait_for(&server, |s| s.tcp_frames.len() == 2).await;
    let state = server.state();
    assert!(state.tcp_frames.iter().all(|f| f.len() == 7 + LEGACY_BUFFER));

    let payloads = state.audio_payloads();
    let mut expected = Vec::new();
    crate::audio::encode_frame(&pcm[..LEGACY_BUFFER], &mut expected);
    assert_eq!(payloads[0], expected);

    let mut tail = pcm[LEGACY_BUFFER..].to_vec();
    tail.resize(LEGACY_BUFFER, 0);
    let mut expected = Vec::new();
    crate::audio::encode_frame(&tail, &mut expected);
    assert_eq!(payloads[1], expected);
}

#[tokio::test]
async fn test_rtp_audio_with_sync() {
    let server = start_mock(MockRaopConfig::default()).await;
    let mut client = RaopClient::new(&server.udp_target(), config()).unwrap();

    let pcm = vec![0u8; RTP_BUFFER * 3];
    client
        .put_audio(AudioFormat::CD_QUALITY, &pcm)
        .await
        .unwrap();

    let state = server.state();
    let setup = &state.requests_of(Method::Setup)[0];
    let transport = setup.headers.get("Transport").unwrap();
    assert!(transport.starts_with("RTP/AVP/UDP;unicast;interleaved=0-1;mode=record;control_port="));
    assert!(
        state
            .announced_sdp
            .as_deref()
            .unwrap()
            .contains("a=fmtp:96 352 0 16 40 10 14 2 255 0 0 44100")
    );

    wait_for(&server, |s| s.rtp_packets.len() == 3 && s.sync_packets.len() == 1).await;
    let state = server.state();
    let mut packets: Vec<RtpAudioHeader> = state
        .rtp_packets
        .iter()
        .map(|p| RtpAudioHeader::decode(p).unwrap())
        .collect();
    packets.sort_by_key(|h| h.sequence);
    assert_eq!(
        packets.iter().map(|h| h.sequence).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert!(packets[0].marker);
    assert_eq!(packets[2].timestamp, TIMESTAMP_ORIGIN + 2 * 352);

    let sync = SyncPacket::decode(&state.sync_packets[0]).unwrap();
    assert!(sync.first);
    assert_eq!(sync.timestamp, TIMESTAMP_ORIGIN);

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_unsupported_format_rejected() {
    let server = start_mock(MockRaopConfig::default()).await;
    let mut client = RaopClient::new(&server.tcp_target(), config()).unwrap();

    let format = AudioFormat {
        sample_format: SampleFormat::F32,
        ..AudioFormat::CD_QUALITY
    };
    let err = client.put_audio(format, &[0u8; 64]).await.unwrap_err();
    assert!(matches!(err, RaopError::UnsupportedFormat { .. }));
    assert!(server.state().requests.is_empty());
}

#[tokio::test]
async fn test_volume_latched_then_applied() {
    let server = start_mock(MockRaopConfig::default()).await;
    let mut client = RaopClient::new(&server.tcp_target(), config()).unwrap();

    client.set_volume(0.5).await.unwrap();
    assert_eq!(client.volume(), 0.5);
    assert!(server.state().requests.is_empty());

    client.start().await.unwrap();
    let state = server.state();
    assert_eq!(state.requests.last().unwrap().method, Method::SetParameter);
    assert_eq!(state.volume_db, Some(-15.0));

    client.set_volume(0.0).await.unwrap();
    let state = server.state();
    let body = &state.requests.last().unwrap().body;
    assert_eq!(body, b"volume: -144.000000\r\n");
    assert_eq!(
        state.requests.last().unwrap().headers.content_type(),
        Some("text/parameters")
    );
}

#[tokio::test]
async fn test_pause_flushes_and_drops_audio() {
    let server = start_mock(MockRaopConfig::default()).await;
    let mut client = RaopClient::new(&server.tcp_target(), config()).unwrap();
    client
        .put_audio(AudioFormat::CD_QUALITY, &[0u8; 400])
        .await
        .unwrap();

    client.pause().await.unwrap();
    client.pause().await.unwrap();
    assert!(client.is_paused());
    assert_eq!(client.buffered(), 0);

    let flushes = server.state().requests_of(Method::Flush).len();
    assert_eq!(flushes, 1);
    let state = server.state();
    let flush = state.requests_of(Method::Flush)[0];
    assert_eq!(
        flush.headers.get("RTP-Info"),
        Some(format!("seq=0;rtptime={TIMESTAMP_ORIGIN}").as_str())
    );

    client
        .put_audio(AudioFormat::CD_QUALITY, &[0u8; 400])
        .await
        .unwrap();
    assert_eq!(client.buffered(), 0);

    client.resume().await.unwrap();
    client
        .put_audio(AudioFormat::CD_QUALITY, &[0u8; 400])
        .await
        .unwrap();
    assert_eq!(client.buffered(), 400);
}

#[tokio::test]
async fn test_stop_is_idempotent_and_keeps_connection() {
    let server = start_mock(MockRaopConfig::default()).await;
    let mut client = RaopClient::new(&server.tcp_target(), config()).unwrap();

    // Nothing running yet
    client.stop().await.unwrap();
    assert!(server.state().requests.is_empty());

    client.start().await.unwrap();
    client.stop().await.unwrap();
    client.stop().await.unwrap();
    assert_eq!(client.state(), SessionState::Connected);
    assert_eq!(server.state().requests_of(Method::Teardown).len(), 1);

    // Reconnecting skips OPTIONS on the same control connection
    client.start().await.unwrap();
    let state = server.state();
    assert_eq!(state.requests_of(Method::Options).len(), 1);
    assert_eq!(state.requests_of(Method::Announce).len(), 2);
    assert_eq!(client.state(), SessionState::Recording);

    // The torn-down session id is not carried into the new stream
    assert!(state.requests_of(Method::Teardown)[0].headers.contains("Session"));
    assert!(!state.requests_of(Method::Announce)[1].headers.contains("Session"));
    assert!(!state.requests_of(Method::Setup)[1].headers.contains("Session"));
    assert_eq!(client.session_id(), state.session_id.as_deref());
}

#[tokio::test]
async fn test_seek_flushes_when_recording() {
    let server = start_mock(MockRaopConfig::default()).await;
    let mut client = RaopClient::new(&server.tcp_target(), config()).unwrap();

    client.seek().await.unwrap();
    assert!(server.state().requests.is_empty());

    client.start().await.unwrap();
    client.seek().await.unwrap();
    assert_eq!(server.state().requests_of(Method::Flush).len(), 1);
}

#[tokio::test]
async fn test_keep_alive() {
    let server = start_mock(MockRaopConfig::default()).await;
    let mut client = RaopClient::new(&server.tcp_target(), config()).unwrap();

    let err = client.keep_alive().await.unwrap_err();
    assert!(matches!(err, RaopError::Disconnected));

    client.start().await.unwrap();
    client.keep_alive().await.unwrap();
    assert_eq!(server.state().requests_of(Method::GetParameter).len(), 1);
}

#[tokio::test]
async fn test_busy_receiver() {
    let server = start_mock(MockRaopConfig {
        busy: true,
        ..MockRaopConfig::default()
    })
    .await;
    let mut client = RaopClient::new(&server.tcp_target(), config()).unwrap();

    let err = client.start().await.unwrap_err();
    assert!(matches!(err, RaopError::DeviceBusy));
    // The control connection stays up; OPTIONS is not repeated
    assert_eq!(client.state(), SessionState::Connected);
    let _ = client.start().await;
    assert_eq!(server.state().requests_of(Method::Options).len(), 1);
}

#[tokio::test]
async fn test_audio_reset_reconnects_on_next_write() {
    let server = start_mock(MockRaopConfig {
        drop_audio_after: Some(1),
        ..MockRaopConfig::default()
    })
    .await;
    let mut client = RaopClient::new(&server.tcp_target(), config()).unwrap();

    // Keep writing until the dropped audio connection is noticed
    let frame = vec![0u8; LEGACY_BUFFER];
    let mut reset_seen = false;
    for _ in 0..50 {
        client
            .put_audio(AudioFormat::CD_QUALITY, &frame)
            .await
            .unwrap();
        if client.state() == SessionState::Disconnected {
            reset_seen = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(reset_seen);

    client
        .put_audio(AudioFormat::CD_QUALITY, &[0u8; 16])
        .await
        .unwrap();
    assert_eq!(client.state(), SessionState::Recording);
    assert_eq!(server.state().requests_of(Method::Options).len(), 2);
}

#[tokio::test]
async fn test_audio_write_timeout_restarts_on_clean_channel() {
    let server = start_mock(MockRaopConfig {
        stall_audio_after: Some(2),
        ..MockRaopConfig::default()
    })
    .await;
    let config = RaopConfig::builder()
        .connect_timeout(Duration::from_secs(2))
        .io_timeout(Duration::from_millis(300))
        .base_port(47000)
        .build();
    let mut client = RaopClient::new(&server.tcp_target(), config).unwrap();

    // Fill the socket buffers of the stalled connection
    let frame = vec![0u8; LEGACY_BUFFER];
    let mut failure = None;
    for _ in 0..5000 {
        if let Err(e) = client.put_audio(AudioFormat::CD_QUALITY, &frame).await {
            failure = Some(e);
            break;
        }
    }
    let err = failure.expect("audio writes never timed out");
    assert!(matches!(err, RaopError::IoTimeout { .. }));
    assert_eq!(client.state(), SessionState::Disconnected);

    client
        .put_audio(AudioFormat::CD_QUALITY, &frame)
        .await
        .unwrap();
    assert_eq!(client.state(), SessionState::Recording);
    assert_eq!(server.state().requests_of(Method::Options).len(), 2);

    wait_for(&server, |s| s.audio_connections == 2 && s.tcp_frames.len() == 3).await;
    let state = server.state();
    let frame_len = state.tcp_frames[0].len();
    assert!(state.tcp_frames.iter().all(|f| f.len() == frame_len));
}
