//! Mock RAOP receiver for testing
//!
//! Speaks enough RTSP to take a sender through OPTIONS, ANNOUNCE, SETUP and
//! RECORD, optionally demanding Digest authentication or answering busy,
//! and captures whatever arrives on the TCP or UDP audio channels.

use std::sync::{Arc, Mutex, MutexGuard};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::broadcast;

use crate::protocol::raop::auth::extract_field;
use crate::protocol::raop::{DIGEST_USERNAME, RaopDecryptor, digest_response};
use crate::protocol::rtp::{LegacyFrameHeader, RaopPayloadType};
use crate::protocol::rtsp::headers::{names, raop};
use crate::protocol::rtsp::{Headers, Method, RtspRequest, RtspResponse, StatusCode};
use crate::protocol::sdp::AnnounceSdp;

/// Everything the mock has seen
#[derive(Debug, Clone, Default)]
pub struct MockRaopState {
    /// Every request, in arrival order, including rejected ones
    pub requests: Vec<RtspRequest>,
    /// Session id handed out by SETUP
    pub session_id: Option<String>,
    /// SDP body of the last ANNOUNCE
    pub announced_sdp: Option<String>,
    /// Whether the last ANNOUNCE carried `rsaaeskey`/`aesiv`
    pub encrypted: bool,
    /// Between RECORD and TEARDOWN
    pub recording: bool,
    /// Last volume received (dB)
    pub volume_db: Option<f32>,
    /// Frames received on the TCP audio channel, headers stripped
    pub tcp_frames: Vec<Vec<u8>>,
    /// TCP audio connections accepted
    pub audio_connections: usize,
    /// RTP audio packets received on the UDP audio socket
    pub rtp_packets: Vec<Vec<u8>>,
    /// Sync packets received on the control socket
    pub sync_packets: Vec<Vec<u8>>,
}

impl MockRaopState {
    /// Requests of one method
    #[must_use]
    pub fn requests_of(&self, method: Method) -> Vec<&RtspRequest> {
        self.requests.iter().filter(|r| r.method == method).collect()
    }

    /// Audio payloads in arrival order, decrypted with the default key when
    /// the stream was announced as encrypted
    #[must_use]
    pub fn audio_payloads(&self) -> Vec<Vec<u8>> {
        let decryptor = self.encrypted.then(RaopDecryptor::default);
        let payloads = self
            .tcp_frames
            .iter()
            .cloned()
            .chain(self.rtp_packets.iter().map(|p| p[p.len().min(12)..].to_vec()));
        payloads
            .map(|frame| match &decryptor {
                Some(d) => d.decrypt(&frame),
                None => frame,
            })
            .collect()
    }
}

/// Mock RAOP receiver configuration
#[derive(Debug, Clone)]
pub struct MockRaopConfig {
    /// RTSP port (0 for dynamic)
    pub rtsp_port: u16,
    /// Password demanded through Digest authentication
    pub password: Option<String>,
    /// Digest realm
    pub realm: String,
    /// Digest nonce
    pub nonce: String,
    /// Answer ANNOUNCE with 453
    pub busy: bool,
    /// Answer an `Apple-Challenge` with `Apple-Response`, offering encryption
    pub offer_encryption: bool,
    /// Omit `control_port` from UDP SETUP responses
    pub omit_control_port: bool,
    /// Close the TCP audio connection after this many frames
    pub drop_audio_after: Option<usize>,
    /// Stop reading the first TCP audio connection after this many frames,
    /// holding it open until shutdown
    pub stall_audio_after: Option<usize>,
}

impl Default for MockRaopConfig {
    fn default() -> Self {
        Self {
            rtsp_port: 0,
            password: None,
            realm: "raop".to_string(),
            nonce: "a3f1c9e07b".to_string(),
            busy: false,
            offer_encryption: true,
            omit_control_port: false,
            drop_audio_after: None,
            stall_audio_after: None,
        }
    }
}

/// Audio-side ports advertised in SETUP responses
#[derive(Debug, Clone, Copy, Default)]
struct AudioPorts {
    tcp: u16,
    udp: u16,
    control: u16,
    timing: u16,
}

/// Mock RAOP receiver
#[derive(Debug)]
pub struct MockRaopServer {
    /// Configuration; `rtsp_port` holds the bound port once started
    pub config: MockRaopConfig,
    state: Arc<Mutex<MockRaopState>>,
    ports: AudioPorts,
    shutdown: Option<broadcast::Sender<()>>,
}

impl MockRaopServer {
    /// Create a stopped mock
    #[must_use]
    pub fn new(config: MockRaopConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(MockRaopState::default())),
            ports: AudioPorts::default(),
            shutdown: None,
        }
    }

    /// `host:port` of the RTSP listener
    #[must_use]
    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.config.rtsp_port)
    }

    /// Target string for the legacy TCP transport
    #[must_use]
    pub fn tcp_target(&self) -> String {
        self.target("raop")
    }

    /// Target string for the RTP/UDP transport
    #[must_use]
    pub fn udp_target(&self) -> String {
        self.target("raop+udp")
    }

    fn target(&self, scheme: &str) -> String {
        match &self.config.password {
            Some(password) => format!("{scheme}://{password}@{}", self.address()),
            None => format!("{scheme}://{}", self.address()),
        }
    }

    /// Bind every socket and start serving
    ///
    /// # Errors
    /// `MockServerError::BindFailed` if a socket cannot be bound.
    pub async fn start(&mut self) -> Result<(), MockServerError> {
        if self.shutdown.is_some() {
            return Ok(());
        }

        let listener = TcpListener::bind(("127.0.0.1", self.config.rtsp_port))
            .await
            .map_err(|e| MockServerError::BindFailed(format!("RTSP: {e}")))?;
        let audio_listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| MockServerError::BindFailed(format!("TCP audio: {e}")))?;
        let audio_socket = bind_udp("UDP audio").await?;
        let control_socket = bind_udp("control").await?;
        let timing_socket = bind_udp("timing").await?;

        self.config.rtsp_port = local_port(listener.local_addr())?;
        self.ports = AudioPorts {
            tcp: local_port(audio_listener.local_addr())?,
            udp: local_port(audio_socket.local_addr())?,
            control: local_port(control_socket.local_addr())?,
            timing: local_port(timing_socket.local_addr())?,
        };

        let (shutdown_tx, _) = broadcast::channel(1);

        // RTSP listener
        let state = Arc::clone(&self.state);
        let config = self.config.clone();
        let ports = self.ports;
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => match result {
                        Ok((stream, _)) => {
                            let state = Arc::clone(&state);
                            let config = config.clone();
                            tokio::spawn(handle_control(stream, state, config, ports));
                        }
                        Err(e) => tracing::error!("Mock accept error: {}", e),
                    },
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        // TCP audio listener
        let state = Arc::clone(&self.state);
        let drop_after = self.config.drop_audio_after;
        let mut stall_after = self.config.stall_audio_after;
        let stall_tx = shutdown_tx.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = audio_listener.accept() => {
                        if let Ok((stream, _)) = result {
                            lock(&state).audio_connections += 1;
                            let limits = AudioLimits {
                                drop_after,
                                stall_after: stall_after.take(),
                            };
                            tokio::spawn(capture_tcp_audio(
                                stream,
                                Arc::clone(&state),
                                limits,
                                stall_tx.subscribe(),
                            ));
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        // UDP audio and control capture; timing requests go unanswered
        let state = Arc::clone(&self.state);
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let _timing = timing_socket;
            let mut audio_buf = [0u8; 2048];
            let mut control_buf = [0u8; 256];
            loop {
                tokio::select! {
                    res = audio_socket.recv_from(&mut audio_buf) => {
                        if let Ok((n, _)) = res {
                            lock(&state).rtp_packets.push(audio_buf[..n].to_vec());
                        }
                    }
                    res = control_socket.recv_from(&mut control_buf) => {
                        if let Ok((n, _)) = res {
                            if n > 1 && RaopPayloadType::from_byte(control_buf[1]) == Some(RaopPayloadType::Sync) {
                                lock(&state).sync_packets.push(control_buf[..n].to_vec());
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        self.shutdown = Some(shutdown_tx);
        Ok(())
    }

    /// Stop serving
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn state(&self) -> MockRaopState {
        lock(&self.state).clone()
    }

    /// Forget everything seen so far
    pub fn reset(&self) {
        *lock(&self.state) = MockRaopState::default();
    }
}

impl Drop for MockRaopServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Mock server errors
#[derive(Debug, thiserror::Error)]
pub enum MockServerError {
    /// Failed to bind to a port
    #[error("bind failed: {0}")]
    BindFailed(String),
}

fn lock(state: &Mutex<MockRaopState>) -> MutexGuard<'_, MockRaopState> {
    state
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

async fn bind_udp(what: &str) -> Result<UdpSocket, MockServerError> {
    UdpSocket::bind("127.0.0.1:0")
        .await
        .map_err(|e| MockServerError::BindFailed(format!("{what}: {e}")))
}

fn local_port(addr: std::io::Result<std::net::SocketAddr>) -> Result<u16, MockServerError> {
    addr.map(|a| a.port())
        .map_err(|e| MockServerError::BindFailed(e.to_string()))
}

/// Misbehaviour of one TCP audio connection
#[derive(Debug, Clone, Copy)]
struct AudioLimits {
    drop_after: Option<usize>,
    stall_after: Option<usize>,
}

async fn capture_tcp_audio(
    mut stream: TcpStream,
    state: Arc<Mutex<MockRaopState>>,
    limits: AudioLimits,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut received = 0usize;
    let mut header = [0u8; LegacyFrameHeader::SIZE];
    loop {
        if limits.drop_after.is_some_and(|limit| received >= limit) {
            tracing::debug!("Mock dropping audio connection after {} frames", received);
            return;
        }
        if limits.stall_after.is_some_and(|limit| received >= limit) {
            tracing::debug!("Mock stalling audio connection after {} frames", received);
            let _ = shutdown_rx.recv().await;
            return;
        }
        if stream.read_exact(&mut header).await.is_err() {
            return;
        }
        let Ok(parsed) = LegacyFrameHeader::decode(&header) else {
            return;
        };
        let mut frame = vec![0u8; usize::from(parsed.frame_len)];
        if stream.read_exact(&mut frame).await.is_err() {
            return;
        }
        lock(&state).tcp_frames.push(frame);
        received += 1;
    }
}

async fn handle_control(
    mut stream: TcpStream,
    state: Arc<Mutex<MockRaopState>>,
    config: MockRaopConfig,
    ports: AudioPorts,
) {
    let mut buffer = Vec::new();
    let mut temp_buf = vec![0u8; 4096];

    loop {
        let n = match stream.read(&mut temp_buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buffer.extend_from_slice(&temp_buf[..n]);

        while let Some((request, consumed)) = try_parse_request(&buffer) {
            buffer.drain(..consumed);
            let response = process_request(&request, &state, &config, ports);
            lock(&state).requests.push(request);
            if stream.write_all(&response.encode()).await.is_err() {
                return;
            }
        }
    }
}

fn try_parse_request(data: &[u8]) -> Option<(RtspRequest, usize)> {
    let header_end = data.windows(4).position(|w| w == b"\r\n\r\n")?;
    let header_len = header_end + 4;
    let header_str = String::from_utf8_lossy(&data[..header_end]);
    let mut lines = header_str.split("\r\n");

    let mut parts = lines.next()?.split_whitespace();
    let method = Method::parse(parts.next()?)?;
    let uri = parts.next()?.to_string();

    let headers: Headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect();
    let content_length = headers.content_length().unwrap_or(0);

    if data.len() < header_len + content_length {
        return None;
    }
    let body = data[header_len..header_len + content_length].to_vec();
    Some((
        RtspRequest {
            method,
            uri,
            headers,
            body,
        },
        header_len + content_length,
    ))
}

fn respond(request: &RtspRequest, status: StatusCode, reason: &str) -> RtspResponse {
    let mut response = RtspResponse::new(status, reason);
    response
        .headers
        .insert(names::CSEQ, request.headers.cseq().unwrap_or(0).to_string());
    response
}

fn authorized(request: &RtspRequest, config: &MockRaopConfig) -> bool {
    let Some(password) = &config.password else {
        return true;
    };
    let Some(header) = request.headers.get(names::AUTHORIZATION) else {
        return false;
    };
    let expected = digest_response(
        DIGEST_USERNAME,
        &config.realm,
        password,
        request.method.as_str(),
        &request.uri,
        &config.nonce,
    );
    extract_field(header, "username") == Some(DIGEST_USERNAME)
        && extract_field(header, "response") == Some(expected.as_str())
}

fn process_request(
    request: &RtspRequest,
    state: &Mutex<MockRaopState>,
    config: &MockRaopConfig,
    ports: AudioPorts,
) -> RtspResponse {
    if !authorized(request, config) {
        let mut response = respond(request, StatusCode::UNAUTHORIZED, "Unauthorized");
        response.headers.insert(
            names::WWW_AUTHENTICATE,
            format!(
                "Digest realm=\"{}\", nonce=\"{}\"",
                config.realm, config.nonce
            ),
        );
        return response;
    }

    match request.method {
        Method::Options => {
            let mut response = respond(request, StatusCode::OK, "OK");
            response.headers.insert(
                "Public",
                "ANNOUNCE, SETUP, RECORD, FLUSH, TEARDOWN, OPTIONS, GET_PARAMETER, SET_PARAMETER",
            );
            if config.offer_encryption {
                if let Some(challenge) = request.headers.get(raop::APPLE_CHALLENGE) {
                    // Not a signature; the sender only checks for presence
                    let echo = STANDARD_NO_PAD.encode(challenge.as_bytes());
                    response.headers.insert(raop::APPLE_RESPONSE, echo);
                }
            }
            response
        }
        Method::Announce => {
            if config.busy {
                return respond(request, StatusCode::NOT_ENOUGH_BANDWIDTH, "Not Enough Bandwidth");
            }
            let sdp = String::from_utf8_lossy(&request.body).to_string();
            let encrypted = AnnounceSdp::parse(&sdp).is_ok_and(|parsed| parsed.is_encrypted());
            let mut state = lock(state);
            state.announced_sdp = Some(sdp);
            state.encrypted = encrypted;
            respond(request, StatusCode::OK, "OK")
        }
        Method::Setup => {
            let requested = request.headers.get(names::TRANSPORT).unwrap_or_default();
            let transport = if requested.contains("RTP/AVP/TCP") {
                format!(
                    "RTP/AVP/TCP;unicast;interleaved=0-1;mode=record;server_port={}",
                    ports.tcp
                )
            } else if config.omit_control_port {
                format!(
                    "RTP/AVP/UDP;unicast;mode=record;server_port={};timing_port={}",
                    ports.udp, ports.timing
                )
            } else {
                format!(
                    "RTP/AVP/UDP;unicast;mode=record;server_port={};control_port={};timing_port={}",
                    ports.udp, ports.control, ports.timing
                )
            };

            let session_id = format!("{:08X}", rand::random::<u32>());
            lock(state).session_id = Some(session_id.clone());

            let mut response = respond(request, StatusCode::OK, "OK");
            response
                .headers
                .insert(names::SESSION, format!("{session_id};timeout=60"));
            response.headers.insert(names::TRANSPORT, transport);
            response
        }
        Method::Record => {
            lock(state).recording = true;
            let mut response = respond(request, StatusCode::OK, "OK");
            response.headers.insert(raop::AUDIO_LATENCY, "11025");
            response
        }
        Method::Teardown => {
            lock(state).recording = false;
            respond(request, StatusCode::OK, "OK")
        }
        Method::SetParameter => {
            let body = String::from_utf8_lossy(&request.body);
            if let Some(volume) = body
                .lines()
                .find_map(|l| l.strip_prefix("volume:"))
                .and_then(|v| v.trim().parse::<f32>().ok())
            {
                lock(state).volume_db = Some(volume);
            }
            respond(request, StatusCode::OK, "OK")
        }
        Method::Flush | Method::GetParameter => respond(request, StatusCode::OK, "OK"),
    }
}
