//! RTP/UDP audio channel with sync packets and send pacing

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::net::UdpSocket;

use super::{ClockSource, RtpClock, TimingResponder, Transport};
use crate::error::{RaopError, Result};
use crate::net::{bind_first_free_udp, with_timeout};
use crate::protocol::rtp::constants::RTP_FRAMES_PER_PACKET;
use crate::protocol::rtp::{NtpTimestamp, RtpAudioHeader, SyncPacket};
use crate::protocol::rtsp::{LowerTransport, ServerTransport};

/// Audio, control and timing sockets, bound once and reused
#[derive(Debug)]
struct SocketSet {
    audio: UdpSocket,
    control: UdpSocket,
    timing: Arc<UdpSocket>,
    control_port: u16,
    timing_port: u16,
}

impl SocketSet {
    async fn bind(local: IpAddr, base_port: u16) -> Result<Self> {
        let (audio, audio_port) = bind_first_free_udp(local, base_port).await?;
        let (control, control_port) =
            bind_first_free_udp(local, audio_port.saturating_add(1)).await?;
        let (timing, timing_port) =
            bind_first_free_udp(local, control_port.saturating_add(1)).await?;
        tracing::debug!(
            "Bound UDP audio={} control={} timing={}",
            audio_port,
            control_port,
            timing_port
        );
        Ok(Self {
            audio,
            control,
            timing: Arc::new(timing),
            control_port,
            timing_port,
        })
    }
}

/// Timing responder settings
#[derive(Debug, Clone, Copy)]
pub struct TimingSettings {
    /// Receive timeout after which the responder exits
    pub receive_timeout: Duration,
    /// Bounded wait on shutdown
    pub shutdown_timeout: Duration,
}

/// Audio as RTP packets over UDP
#[derive(Debug)]
pub struct RtpTransport {
    base_port: u16,
    io_timeout: Duration,
    timing: TimingSettings,
    clock_source: Arc<dyn ClockSource>,
    sockets: Option<SocketSet>,
    remote_audio: Option<SocketAddr>,
    remote_control: Option<SocketAddr>,
    responder: Option<TimingResponder>,
    responder_started: bool,
    clock: RtpClock,
    packet: BytesMut,
}

impl RtpTransport {
    /// Create a transport that binds from `base_port` upwards
    #[must_use]
    pub fn new(
        base_port: u16,
        io_timeout: Duration,
        timing: TimingSettings,
        clock_source: Arc<dyn ClockSource>,
    ) -> Self {
        Self {
            base_port,
            io_timeout,
            timing,
            clock_source,
            sockets: None,
            remote_audio: None,
            remote_control: None,
            responder: None,
            responder_started: false,
            clock: RtpClock::new(),
            packet: BytesMut::with_capacity(
                RtpAudioHeader::SIZE + crate::audio::frame_len(RTP_FRAMES_PER_PACKET),
            ),
        }
    }

    /// Local control and timing ports, once bound
    #[must_use]
    pub fn local_ports(&self) -> Option<(u16, u16)> {
        self.sockets
            .as_ref()
            .map(|s| (s.control_port, s.timing_port))
    }

    /// Whether the timing responder is running
    #[must_use]
    pub fn timing_responder_running(&self) -> bool {
        self.responder.as_ref().is_some_and(TimingResponder::is_running)
    }

    async fn send_sync(&mut self, sockets_control: &UdpSocket, remote: SocketAddr) -> Result<()> {
        let first = self.clock.take_first_sync();
        let ntp = NtpTimestamp::from_system_time(self.clock_source.wall_time());
        let sync = SyncPacket::new(self.clock.timestamp(), ntp, first);
        tracing::trace!("Sync seq={} ts={} first={}", self.clock.sequence(), sync.timestamp, first);

        with_timeout(self.io_timeout, "sync send", async {
            sockets_control
                .send_to(&sync.encode(), remote)
                .await
                .map_err(RaopError::from)
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for RtpTransport {
    fn kind(&self) -> LowerTransport {
        LowerTransport::Udp
    }

    fn frames_per_packet(&self) -> usize {
        RTP_FRAMES_PER_PACKET
    }

    async fn prepare_setup(&mut self, local: IpAddr) -> Result<String> {
        if self.sockets.is_none() {
            self.sockets = Some(SocketSet::bind(local, self.base_port).await?);
        }
        let (control_port, timing_port) = self.local_ports().unwrap_or_default();
        Ok(LowerTransport::Udp.request_header(control_port, timing_port))
    }

    async fn configure(&mut self, remote: IpAddr, server: &ServerTransport) -> Result<()> {
        let server_port = server
            .server_port
            .ok_or_else(|| RaopError::protocol("SETUP response has no server_port"))?;
        self.remote_audio = Some(SocketAddr::new(remote, server_port));
        self.remote_control = server.control_port.map(|p| SocketAddr::new(remote, p));
        if self.remote_control.is_none() {
            tracing::warn!("SETUP response has no control_port, sync packets disabled");
        }

        if !self.responder_started {
            let sockets = self
                .sockets
                .as_ref()
                .ok_or_else(|| RaopError::protocol("SETUP configured before sockets were bound"))?;
            self.responder = Some(TimingResponder::spawn(
                Arc::clone(&sockets.timing),
                self.timing.receive_timeout,
                self.timing.shutdown_timeout,
            ));
            self.responder_started = true;
        }
        Ok(())
    }

    async fn open(&mut self) -> Result<()> {
        if self.remote_audio.is_none() {
            return Err(RaopError::protocol("audio channel opened before SETUP"));
        }
        Ok(())
    }

    async fn send(&mut self, frame: &[u8], samples: u32) -> Result<()> {
        let remote_audio = self.remote_audio.ok_or(RaopError::Disconnected)?;
        let sockets = self.sockets.take().ok_or(RaopError::Disconnected)?;

        let result = async {
            if let Some(delay) = self.clock.pacing_delay(self.clock_source.now()) {
                tokio::time::sleep(delay).await;
            }

            if self.clock.sync_due() {
                if let Some(remote_control) = self.remote_control {
                    self.send_sync(&sockets.control, remote_control).await?;
                }
            }

            self.packet.clear();
            RtpAudioHeader {
                marker: self.clock.marker(),
                sequence: self.clock.sequence(),
                timestamp: self.clock.timestamp(),
            }
            .encode_into(&mut self.packet);
            self.packet.extend_from_slice(frame);

            let packet = &self.packet;
            let audio = &sockets.audio;
            with_timeout(self.io_timeout, "audio send", async {
                audio
                    .send_to(packet, remote_audio)
                    .await
                    .map_err(RaopError::from_stream_io)
            })
            .await?;

            self.clock.advance(samples);
            Ok::<(), RaopError>(())
        }
        .await;

        self.sockets = Some(sockets);
        result
    }

    async fn close(&mut self) {
        // UDP has no per-stream channel; sockets are kept for the next SETUP
    }

    async fn shutdown(&mut self) {
        if let Some(mut responder) = self.responder.take() {
            responder.shutdown().await;
        }
        self.sockets = None;
        self.remote_audio = None;
        self.remote_control = None;
    }

    fn clock(&self) -> &RtpClock {
        &self.clock
    }

    fn clock_mut(&mut self) -> &mut RtpClock {
        &mut self.clock
    }
}
