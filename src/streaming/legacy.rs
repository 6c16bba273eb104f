//! Legacy audio channel: length-prefixed frames over TCP

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use super::{RtpClock, Transport};
use crate::error::{RaopError, Result};
use crate::net::with_timeout;
use crate::protocol::rtp::LegacyFrameHeader;
use crate::protocol::rtp::constants::LEGACY_FRAMES_PER_PACKET;
use crate::protocol::rtsp::{LowerTransport, ServerTransport};

/// Audio over a dedicated TCP connection to the receiver's `server_port`
#[derive(Debug)]
pub struct LegacyTransport {
    connect_timeout: Duration,
    io_timeout: Duration,
    remote: Option<SocketAddr>,
    stream: Option<TcpStream>,
    clock: RtpClock,
    packet: BytesMut,
}

impl LegacyTransport {
    /// Create a transport with the given connect and write timeouts
    #[must_use]
    pub fn new(connect_timeout: Duration, io_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            io_timeout,
            remote: None,
            stream: None,
            clock: RtpClock::new(),
            packet: BytesMut::with_capacity(
                LegacyFrameHeader::SIZE + crate::audio::frame_len(LEGACY_FRAMES_PER_PACKET),
            ),
        }
    }

    /// Whether the audio connection is open
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

#[async_trait]
impl Transport for LegacyTransport {
    fn kind(&self) -> LowerTransport {
        LowerTransport::Tcp
    }

    fn frames_per_packet(&self) -> usize {
        LEGACY_FRAMES_PER_PACKET
    }

    async fn prepare_setup(&mut self, _local: IpAddr) -> Result<String> {
        Ok(LowerTransport::Tcp.request_header(0, 0))
    }

    async fn configure(&mut self, remote: IpAddr, server: &ServerTransport) -> Result<()> {
        let port = server
            .server_port
            .ok_or_else(|| RaopError::protocol("SETUP response has no server_port"))?;
        self.remote = Some(SocketAddr::new(remote, port));
        Ok(())
    }

    async fn open(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let remote = self
            .remote
            .ok_or_else(|| RaopError::protocol("audio channel opened before SETUP"))?;

        tracing::debug!("Opening audio connection to {}", remote);
        let stream = match tokio::time::timeout(self.connect_timeout, TcpStream::connect(remote)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(RaopError::ConnectFailed {
                    address: remote.to_string(),
                    source,
                });
            }
            Err(_) => {
                return Err(RaopError::ConnectTimeout {
                    duration: self.connect_timeout,
                });
            }
        };
        stream.set_nodelay(true)?;
        self.stream = Some(stream);
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    async fn send(&mut self, frame: &[u8], samples: u32) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(RaopError::Disconnected)?;

        self.packet.clear();
        LegacyFrameHeader {
            frame_len: frame.len() as u16,
        }
        .encode_into(&mut self.packet);
        self.packet.extend_from_slice(frame);

        let packet = &self.packet;
        let result = with_timeout(self.io_timeout, "audio write", async {
            stream
                .write_all(packet)
                .await
                .map_err(RaopError::from_stream_io)
        })
        .await;

        if let Err(e) = result {
            // A partial frame may be on the wire; nothing can follow it here
            if e.is_connection_reset() {
                tracing::warn!("Audio connection reset by receiver");
            } else {
                tracing::warn!("Audio write failed, closing audio connection: {}", e);
            }
            self.stream = None;
            return Err(e);
        }

        self.clock.advance(samples);
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
    }

    async fn shutdown(&mut self) {
        self.close().await;
        self.remote = None;
    }

    fn clock(&self) -> &RtpClock {
        &self.clock
    }

    fn clock_mut(&mut self) -> &mut RtpClock {
        &mut self.clock
    }
}
