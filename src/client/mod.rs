//! RAOP streaming client

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD_NO_PAD;

use crate::audio::{AudioFormat, FrameBuffer, RaopAudioEncoder};
use crate::connection::{ControlChannel, SessionFlags, SessionState};
use crate::control::{VOLUME_CONTENT_TYPE, Volume};
use crate::error::{RaopError, Result};
use crate::net::resolve;
use crate::protocol::raop::{DEFAULT_AES_IV, RaopEncryptor};
use crate::protocol::rtp::constants::TIMESTAMP_ORIGIN;
use crate::protocol::rtsp::headers::{names, raop};
use crate::protocol::rtsp::{LowerTransport, Method, RtspSession};
use crate::protocol::sdp::{AnnounceParams, create_raop_announce_sdp};
use crate::streaming::{
    AudioSink, ClockSource, LegacyTransport, RtpTransport, SystemClock, TimingSettings,
    Transport,
};
use crate::types::{RaopConfig, RaopTarget};

#[cfg(test)]
mod tests;

/// Streams PCM to one RAOP receiver
///
/// The session is driven lazily: the first `put_audio` (or an explicit
/// `start`) runs OPTIONS, ANNOUNCE, SETUP and RECORD, and a session lost to
/// a connection reset is re-established by the next write.
///
/// # Example
///
/// ```rust,no_run
/// use raop_output::{AudioFormat, AudioSink, RaopClient, RaopConfig};
///
/// # async fn example() -> Result<(), raop_output::RaopError> {
/// let mut client = RaopClient::new("raop+udp://192.168.1.20:5000", RaopConfig::default())?;
/// client.set_volume(0.5).await?;
///
/// let silence = vec![0u8; 1408 * 10];
/// client.put_audio(AudioFormat::CD_QUALITY, &silence).await?;
/// client.drain().await?;
/// client.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RaopClient {
    config: RaopConfig,
    target: RaopTarget,
    transport: Box<dyn Transport>,
    control: Option<ControlChannel>,
    /// Our session id, used in the request URI and SDP origin
    client_session_id: String,
    /// Derived on the first connect and kept for the object's lifetime
    client_instance: Option<String>,
    encoder: RaopAudioEncoder,
    buffer: FrameBuffer,
    flags: SessionFlags,
    encryption_supported: bool,
    volume: Volume,
    volume_pending: bool,
}

impl RaopClient {
    /// Create a client for `raop://` or `raop+udp://` targets
    ///
    /// # Errors
    /// `InvalidTarget` if the target string does not parse.
    pub fn new(target: &str, config: RaopConfig) -> Result<Self> {
        Self::with_clock(target, config, Arc::new(SystemClock))
    }

    /// Create a client whose RTP pacing reads `clock`
    ///
    /// # Errors
    /// `InvalidTarget` if the target string does not parse.
    pub fn with_clock(
        target: &str,
        config: RaopConfig,
        clock: Arc<dyn ClockSource>,
    ) -> Result<Self> {
        let target = RaopTarget::parse(target)?;
        let transport: Box<dyn Transport> = match target.transport {
            LowerTransport::Tcp => Box::new(LegacyTransport::new(
                config.connect_timeout,
                config.io_timeout,
            )),
            LowerTransport::Udp => Box::new(RtpTransport::new(
                config.base_port,
                config.io_timeout,
                TimingSettings {
                    receive_timeout: config.timing_receive_timeout,
                    shutdown_timeout: config.timing_shutdown_timeout,
                },
                clock,
            )),
        };
        let buffer = FrameBuffer::new(transport.frame_bytes());

        tracing::debug!("RAOP client for {} ({:?})", target, target.transport);

        Ok(Self {
            config,
            target,
            transport,
            control: None,
            client_session_id: rand::random::<u32>().to_string(),
            client_instance: None,
            encoder: RaopAudioEncoder::default(),
            buffer,
            flags: SessionFlags::default(),
            encryption_supported: false,
            volume: Volume::MAX,
            volume_pending: false,
        })
    }

    /// Parsed target
    #[must_use]
    pub fn target(&self) -> &RaopTarget {
        &self.target
    }

    /// Current session state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.flags.state()
    }

    /// Whether audio is being dropped until `resume`
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.flags.paused
    }

    /// Session id assigned by the receiver
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.control.as_ref().and_then(|c| c.session().session_id())
    }

    /// Whether frames are currently encrypted
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.encoder.is_encrypted()
    }

    /// Bytes waiting in the frame buffer
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Bring the session up to recording
    ///
    /// Each step runs only if it has not already succeeded, so a failed
    /// connect can be retried and resumes where it stopped.
    ///
    /// # Errors
    /// Name resolution, connect, RTSP and transport errors of the failing
    /// step. A dead control connection is dropped so the next call starts over.
    pub async fn connect(&mut self) -> Result<()> {
        let result = self.connect_steps().await;
        if let Err(e) = &result {
            tracing::warn!("Connect to {} failed: {}", self.target, e);
            if e.is_connection_reset() {
                self.reset().await;
            }
        }
        result
    }

    async fn connect_steps(&mut self) -> Result<()> {
        if self.control.is_none() {
            self.open_control().await?;
        }

        if !self.flags.connected {
            self.options().await?;
        }
        if !self.flags.announced {
            self.announce().await?;
        }
        if !self.flags.setup {
            self.setup().await?;
        }
        if !self.flags.recording {
            self.record().await?;
        }

        if self.volume_pending {
            self.send_volume().await?;
            self.volume_pending = false;
        }
        Ok(())
    }

    async fn open_control(&mut self) -> Result<()> {
        let remote = resolve(&self.target.host, self.target.port).await?;
        let session = RtspSession::new(
            self.client_session_id.as_str(),
            self.client_instance.clone().unwrap_or_default(),
            self.config.user_agent.as_str(),
            self.target.password.clone(),
        );
        let mut control = ControlChannel::connect(
            remote,
            self.config.connect_timeout,
            self.config.io_timeout,
            session,
        )
        .await?;

        let local = control.local_addr();
        let instance = self
            .client_instance
            .get_or_insert_with(|| derive_client_instance(local))
            .clone();
        control.session_mut().set_client_instance(instance);

        self.control = Some(control);
        Ok(())
    }

    fn control(&mut self) -> Result<&mut ControlChannel> {
        self.control.as_mut().ok_or(RaopError::Disconnected)
    }

    async fn options(&mut self) -> Result<()> {
        let challenge: [u8; 16] = rand::random();
        let headers = [(raop::APPLE_CHALLENGE, STANDARD_NO_PAD.encode(challenge))];

        let response = self
            .control()?
            .request(Method::Options, &headers, None)
            .await?;

        self.encryption_supported = response.offers_encryption();
        self.flags.connected = true;
        tracing::info!(
            "Connected to {} (encryption {})",
            self.target,
            if self.encryption_supported {
                "offered"
            } else {
                "not offered"
            }
        );
        Ok(())
    }

    async fn announce(&mut self) -> Result<()> {
        let encrypt = self.config.encryption && self.encryption_supported;
        let aes_iv = STANDARD_NO_PAD.encode(DEFAULT_AES_IV);
        let control = self.control()?;
        let local = control.local_addr().ip();
        let remote = control.remote_addr().ip();

        let sdp = create_raop_announce_sdp(&AnnounceParams {
            session_id: &self.client_session_id,
            local,
            remote,
            frames_per_packet: self.transport.frames_per_packet(),
            encryption: encrypt.then_some((self.config.rsa_aes_key.as_str(), aes_iv.as_str())),
        });

        let control = self.control.as_mut().ok_or(RaopError::Disconnected)?;
        control
            .request(
                Method::Announce,
                &[],
                Some(("application/sdp", sdp.into_bytes())),
            )
            .await?;

        self.encoder
            .set_encryptor(encrypt.then(RaopEncryptor::default));
        self.flags.announced = true;
        tracing::debug!("Stream announced (encrypted: {})", encrypt);
        Ok(())
    }

    async fn setup(&mut self) -> Result<()> {
        let control = self.control.as_mut().ok_or(RaopError::Disconnected)?;
        let local = control.local_addr().ip();
        let remote = control.remote_addr().ip();

        let transport_header = self.transport.prepare_setup(local).await?;
        let response = control
            .request(Method::Setup, &[(names::TRANSPORT, transport_header)], None)
            .await?;

        let server = response.server_transport();
        tracing::debug!("Receiver transport: {:?}", server);
        self.transport.configure(remote, &server).await?;

        self.flags.setup = true;
        Ok(())
    }

    async fn record(&mut self) -> Result<()> {
        self.transport.clock_mut().reset();
        let headers = [
            (names::RANGE, "npt=0-".to_string()),
            (
                names::RTP_INFO,
                format!(
                    "seq={};rtptime={}",
                    self.transport.clock().sequence(),
                    TIMESTAMP_ORIGIN
                ),
            ),
        ];

        let response = self
            .control()?
            .request(Method::Record, &headers, None)
            .await?;
        if let Some(latency) = response.headers.audio_latency() {
            tracing::info!("Receiver audio latency: {} samples", latency);
        }

        self.transport.open().await?;
        self.buffer.clear();
        self.flags.recording = true;
        tracing::info!("Recording to {}", self.target);
        Ok(())
    }

    async fn send_volume(&mut self) -> Result<()> {
        let body = self.volume.parameter_body();
        tracing::debug!("Setting volume {:.1} dB", self.volume.to_db());
        self.control()?
            .request(
                Method::SetParameter,
                &[],
                Some((VOLUME_CONTENT_TYPE, body.into_bytes())),
            )
            .await?;
        Ok(())
    }

    /// Ask the receiver to drop queued audio and restart the clock
    ///
    /// # Errors
    /// RTSP errors of the FLUSH request.
    pub async fn flush(&mut self) -> Result<()> {
        let rtp_info = format!(
            "seq={};rtptime={}",
            self.transport.clock().sequence(),
            TIMESTAMP_ORIGIN
        );
        self.buffer.clear();
        self.transport.clock_mut().reset();

        self.control()?
            .request(Method::Flush, &[(names::RTP_INFO, rtp_info)], None)
            .await?;
        Ok(())
    }

    /// End the stream but keep the control connection
    ///
    /// # Errors
    /// RTSP errors of the TEARDOWN request; local state is cleared either way.
    pub async fn teardown(&mut self) -> Result<()> {
        let result = match self.control.as_mut() {
            Some(control) => control.request(Method::Teardown, &[], None).await.map(drop),
            None => Ok(()),
        };
        if let Some(control) = self.control.as_mut() {
            control.session_mut().end_stream();
        }

        self.flags.end_stream();
        self.transport.close().await;
        self.buffer.clear();
        self.transport.clock_mut().reset();
        tracing::info!("Stream to {} torn down", self.target);

        match result {
            Err(e) if e.is_connection_reset() => {
                self.reset().await;
                Ok(())
            }
            other => other,
        }
    }

    /// Drop the control connection and every session flag
    ///
    /// The next audio write connects again from scratch.
    pub async fn reset(&mut self) {
        tracing::info!("Resetting session with {}", self.target);
        if let Some(control) = self.control.take() {
            control.shutdown().await;
        }
        self.transport.close().await;
        self.transport.clock_mut().reset();
        self.buffer.clear();
        self.encoder.set_encryptor(None);
        self.encryption_supported = false;

        let paused = self.flags.paused;
        self.flags.clear();
        self.flags.paused = paused;
    }

    /// Keep the receiver from timing the session out
    ///
    /// # Errors
    /// `Disconnected` without a control connection, otherwise RTSP errors.
    pub async fn keep_alive(&mut self) -> Result<()> {
        if !self.flags.connected {
            return Err(RaopError::Disconnected);
        }
        self.control()?
            .request(Method::GetParameter, &[], None)
            .await?;
        Ok(())
    }

    async fn send_buffer(&mut self) -> Result<()> {
        let frame = self.encoder.encode(self.buffer.as_slice());
        #[allow(clippy::cast_possible_truncation)]
        let samples = (self.buffer.len() / 4) as u32;
        self.buffer.clear();
        self.transport.send(&frame, samples).await
    }

    /// Send the full buffer, absorbing a receiver reset
    ///
    /// Returns `false` when the session was reset. Any other failed audio
    /// write also resets the session, so the next write starts on a fresh
    /// audio channel, but its error is returned.
    async fn transmit(&mut self) -> Result<bool> {
        match self.send_buffer().await {
            Ok(()) => Ok(true),
            Err(e) if e.is_connection_reset() => {
                tracing::warn!("Receiver dropped the stream: {}", e);
                self.reset().await;
                Ok(false)
            }
            Err(e) => {
                tracing::warn!("Audio write to {} failed: {}", self.target, e);
                self.reset().await;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl AudioSink for RaopClient {
    async fn put_audio(&mut self, format: AudioFormat, data: &[u8]) -> Result<()> {
        format.ensure_supported()?;
        if self.flags.paused {
            return Ok(());
        }
        if !self.flags.connected || !self.flags.recording {
            self.connect().await?;
        }

        let mut input = data;
        while !input.is_empty() {
            let taken = self.buffer.fill(input);
            input = &input[taken..];
            if self.buffer.is_full() && !self.transmit().await? {
                // The rest of this write belongs to the dropped session
                break;
            }
        }
        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        self.connect().await
    }

    async fn stop(&mut self) -> Result<()> {
        if !(self.flags.announced || self.flags.setup || self.flags.recording) {
            return Ok(());
        }
        self.teardown().await
    }

    async fn pause(&mut self) -> Result<()> {
        if self.flags.paused {
            return Ok(());
        }
        self.flags.paused = true;
        if self.flags.recording {
            self.flush().await?;
        }
        self.buffer.clear();
        Ok(())
    }

    async fn resume(&mut self) -> Result<()> {
        self.flags.paused = false;
        Ok(())
    }

    async fn seek(&mut self) -> Result<()> {
        if self.flags.recording {
            self.flush().await?;
        }
        self.buffer.clear();
        Ok(())
    }

    async fn drain(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.buffer.pad_with_silence();
        self.transmit().await.map(drop)
    }

    async fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.volume = Volume::new(volume);
        if self.flags.setup && self.control.is_some() {
            self.send_volume().await
        } else {
            tracing::debug!("Volume {} latched until connected", volume);
            self.volume_pending = true;
            Ok(())
        }
    }

    fn volume(&self) -> f32 {
        self.volume.as_f32()
    }

    async fn close(&mut self) -> Result<()> {
        if let Err(e) = self.stop().await {
            tracing::warn!("TEARDOWN failed while closing: {}", e);
        }
        if let Some(control) = self.control.take() {
            control.shutdown().await;
        }
        self.transport.shutdown().await;
        let paused = self.flags.paused;
        self.flags.clear();
        self.flags.paused = paused;
        Ok(())
    }
}

/// Stable per-client identifier sent as `Client-Instance` and `DACP-ID`
fn derive_client_instance(local: SocketAddr) -> String {
    let mut hasher = DefaultHasher::new();
    SystemTime::now().hash(&mut hasher);
    local.hash(&mut hasher);
    rand::random::<u64>().hash(&mut hasher);
    format!("{:016X}", hasher.finish())
}
