//! RTSP control connection

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use super::ConnectionStats;
use crate::error::{RaopError, Result};
use crate::net::with_timeout;
use crate::protocol::rtsp::{
    Method, ResponseAction, RtspCodec, RtspCodecError, RtspRequest, RtspResponse, RtspSession,
};

/// One TCP control connection and the RTSP session riding on it
///
/// Requests are strictly sequential: each response (body included) is read
/// before the next request goes out.
#[derive(Debug)]
pub struct ControlChannel {
    framed: Framed<TcpStream, RtspCodec>,
    session: RtspSession,
    local: SocketAddr,
    remote: SocketAddr,
    io_timeout: Duration,
    stats: ConnectionStats,
}

impl ControlChannel {
    /// Open the control connection
    ///
    /// # Errors
    /// `ConnectTimeout` if the connect does not finish within
    /// `connect_timeout`, `ConnectFailed` if it is refused.
    pub async fn connect(
        remote: SocketAddr,
        connect_timeout: Duration,
        io_timeout: Duration,
        mut session: RtspSession,
    ) -> Result<Self> {
        tracing::debug!("Connecting to {}", remote);

        let stream = match tokio::time::timeout(connect_timeout, TcpStream::connect(remote)).await
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
                    duration: connect_timeout,
                });
            }
        };
        stream.set_nodelay(true)?;
        let local = stream.local_addr()?;
        session.set_local_address(local.ip());

        tracing::info!("Control connection {} -> {}", local, remote);

        Ok(Self {
            framed: Framed::new(stream, RtspCodec::new()),
            session,
            local,
            remote,
            io_timeout,
            stats: ConnectionStats {
                connected_at: Some(std::time::Instant::now()),
                ..ConnectionStats::default()
            },
        })
    }

    /// Local end of the control connection
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// Receiver end of the control connection
    #[must_use]
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    /// The RTSP session state
    #[must_use]
    pub fn session(&self) -> &RtspSession {
        &self.session
    }

    /// Mutable RTSP session state
    pub fn session_mut(&mut self) -> &mut RtspSession {
        &mut self.session
    }

    /// Statistics for this connection
    #[must_use]
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Send a request and wait for its response
    ///
    /// A Digest challenge is answered by re-sending once with credentials.
    ///
    /// # Errors
    /// `AuthenticationDenied`, `DeviceBusy` or `Protocol` for rejected
    /// requests; `IoTimeout`, `Disconnected` or a network error when the
    /// exchange itself fails.
    pub async fn request(
        &mut self,
        method: Method,
        extra_headers: &[(&str, String)],
        body: Option<(&str, Vec<u8>)>,
    ) -> Result<RtspResponse> {
        let mut retried = false;
        loop {
            let request = self.session.request(method, extra_headers, body.clone());
            let response = self.round_trip(request).await?;

            match self.session.process_response(method, &response, retried)? {
                ResponseAction::Done => return Ok(response),
                ResponseAction::RetryWithAuth => {
                    tracing::debug!("{} challenged, retrying with credentials", method);
                    retried = true;
                }
            }
        }
    }

    async fn round_trip(&mut self, request: RtspRequest) -> Result<RtspResponse> {
        let encoded = request.encode();
        tracing::debug!(
            ">> Sending RTSP request:\n{}",
            String::from_utf8_lossy(&encoded).trim()
        );

        let framed = &mut self.framed;
        with_timeout(self.io_timeout, "RTSP write", async {
            framed.send(request).await.map_err(codec_error)
        })
        .await?;
        self.stats.record_sent(encoded.len());

        let framed = &mut self.framed;
        let response = with_timeout(self.io_timeout, "RTSP read", async {
            match framed.next().await {
                Some(Ok(response)) => Ok(response),
                Some(Err(e)) => Err(codec_error(e)),
                None => Err(RaopError::Disconnected),
            }
        })
        .await?;
        self.stats.record_received();

        tracing::debug!(
            "<< Received RTSP response: {} {} ({} body bytes)",
            response.status.as_u16(),
            response.reason,
            response.body.len()
        );
        Ok(response)
    }

    /// Close the TCP connection
    pub async fn shutdown(mut self) {
        if let Err(e) = self.framed.get_mut().shutdown().await {
            tracing::debug!("Control connection shutdown: {}", e);
        }
    }
}

fn codec_error(err: RtspCodecError) -> RaopError {
    match err {
        RtspCodecError::Io(e) => RaopError::from_stream_io(e),
        other => RaopError::protocol(other.to_string()),
    }
}
