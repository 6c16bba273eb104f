//! Answers the receiver's timing requests on the timing UDP socket

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use crate::protocol::rtp::{NtpTimestamp, RaopPayloadType, TimingPacket};

/// Background task replying to timing requests
///
/// Stopped by a terminate datagram the owner sends to the socket itself.
#[derive(Debug)]
pub struct TimingResponder {
    socket: Arc<UdpSocket>,
    handle: Option<JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl TimingResponder {
    /// Spawn the responder on `socket`
    #[must_use]
    pub fn spawn(
        socket: Arc<UdpSocket>,
        receive_timeout: Duration,
        shutdown_timeout: Duration,
    ) -> Self {
        let task_socket = Arc::clone(&socket);
        let handle = tokio::spawn(async move {
            run(task_socket, receive_timeout).await;
        });
        Self {
            socket,
            handle: Some(handle),
            shutdown_timeout,
        }
    }

    /// Whether the task is still running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Send the terminate datagram and wait (bounded) for the task
    pub async fn shutdown(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };

        if !handle.is_finished() {
            match self.socket.local_addr() {
                Ok(addr) => {
                    let target = SocketAddr::new(loopback_for(addr.ip()), addr.port());
                    let packet = TimingPacket::terminate().encode();
                    if let Err(e) = self.socket.send_to(&packet, target).await {
                        tracing::warn!("Failed to signal timing responder: {}", e);
                    }
                }
                Err(e) => tracing::warn!("Timing socket has no local address: {}", e),
            }
        }

        if tokio::time::timeout(self.shutdown_timeout, &mut handle)
            .await
            .is_err()
        {
            tracing::warn!(
                "Timing responder did not stop within {:?}, aborting",
                self.shutdown_timeout
            );
            handle.abort();
        }
    }
}

impl Drop for TimingResponder {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn loopback_for(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V4(v4) if v4.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(v6) if v6.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        other => other,
    }
}

async fn run(socket: Arc<UdpSocket>, receive_timeout: Duration) {
    let mut buf = [0u8; 128];
    tracing::debug!("Timing responder started");

    loop {
        let (len, peer) =
            match tokio::time::timeout(receive_timeout, socket.recv_from(&mut buf)).await {
                Ok(Ok(received)) => received,
                Ok(Err(e)) => {
                    tracing::warn!("Timing socket receive failed: {}", e);
                    break;
                }
                Err(_) => {
                    tracing::warn!(
                        "No timing request within {:?}, stopping responder",
                        receive_timeout
                    );
                    break;
                }
            };

        let request = match TimingPacket::decode(&buf[..len]) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::trace!("Ignoring timing datagram from {}: {}", peer, e);
                continue;
            }
        };

        match request.payload_type {
            RaopPayloadType::TimingRequest => {
                let response = request.response(NtpTimestamp::now()).encode();
                if let Err(e) = socket.send_to(&response, peer).await {
                    tracing::warn!("Failed to send timing response to {}: {}", peer, e);
                }
            }
            RaopPayloadType::Terminate => break,
            other => tracing::trace!("Ignoring {:?} on timing channel", other),
        }
    }

    tracing::debug!("Timing responder stopped");
}
