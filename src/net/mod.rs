//! Networking helpers: name resolution, bounded I/O and UDP port discovery

use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::{UdpSocket, lookup_host};

use crate::error::{RaopError, Result};

/// Resolve `host:port`, preferring IPv4
///
/// # Errors
/// Returns `RaopError::NameResolution` if the host yields no address.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = match lookup_host((host, port)).await {
        Ok(addrs) => addrs.collect(),
        Err(e) => {
            return Err(RaopError::NameResolution {
                host: host.to_string(),
                source: Some(e),
            });
        }
    };

    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| RaopError::NameResolution {
            host: host.to_string(),
            source: None,
        })
}

/// Run an I/O future with a timeout
///
/// # Errors
/// Returns `RaopError::IoTimeout` when the timeout elapses, otherwise the
/// future's own error.
pub async fn with_timeout<T, F>(duration: Duration, operation: &'static str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("{} timed out after {:?}", operation, duration);
            Err(RaopError::IoTimeout {
                operation,
                duration,
            })
        }
    }
}

/// Bind a UDP socket on the first free port at or above `base_port`
///
/// # Errors
/// Returns the last bind error when every port up to 65535 is taken.
pub async fn bind_first_free_udp(local: IpAddr, base_port: u16) -> Result<(UdpSocket, u16)> {
    let mut last_err = io::Error::new(io::ErrorKind::AddrInUse, "no free UDP port");
    for port in base_port..=u16::MAX {
        match UdpSocket::bind(SocketAddr::new(local, port)).await {
            Ok(socket) => {
                let port = socket.local_addr()?.port();
                return Ok((socket, port));
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => last_err = e,
            Err(e) => return Err(e.into()),
        }
    }
    Err(last_err.into())
}
