use std::fmt;
use std::str::FromStr;

use crate::error::RaopError;
use crate::protocol::rtsp::LowerTransport;

/// A receiver selected by a target string
///
/// `raop://[password@]host:port` streams over the legacy TCP channel,
/// `raop+udp://[password@]host:port` over RTP/UDP.
#[derive(Clone, PartialEq, Eq)]
pub struct RaopTarget {
    /// Audio transport selected by the scheme
    pub transport: LowerTransport,
    /// Receiver password, if any
    pub password: Option<String>,
    /// Receiver host name or address
    pub host: String,
    /// RTSP port
    pub port: u16,
}

impl RaopTarget {
    /// Scheme for the legacy TCP variant
    pub const LEGACY_SCHEME: &'static str = "raop";
    /// Scheme for the RTP/UDP variant
    pub const UDP_SCHEME: &'static str = "raop+udp";

    /// Parse a target string
    ///
    /// # Errors
    /// Returns `RaopError::InvalidTarget` for an unknown scheme, a missing
    /// host or port, or a port that is not a number in 1..=65535.
    pub fn parse(target: &str) -> Result<Self, RaopError> {
        let invalid = |reason: &str| RaopError::InvalidTarget {
            target: target.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = target
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;
        let transport = match scheme.to_ascii_lowercase().as_str() {
            Self::LEGACY_SCHEME => LowerTransport::Tcp,
            Self::UDP_SCHEME => LowerTransport::Udp,
            _ => return Err(invalid("unknown scheme")),
        };

        let rest = rest.trim_end_matches('/');
        let (password, authority) = match rest.rsplit_once('@') {
            Some((password, authority)) => (Some(password.to_string()), authority),
            None => (None, rest),
        };

        let (host, port) = authority
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing port"))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        let port = port
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| invalid("invalid port"))?;

        Ok(Self {
            transport,
            password,
            host: host.to_string(),
            port,
        })
    }
}

impl FromStr for RaopTarget {
    type Err = RaopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RaopTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.transport {
            LowerTransport::Tcp => Self::LEGACY_SCHEME,
            LowerTransport::Udp => Self::UDP_SCHEME,
        };
        if self.host.contains(':') {
            write!(f, "{scheme}://[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{scheme}://{}:{}", self.host, self.port)
        }
    }
}

// Keeps the password out of logs
impl fmt::Debug for RaopTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RaopTarget")
            .field("transport", &self.transport)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}
