use std::fmt::Write as _;

use super::headers::{names, raop};
use super::{Headers, ServerTransport};

/// RTSP status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const UNAUTHORIZED: StatusCode = StatusCode(401);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const METHOD_NOT_ALLOWED: StatusCode = StatusCode(405);
    /// Receiver already streaming from another client
    pub const NOT_ENOUGH_BANDWIDTH: StatusCode = StatusCode(453);
    pub const INTERNAL_ERROR: StatusCode = StatusCode(500);

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    #[must_use]
    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

/// A decoded RTSP response
#[derive(Debug, Clone)]
pub struct RtspResponse {
    /// Protocol token from the status line, normally `RTSP/1.0`
    pub version: String,
    pub status: StatusCode,
    pub reason: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl RtspResponse {
    /// `RTSP/1.0` response with no headers or body
    #[must_use]
    pub fn new(status: StatusCode, reason: &str) -> Self {
        Self {
            version: "RTSP/1.0".to_string(),
            status,
            reason: reason.to_string(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    #[must_use]
    pub fn cseq(&self) -> Option<u32> {
        self.headers.cseq()
    }

    /// Receiver-assigned session id
    #[must_use]
    pub fn session(&self) -> Option<&str> {
        self.headers.session()
    }

    /// Whether an OPTIONS answer shows the receiver can decrypt audio
    #[must_use]
    pub fn offers_encryption(&self) -> bool {
        self.headers.contains(raop::APPLE_RESPONSE) || self.headers.contains(raop::APPLE_CHALLENGE)
    }

    /// Ports from a SETUP answer; all `None` without a `Transport` header
    #[must_use]
    pub fn server_transport(&self) -> ServerTransport {
        self.headers
            .get(names::TRANSPORT)
            .map(ServerTransport::parse)
            .unwrap_or_default()
    }

    /// Encoded response, as a receiver would send it
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut head = format!("{} {} {}\r\n", self.version, self.status.0, self.reason);
        for (name, value) in self.headers.iter() {
            let _ = write!(head, "{name}: {value}\r\n");
        }
        if !self.body.is_empty() {
            let _ = write!(head, "{}: {}\r\n", names::CONTENT_LENGTH, self.body.len());
        }
        head.push_str("\r\n");

        let mut out = head.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}
