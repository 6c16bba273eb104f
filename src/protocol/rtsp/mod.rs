//! Sans-IO RTSP protocol implementation for the RAOP control channel

pub mod codec;
pub mod headers;
pub mod request;
pub mod response;
pub mod session;
pub mod transport;


pub use codec::{RtspCodec, RtspCodecError};
pub use headers::Headers;
pub use request::{RtspRequest, RtspRequestBuilder};
pub use response::{RtspResponse, StatusCode};
pub use session::{ResponseAction, RtspSession};
pub use transport::{LowerTransport, ServerTransport};

/// Requests a RAOP sender issues on the control connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// First request; carries `Apple-Challenge`
    Options,
    /// Session description (SDP body)
    Announce,
    /// Port negotiation
    Setup,
    /// Start of playback, with `RTP-Info`
    Record,
    /// Drop queued audio at the receiver
    Flush,
    Teardown,
    /// Volume and progress updates
    SetParameter,
    /// Keep-alive
    GetParameter,
}

const METHOD_NAMES: [(Method, &str); 8] = [
    (Method::Options, "OPTIONS"),
    (Method::Announce, "ANNOUNCE"),
    (Method::Setup, "SETUP"),
    (Method::Record, "RECORD"),
    (Method::Flush, "FLUSH"),
    (Method::Teardown, "TEARDOWN"),
    (Method::SetParameter, "SET_PARAMETER"),
    (Method::GetParameter, "GET_PARAMETER"),
];

impl Method {
    /// Name as it appears on the request line
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        METHOD_NAMES
            .iter()
            .find(|(method, _)| method == self)
            .map_or("", |(_, name)| *name)
    }

    /// Case-insensitive lookup of a request-line name
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        METHOD_NAMES
            .iter()
            .find(|(_, known)| known.eq_ignore_ascii_case(name))
            .map(|(method, _)| *method)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
