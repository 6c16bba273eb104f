//! RTSP Transport header handling
//!
//! Request format:
//! `RTP/AVP/UDP;unicast;interleaved=0-1;mode=record;control_port=6001;timing_port=6002`

/// Lower transport carrying the audio data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowerTransport {
    /// Audio over the legacy length-prefixed TCP channel
    Tcp,
    /// Audio over RTP/UDP with separate control and timing sockets
    Udp,
}

impl LowerTransport {
    /// Transport header value for a SETUP request
    ///
    /// UDP setups advertise the local control and timing ports.
    #[must_use]
    pub fn request_header(self, control_port: u16, timing_port: u16) -> String {
        match self {
            LowerTransport::Tcp => "RTP/AVP/TCP;unicast;interleaved=0-1;mode=record".to_string(),
            LowerTransport::Udp => format!(
                "RTP/AVP/UDP;unicast;interleaved=0-1;mode=record;control_port={control_port};timing_port={timing_port}"
            ),
        }
    }
}

/// Ports the receiver reports in a SETUP response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerTransport {
    /// Receiver audio port
    pub server_port: Option<u16>,
    /// Receiver control (sync) port
    pub control_port: Option<u16>,
    /// Receiver timing port
    pub timing_port: Option<u16>,
}

impl ServerTransport {
    /// Parse a response Transport header value
    ///
    /// Unknown or malformed parameters are ignored.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let mut transport = ServerTransport::default();

        for part in value.split(';').map(str::trim) {
            let Some((key, val)) = part.split_once('=') else {
                continue;
            };
            // server_port may be a range ("6000-6001"); the first port is the data port
            let port = val.split('-').next().and_then(|p| p.trim().parse().ok());
            match key {
                "server_port" => transport.server_port = port,
                "control_port" => transport.control_port = port,
                "timing_port" => transport.timing_port = port,
                _ => {}
            }
        }

        transport
    }
}
