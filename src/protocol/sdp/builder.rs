use std::fmt::Write as _;
use std::net::IpAddr;

use super::{FMTP_TAIL, PAYLOAD_TYPE};

/// Inputs for the ANNOUNCE session description
#[derive(Debug, Clone)]
pub struct AnnounceParams<'a> {
    /// Client session id (origin and request URI)
    pub session_id: &'a str,
    /// Local address of the control connection
    pub local: IpAddr,
    /// Receiver address
    pub remote: IpAddr,
    /// Sample pairs per frame (4096 legacy, 352 RTP)
    pub frames_per_packet: usize,
    /// Base64 `rsaaeskey` and `aesiv`, when encrypting
    pub encryption: Option<(&'a str, &'a str)>,
}

fn addr_type(addr: IpAddr) -> &'static str {
    match addr {
        IpAddr::V4(_) => "IP4",
        IpAddr::V6(_) => "IP6",
    }
}

/// Render the ANNOUNCE body
///
/// Lines end in CRLF and attributes appear in a fixed order: `rtpmap`,
/// `fmtp`, then `rsaaeskey` and `aesiv`.
#[must_use]
pub fn create_raop_announce_sdp(params: &AnnounceParams<'_>) -> String {
    let mut sdp = String::with_capacity(256);
    // Writing into a String cannot fail
    let _ = write!(
        sdp,
        "v=0\r\n\
         o=iTunes {id} 0 IN {local_type} {local}\r\n\
         s=iTunes\r\n\
         c=IN {remote_type} {remote}\r\n\
         t=0 0\r\n\
         m=audio 0 RTP/AVP {pt}\r\n\
         a=rtpmap:{pt} AppleLossless\r\n\
         a=fmtp:{pt} {frames} {FMTP_TAIL}\r\n",
        id = params.session_id,
        local_type = addr_type(params.local),
        local = params.local,
        remote_type = addr_type(params.remote),
        remote = params.remote,
        pt = PAYLOAD_TYPE,
        frames = params.frames_per_packet,
    );

    if let Some((rsaaeskey, aesiv)) = params.encryption {
        let _ = write!(sdp, "a=rsaaeskey:{rsaaeskey}\r\na=aesiv:{aesiv}\r\n");
    }
    sdp
}
