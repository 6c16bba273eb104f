use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

use super::{Headers, RtspRequest, RtspResponse, StatusCode};

const HEAD_END: &[u8] = b"\r\n\r\n";

/// Errors while reading receiver responses
#[derive(Debug, Error)]
pub enum RtspCodecError {
    #[error("invalid status line: {0}")]
    InvalidStatusLine(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Incremental RTSP response parser
///
/// Bytes go in through `feed()`; `decode()` yields one response at a time.
/// The status line and headers are parsed together once the blank line
/// arrives, then the body announced by `Content-Length` is taken in full.
#[derive(Debug)]
pub struct RtspCodec {
    buffer: BytesMut,
    max_size: usize,
    /// Parsed head still waiting for this many body bytes
    pending: Option<(RtspResponse, usize)>,
}

impl RtspCodec {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            max_size: 64 * 1024,
            pending: None,
        }
    }

    /// Limit on buffered, undecoded bytes
    #[must_use]
    pub fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Append received bytes
    ///
    /// # Errors
    /// `ResponseTooLarge` when the buffer would grow past the limit.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), RtspCodecError> {
        let size = self.buffer.len() + bytes.len();
        if size > self.max_size {
            return Err(RtspCodecError::ResponseTooLarge { size });
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Next complete response, or `Ok(None)` when more bytes are needed
    ///
    /// # Errors
    /// `InvalidStatusLine` or `InvalidHeader` for a malformed head.
    pub fn decode(&mut self) -> Result<Option<RtspResponse>, RtspCodecError> {
        if self.pending.is_none() {
            // Blank lines between responses carry nothing
            while self.buffer.starts_with(b"\r\n") {
                self.buffer.advance(2);
            }
            let Some(end) = find(&self.buffer, HEAD_END) else {
                return Ok(None);
            };
            let head = self.buffer.split_to(end + HEAD_END.len());
            let response = parse_head(&String::from_utf8_lossy(&head[..end]))?;
            let content_length = response.headers.content_length().unwrap_or(0);
            self.pending = Some((response, content_length));
        }

        match self.pending.take() {
            Some((mut response, length)) if self.buffer.len() >= length => {
                response.body = self.buffer.split_to(length).to_vec();
                Ok(Some(response))
            }
            waiting => {
                self.pending = waiting;
                Ok(None)
            }
        }
    }

    /// Drop buffered bytes and any half-read response
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.pending = None;
    }

    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for RtspCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Status line plus header lines, without the terminating blank line
fn parse_head(head: &str) -> Result<RtspResponse, RtspCodecError> {
    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap_or_default();
    let invalid = || RtspCodecError::InvalidStatusLine(status_line.to_string());

    // RTSP/1.0 200 OK
    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().filter(|v| v.starts_with("RTSP/")).ok_or_else(invalid)?;
    let status = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(invalid)?;

    let mut response = RtspResponse::new(StatusCode(status), parts.next().unwrap_or("").trim());
    response.version = version.to_string();

    for line in lines.filter(|l| !l.is_empty()) {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| RtspCodecError::InvalidHeader(line.to_string()))?;
        response.headers.insert(name.trim(), value.trim());
    }
    Ok(response)
}

/// Framed transport support: responses in, requests out
impl Decoder for RtspCodec {
    type Item = RtspResponse;
    type Error = RtspCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.is_empty() {
            let bytes = src.split();
            self.feed(&bytes)?;
        }
        RtspCodec::decode(self)
    }
}

impl Encoder<RtspRequest> for RtspCodec {
    type Error = RtspCodecError;

    fn encode(&mut self, item: RtspRequest, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode_into(dst);
        Ok(())
    }
}
