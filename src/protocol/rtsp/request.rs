use bytes::{BufMut, BytesMut};

use super::{Headers, Method, headers::names, headers::raop};

/// Outgoing RTSP request
///
/// `Content-Length` is never stored in `headers`; it is derived from the
/// body when the request is encoded.
#[derive(Debug, Clone)]
pub struct RtspRequest {
    pub method: Method,
    /// `*` for OPTIONS, `rtsp://<local ip>/<client session id>` otherwise
    pub uri: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl RtspRequest {
    /// Request with no headers and no body
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn builder(method: Method, uri: impl Into<String>) -> RtspRequestBuilder {
        RtspRequestBuilder {
            request: Self::new(method, uri),
            content_type: None,
        }
    }

    /// Wire size of the encoded request
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let start_line = self.method.as_str().len() + self.uri.len() + " RTSP/1.0\r\n".len() + 1;
        let headers: usize = self
            .headers
            .iter()
            .map(|(name, value)| name.len() + value.len() + 4)
            .sum();
        let length = if self.body.is_empty() {
            0
        } else {
            names::CONTENT_LENGTH.len() + 4 + self.body.len().to_string().len()
        };
        start_line + headers + length + 2 + self.body.len()
    }

    /// Append the encoded request to `dst`
    pub fn encode_into(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());

        dst.put_slice(self.method.as_str().as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(self.uri.as_bytes());
        dst.put_slice(b" RTSP/1.0\r\n");

        for (name, value) in self.headers.iter() {
            put_header(dst, name, value);
        }
        if !self.body.is_empty() {
            put_header(dst, names::CONTENT_LENGTH, &self.body.len().to_string());
        }

        dst.put_slice(b"\r\n");
        dst.put_slice(&self.body);
    }

    /// Encoded request bytes
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut dst = BytesMut::new();
        self.encode_into(&mut dst);
        dst.to_vec()
    }
}

fn put_header(dst: &mut BytesMut, name: &str, value: &str) {
    dst.put_slice(name.as_bytes());
    dst.put_slice(b": ");
    dst.put_slice(value.as_bytes());
    dst.put_slice(b"\r\n");
}

/// Builder for RTSP requests
///
/// Headers keep insertion order; `Content-Type` goes last, right before the
/// derived `Content-Length`.
#[derive(Debug)]
pub struct RtspRequestBuilder {
    request: RtspRequest,
    content_type: Option<String>,
}

impl RtspRequestBuilder {
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn cseq(self, seq: u32) -> Self {
        self.header(names::CSEQ, seq.to_string())
    }

    #[must_use]
    pub fn session(self, session_id: &str) -> Self {
        self.header(names::SESSION, session_id)
    }

    #[must_use]
    pub fn user_agent(self, agent: &str) -> Self {
        self.header(names::USER_AGENT, agent)
    }

    /// `Client-Instance` and `DACP-ID`, which always carry the same value
    #[must_use]
    pub fn client_instance(self, instance: &str) -> Self {
        self.header(raop::CLIENT_INSTANCE, instance)
            .header(raop::DACP_ID, instance)
    }

    #[must_use]
    pub fn content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.request.body = body;
        self
    }

    #[must_use]
    pub fn build(mut self) -> RtspRequest {
        if let Some(content_type) = self.content_type.take() {
            self.request.headers.insert(names::CONTENT_TYPE, content_type);
        }
        self.request
    }
}
