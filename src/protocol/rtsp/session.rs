use std::net::IpAddr;

use super::{Method, RtspRequest, RtspResponse, StatusCode, headers::names};
use crate::error::RaopError;
use crate::protocol::raop::AuthContext;

/// What the caller should do after a response was processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseAction {
    /// Response accepted
    Done,
    /// Challenge stored, re-issue the same request with credentials
    RetryWithAuth,
}

/// RTSP session manager (sans-IO)
///
/// Owns `CSeq` numbering, the receiver-assigned session id, the fixed
/// client identifiers and the Digest context. Produces requests and
/// interprets responses; the connection layer does the I/O.
#[derive(Debug)]
pub struct RtspSession {
    /// Next `CSeq` to send
    cseq: u32,
    /// Session ID (from server)
    session_id: Option<String>,
    /// Our session ID, used in the request URI and SDP origin
    client_session_id: String,
    /// Value of `Client-Instance` and `DACP-ID`
    client_instance: String,
    /// Request URI for everything but OPTIONS
    uri: String,
    /// User agent string
    user_agent: String,
    auth: AuthContext,
}

impl RtspSession {
    /// Create a new session
    #[must_use]
    pub fn new(
        client_session_id: impl Into<String>,
        client_instance: impl Into<String>,
        user_agent: impl Into<String>,
        password: Option<String>,
    ) -> Self {
        let client_session_id = client_session_id.into();
        Self {
            cseq: 1,
            session_id: None,
            uri: format!("rtsp://0.0.0.0/{client_session_id}"),
            client_session_id,
            client_instance: client_instance.into(),
            user_agent: user_agent.into(),
            auth: AuthContext::new(password),
        }
    }

    /// Point the request URI at the local address of the control connection
    pub fn set_local_address(&mut self, local: IpAddr) {
        self.uri = format!("rtsp://{local}/{}", self.client_session_id);
    }

    /// Replace the `Client-Instance`/`DACP-ID` value
    pub fn set_client_instance(&mut self, client_instance: impl Into<String>) {
        self.client_instance = client_instance.into();
    }

    /// Value sent as `Client-Instance` and `DACP-ID`
    #[must_use]
    pub fn client_instance(&self) -> &str {
        &self.client_instance
    }

    /// Request URI for session-scoped methods
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Our session ID
    #[must_use]
    pub fn client_session_id(&self) -> &str {
        &self.client_session_id
    }

    /// Get server session ID (if established)
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// `CSeq` the next request will carry
    #[must_use]
    pub fn cseq(&self) -> u32 {
        self.cseq
    }

    /// Forget everything tied to the current control connection
    pub fn reset(&mut self) {
        self.cseq = 1;
        self.session_id = None;
        self.auth.clear();
    }

    /// Forget the receiver's session id after TEARDOWN
    ///
    /// `CSeq` numbering and Digest credentials carry on, since the control
    /// connection is still the same.
    pub fn end_stream(&mut self) {
        self.session_id = None;
    }

    fn next_cseq(&mut self) -> u32 {
        let cseq = self.cseq;
        self.cseq = self.cseq.wrapping_add(1);
        cseq
    }

    /// Build a request with the common headers
    ///
    /// `body` is `(content_type, bytes)`.
    pub fn request(
        &mut self,
        method: Method,
        extra_headers: &[(&str, String)],
        body: Option<(&str, Vec<u8>)>,
    ) -> RtspRequest {
        let uri = match method {
            Method::Options => "*".to_string(),
            _ => self.uri.clone(),
        };

        let mut builder = RtspRequest::builder(method, uri.as_str()).cseq(self.next_cseq());
        if let Some(session) = &self.session_id {
            builder = builder.session(session);
        }
        builder = builder
            .user_agent(&self.user_agent)
            .client_instance(&self.client_instance);
        if let Some(authorization) = self.auth.authorization(method.as_str(), &uri) {
            builder = builder.header(names::AUTHORIZATION, authorization);
        }
        for (name, value) in extra_headers {
            builder = builder.header(*name, value.as_str());
        }
        if let Some((content_type, bytes)) = body {
            builder = builder.content_type(content_type).body(bytes);
        }

        builder.build()
    }

    /// Interpret a response to `method`
    ///
    /// A first 401 with a usable challenge asks for one retry; a 401 on the
    /// retry is final.
    ///
    /// # Errors
    /// `AuthenticationDenied` on a repeated 401, `DeviceBusy` on 453 and
    /// `Protocol` on any other non-2xx status.
    pub fn process_response(
        &mut self,
        method: Method,
        response: &RtspResponse,
        retried: bool,
    ) -> Result<ResponseAction, RaopError> {
        match response.status {
            StatusCode::UNAUTHORIZED => {
                if retried {
                    return Err(RaopError::AuthenticationDenied);
                }
                let challenge = response
                    .headers
                    .get(names::WWW_AUTHENTICATE)
                    .unwrap_or_default();
                if self.auth.apply_challenge(challenge) {
                    Ok(ResponseAction::RetryWithAuth)
                } else {
                    Err(RaopError::AuthenticationDenied)
                }
            }
            StatusCode::NOT_ENOUGH_BANDWIDTH => Err(RaopError::DeviceBusy),
            status if !status.is_success() => Err(RaopError::Protocol {
                message: format!("{method} failed: {} {}", status.as_u16(), response.reason),
                status_code: Some(status.as_u16()),
            }),
            _ => {
                if let Some(session) = response.session() {
                    self.session_id = Some(session.to_string());
                }
                Ok(ResponseAction::Done)
            }
        }
    }
}
