/// Standard RTSP header names
pub mod names {
    pub const CSEQ: &str = "CSeq";
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const CONTENT_LENGTH: &str = "Content-Length";
    pub const SESSION: &str = "Session";
    pub const TRANSPORT: &str = "Transport";
    pub const USER_AGENT: &str = "User-Agent";
    pub const AUTHORIZATION: &str = "Authorization";
    pub const WWW_AUTHENTICATE: &str = "WWW-Authenticate";
    pub const RANGE: &str = "Range";
    pub const RTP_INFO: &str = "RTP-Info";
}

/// Headers only RAOP peers send
pub mod raop {
    /// Random base64 nonce; a receiver that can decrypt answers it
    pub const APPLE_CHALLENGE: &str = "Apple-Challenge";
    /// Receiver's answer to `Apple-Challenge`
    pub const APPLE_RESPONSE: &str = "Apple-Response";
    /// Receiver playout latency, in samples
    pub const AUDIO_LATENCY: &str = "Audio-Latency";
    pub const CLIENT_INSTANCE: &str = "Client-Instance";
    pub const DACP_ID: &str = "DACP-ID";
}

/// Ordered header list with case-insensitive names
///
/// Inserting a name that is already present replaces its value in place, so
/// the wire order is the order names were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        match self.position(&name) {
            Some(index) => self.entries[index] = (name, value),
            None => self.entries.push((name, value)),
        }
    }

    /// Remove a header, returning its value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|index| self.entries.remove(index).1)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|index| self.entries[index].1.as_str())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn parsed<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        self.get(name)?.trim().parse().ok()
    }

    #[must_use]
    pub fn cseq(&self) -> Option<u32> {
        self.parsed(names::CSEQ)
    }

    #[must_use]
    pub fn content_length(&self) -> Option<usize> {
        self.parsed(names::CONTENT_LENGTH)
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.get(names::CONTENT_TYPE)
    }

    /// Session id, without parameters such as `;timeout=60`
    #[must_use]
    pub fn session(&self) -> Option<&str> {
        let value = self.get(names::SESSION)?;
        value.split(';').next().map(str::trim)
    }

    /// `Audio-Latency` in samples
    #[must_use]
    pub fn audio_latency(&self) -> Option<u32> {
        self.parsed(raop::AUDIO_LATENCY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        iter.into_iter().for_each(|(k, v)| headers.insert(k, v));
        headers
    }
}
