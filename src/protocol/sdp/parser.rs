use thiserror::Error;

/// Why an ANNOUNCE body was rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SdpParseError {
    /// First line is not `v=0`
    #[error("missing or unsupported version line")]
    InvalidVersion,
    /// Origin line has fewer than six fields
    #[error("invalid origin line: {0}")]
    InvalidOrigin(String),
    /// No `m=audio` line
    #[error("no audio media section")]
    MissingAudio,
}

/// What a receiver needs from an ANNOUNCE body
#[derive(Debug, Clone, Default)]
pub struct AnnounceSdp {
    /// Session id from the origin line
    pub session_id: String,
    /// Sender address from the origin line
    pub origin_address: String,
    /// Receiver address from the connection line
    pub connection_address: Option<String>,
    /// Attributes of the audio section, in order
    pub attributes: Vec<(String, Option<String>)>,
}

impl AnnounceSdp {
    /// Parse an ANNOUNCE body
    ///
    /// Line types other than `v`, `o`, `c`, `m` and `a` are skipped, as are
    /// attributes outside the audio section.
    ///
    /// # Errors
    /// `InvalidVersion` unless the body starts with `v=0`, `InvalidOrigin`
    /// for a short origin line and `MissingAudio` without an `m=audio` line.
    pub fn parse(input: &str) -> Result<Self, SdpParseError> {
        let mut lines = input.lines().map(str::trim).filter(|l| !l.is_empty());
        if lines.next() != Some("v=0") {
            return Err(SdpParseError::InvalidVersion);
        }

        let mut sdp = AnnounceSdp::default();
        let mut in_audio = false;
        let mut saw_audio = false;

        for line in lines {
            let Some((kind, value)) = line.split_once('=') else {
                continue;
            };
            match kind {
                "o" => {
                    let fields: Vec<&str> = value.split_whitespace().collect();
                    let [_, session_id, _, _, _, address, ..] = fields.as_slice() else {
                        return Err(SdpParseError::InvalidOrigin(value.to_string()));
                    };
                    sdp.session_id = (*session_id).to_string();
                    sdp.origin_address = (*address).to_string();
                }
                "c" => {
                    sdp.connection_address = value.split_whitespace().nth(2).map(str::to_string);
                }
                "m" => {
                    in_audio = value.starts_with("audio ");
                    saw_audio |= in_audio;
                }
                "a" if in_audio => {
                    let attribute = match value.split_once(':') {
                        Some((name, v)) => (name.to_string(), Some(v.to_string())),
                        None => (value.to_string(), None),
                    };
                    sdp.attributes.push(attribute);
                }
                _ => {}
            }
        }

        if saw_audio {
            Ok(sdp)
        } else {
            Err(SdpParseError::MissingAudio)
        }
    }

    /// Value of an audio attribute
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// RSA-wrapped AES key, base64
    #[must_use]
    pub fn rsaaeskey(&self) -> Option<&str> {
        self.attribute("rsaaeskey")
    }

    /// AES IV, base64
    #[must_use]
    pub fn aesiv(&self) -> Option<&str> {
        self.attribute("aesiv")
    }

    /// Whether the stream will arrive encrypted
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.rsaaeskey().is_some() && self.aesiv().is_some()
    }

    /// Sample pairs per frame, the first `fmtp` parameter after the payload type
    #[must_use]
    pub fn frames_per_packet(&self) -> Option<usize> {
        self.attribute("fmtp")?
            .split_whitespace()
            .nth(1)?
            .parse()
            .ok()
    }
}
