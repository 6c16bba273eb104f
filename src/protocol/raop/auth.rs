//! Digest authentication (RFC 2617, MD5, no `qop`) for password-protected receivers
//!
//! ```text
//! HA1      = MD5(username:realm:password)
//! HA2      = MD5(method:uri)
//! response = MD5(HA1:nonce:HA2)
//! ```

use md5::{Digest, Md5};

/// Username every RAOP sender presents
pub const DIGEST_USERNAME: &str = "iTunes";

/// Realm, nonce and password for one control connection
///
/// Realm and nonce stay empty until a `WWW-Authenticate` challenge has been
/// parsed; only then is an `Authorization` header produced.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    realm: String,
    nonce: String,
    password: Option<String>,
}

impl AuthContext {
    /// Create a context for an optional receiver password
    #[must_use]
    pub fn new(password: Option<String>) -> Self {
        Self {
            realm: String::new(),
            nonce: String::new(),
            password,
        }
    }

    /// Take realm and nonce from a `WWW-Authenticate` header value
    ///
    /// Returns `false` when the header carries no nonce.
    pub fn apply_challenge(&mut self, www_authenticate: &str) -> bool {
        let Some(nonce) = extract_field(www_authenticate, "nonce") else {
            return false;
        };
        self.nonce = nonce.to_string();
        self.realm = extract_field(www_authenticate, "realm")
            .unwrap_or_default()
            .to_string();
        true
    }

    /// Whether a challenge has been received
    #[must_use]
    pub fn has_challenge(&self) -> bool {
        !self.nonce.is_empty()
    }

    /// Realm from the last challenge
    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Nonce from the last challenge
    #[must_use]
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Forget realm and nonce (the password is kept)
    pub fn clear(&mut self) {
        self.realm.clear();
        self.nonce.clear();
    }

    /// `Authorization` header value for a request, once challenged
    #[must_use]
    pub fn authorization(&self, method: &str, uri: &str) -> Option<String> {
        if !self.has_challenge() {
            return None;
        }
        let password = self.password.as_deref().unwrap_or_default();
        let response = digest_response(
            DIGEST_USERNAME,
            &self.realm,
            password,
            method,
            uri,
            &self.nonce,
        );
        Some(format!(
            "Digest username=\"{DIGEST_USERNAME}\", realm=\"{}\", nonce=\"{}\", uri=\"{uri}\", response=\"{response}\"",
            self.realm, self.nonce
        ))
    }
}

/// Compute the hex digest `response` field
#[must_use]
pub fn digest_response(
    username: &str,
    realm: &str,
    password: &str,
    method: &str,
    uri: &str,
    nonce: &str,
) -> String {
    let ha1 = md5_hex(&format!("{username}:{realm}:{password}"));
    let ha2 = md5_hex(&format!("{method}:{uri}"));
    md5_hex(&format!("{ha1}:{nonce}:{ha2}"))
}

/// Value between `field="` and the next `"`
pub(crate) fn extract_field<'a>(header: &'a str, field: &str) -> Option<&'a str> {
    let pattern = format!("{field}=\"");
    let start = header.find(&pattern)? + pattern.len();
    let rest = &header[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

fn md5_hex(input: &str) -> String {
    let digest = Md5::digest(input.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
