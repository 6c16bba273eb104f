use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD_NO_PAD;

use crate::protocol::raop::DEFAULT_AES_KEY;

/// Configuration for RAOP client behavior
#[derive(Debug, Clone)]
pub struct RaopConfig {
    /// Timeout for opening the control and legacy audio connections (default: 5 seconds)
    pub connect_timeout: Duration,

    /// Timeout for each control or audio read/write (default: 5 seconds)
    pub io_timeout: Duration,

    /// First local UDP port tried for the RTP socket set (default: 6000)
    pub base_port: u16,

    /// Encrypt audio when the receiver offers it (default: true)
    pub encryption: bool,

    /// Value of the SDP `rsaaeskey` attribute sent when encrypting
    pub rsa_aes_key: String,

    /// `User-Agent` header value
    pub user_agent: String,

    /// Timing responder gives up after this long without a request (default: 30 seconds)
    pub timing_receive_timeout: Duration,

    /// How long shutdown waits for the timing responder (default: 3 seconds)
    pub timing_shutdown_timeout: Duration,
}

impl Default for RaopConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            io_timeout: Duration::from_secs(5),
            base_port: 6000,
            encryption: true,
            rsa_aes_key: STANDARD_NO_PAD.encode(DEFAULT_AES_KEY),
            user_agent: "iTunes/7.6.2 (Windows; N;)".to_string(),
            timing_receive_timeout: Duration::from_secs(30),
            timing_shutdown_timeout: Duration::from_secs(3),
        }
    }
}

impl RaopConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> RaopConfigBuilder {
        RaopConfigBuilder::new()
    }
}

/// Builder for `RaopConfig`
#[derive(Debug, Clone, Default)]
pub struct RaopConfigBuilder {
    config: RaopConfig,
}

impl RaopConfigBuilder {
    /// Create a new builder with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set connect timeout
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set read/write timeout
    #[must_use]
    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.config.io_timeout = timeout;
        self
    }

    /// Set the first local UDP port to try
    #[must_use]
    pub fn base_port(mut self, port: u16) -> Self {
        self.config.base_port = port;
        self
    }

    /// Enable or disable audio encryption
    #[must_use]
    pub fn encryption(mut self, enable: bool) -> Self {
        self.config.encryption = enable;
        self
    }

    /// Set the SDP `rsaaeskey` attribute value
    #[must_use]
    pub fn rsa_aes_key(mut self, key: impl Into<String>) -> Self {
        self.config.rsa_aes_key = key.into();
        self
    }

    /// Set the `User-Agent` header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Set timing responder receive timeout
    #[must_use]
    pub fn timing_receive_timeout(mut self, timeout: Duration) -> Self {
        self.config.timing_receive_timeout = timeout;
        self
    }

    /// Set timing responder shutdown wait
    #[must_use]
    pub fn timing_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.timing_shutdown_timeout = timeout;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> RaopConfig {
        self.config
    }
}
