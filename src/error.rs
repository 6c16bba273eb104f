use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while streaming to a RAOP receiver
#[derive(Debug, Error)]
pub enum RaopError {
    // ===== Target Errors =====
    /// Target string could not be parsed
    #[error("invalid target {target}: {reason}")]
    InvalidTarget {
        /// The rejected target string
        target: String,
        /// Why it was rejected
        reason: String,
    },

    // ===== Connection Errors =====
    /// Receiver host name did not resolve
    #[error("failed to resolve {host}")]
    NameResolution {
        /// Host that failed to resolve
        host: String,
        /// The underlying source of the error
        #[source]
        source: Option<io::Error>,
    },

    /// Control connection was not established in time
    #[error("connection timeout after {duration:?}")]
    ConnectTimeout {
        /// The duration of the timeout
        duration: Duration,
    },

    /// Control connection was refused or failed
    #[error("connection to {address} failed")]
    ConnectFailed {
        /// Address that was dialed
        address: String,
        /// The underlying source of the error
        #[source]
        source: io::Error,
    },

    /// Receiver closed the control connection
    #[error("receiver disconnected")]
    Disconnected,

    /// Audio channel was reset by the receiver
    #[error("connection reset by receiver")]
    ConnectionReset,

    // ===== Protocol Errors =====
    /// Unexpected status code or missing header
    #[error("protocol error: {message}")]
    Protocol {
        /// Description of the error
        message: String,
        /// RTSP status code if available
        status_code: Option<u16>,
    },

    /// Receiver rejected the password twice
    #[error("authentication denied")]
    AuthenticationDenied,

    /// Receiver is streaming from another client (453)
    #[error("device busy")]
    DeviceBusy,

    // ===== Media Errors =====
    /// Audio format outside the supported 44100 Hz / stereo / s16 profile
    #[error("unsupported audio format: {format}")]
    UnsupportedFormat {
        /// The unsupported format
        format: String,
    },

    // ===== I/O Errors =====
    /// A read or write did not finish in time
    #[error("{operation} timed out after {duration:?}")]
    IoTimeout {
        /// What was being attempted
        operation: &'static str,
        /// The duration of the timeout
        duration: Duration,
    },

    /// Network I/O error
    #[error("network error: {0}")]
    Network(#[from] io::Error),
}

impl RaopError {
    /// Build a protocol error without a status code
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            status_code: None,
        }
    }

    /// Classify an I/O error raised on an established stream
    pub(crate) fn from_stream_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::ConnectionReset,
            _ => Self::Network(err),
        }
    }

    /// Check if this error is recoverable by retrying
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout { .. }
                | Self::IoTimeout { .. }
                | Self::Network(_)
                | Self::DeviceBusy
                | Self::ConnectionReset
                | Self::Disconnected
        )
    }

    /// Check if this error means the receiver dropped the stream
    #[must_use]
    pub fn is_connection_reset(&self) -> bool {
        matches!(self, Self::ConnectionReset | Self::Disconnected)
    }
}

/// Result type alias for RAOP operations
pub type Result<T> = std::result::Result<T, RaopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RaopError::InvalidTarget {
            target: "http://x".to_string(),
            reason: "unknown scheme".to_string(),
        };
        assert_eq!(err.to_string(), "invalid target http://x: unknown scheme");
        assert_eq!(RaopError::DeviceBusy.to_string(), "device busy");
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(RaopError::DeviceBusy.is_recoverable());
        assert!(RaopError::ConnectionReset.is_recoverable());
        assert!(!RaopError::AuthenticationDenied.is_recoverable());
        assert!(
            !RaopError::UnsupportedFormat {
                format: "48000 Hz".to_string()
            }
            .is_recoverable()
        );
    }

    #[test]
    fn test_stream_io_classification() {
        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert!(RaopError::from_stream_io(reset).is_connection_reset());

        let aborted = io::Error::new(io::ErrorKind::ConnectionAborted, "aborted");
        assert!(RaopError::from_stream_io(aborted).is_connection_reset());

        let other = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(
            RaopError::from_stream_io(other),
            RaopError::Network(_)
        ));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err: RaopError = io_err.into();

        assert!(matches!(err, RaopError::Network(_)));
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RaopError>();
    }
}
