//! Session lifecycle flags and control-channel statistics

use std::fmt;
use std::time::Instant;

/// Observable session state
///
/// Derived from the lifecycle flags; `paused` is tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No control connection
    Disconnected,
    /// Control connection open, OPTIONS done
    Connected,
    /// ANNOUNCE accepted
    Announced,
    /// SETUP accepted, receiver ports known
    SetUp,
    /// RECORD accepted, audio flowing
    Recording,
}

impl SessionState {
    /// Check if a control connection exists
    #[must_use]
    pub fn is_connected(self) -> bool {
        !matches!(self, SessionState::Disconnected)
    }

    /// Check if audio can be sent
    #[must_use]
    pub fn is_recording(self) -> bool {
        matches!(self, SessionState::Recording)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connected => "connected",
            SessionState::Announced => "announced",
            SessionState::SetUp => "set up",
            SessionState::Recording => "recording",
        };
        f.write_str(name)
    }
}

/// Lifecycle flags of one RAOP session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionFlags {
    /// Control connection open and OPTIONS exchanged
    pub connected: bool,
    /// ANNOUNCE accepted
    pub announced: bool,
    /// SETUP accepted
    pub setup: bool,
    /// RECORD accepted
    pub recording: bool,
    /// Audio is being dropped until resume
    pub paused: bool,
}

impl SessionFlags {
    /// Most advanced state reached
    #[must_use]
    pub fn state(&self) -> SessionState {
        if !self.connected {
            SessionState::Disconnected
        } else if self.recording {
            SessionState::Recording
        } else if self.setup {
            SessionState::SetUp
        } else if self.announced {
            SessionState::Announced
        } else {
            SessionState::Connected
        }
    }

    /// Forget the stream but keep the control connection
    pub fn end_stream(&mut self) {
        self.announced = false;
        self.setup = false;
        self.recording = false;
    }

    /// Forget everything
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Control-channel statistics
#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    /// Time the control connection was established
    pub connected_at: Option<Instant>,
    /// Requests written
    pub requests_sent: u64,
    /// Bytes written
    pub bytes_sent: u64,
    /// Responses decoded
    pub responses_received: u64,
}

impl ConnectionStats {
    /// Get connection uptime
    #[must_use]
    pub fn uptime(&self) -> Option<std::time::Duration> {
        self.connected_at.map(|t| t.elapsed())
    }

    /// Record one request of `bytes` bytes
    pub fn record_sent(&mut self, bytes: usize) {
        self.requests_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Record one decoded response
    pub fn record_received(&mut self) {
        self.responses_received += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_follows_flags() {
        let mut flags = SessionFlags::default();
        assert_eq!(flags.state(), SessionState::Disconnected);

        flags.connected = true;
        assert_eq!(flags.state(), SessionState::Connected);
        flags.announced = true;
        assert_eq!(flags.state(), SessionState::Announced);
        flags.setup = true;
        assert_eq!(flags.state(), SessionState::SetUp);
        flags.recording = true;
        flags.paused = true;
        assert_eq!(flags.state(), SessionState::Recording);
        assert!(flags.state().is_recording());

        flags.end_stream();
        assert_eq!(flags.state(), SessionState::Connected);
        assert!(flags.paused);

        flags.clear();
        assert_eq!(flags, SessionFlags::default());
    }

    #[test]
    fn test_stats_accumulate() {
        let mut stats = ConnectionStats::default();
        stats.record_sent(100);
        stats.record_sent(20);
        stats.record_received();
        assert_eq!(stats.requests_sent, 2);
        assert_eq!(stats.bytes_sent, 120);
        assert_eq!(stats.responses_received, 1);
        assert!(stats.uptime().is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(SessionState::SetUp.to_string(), "set up");
        assert!(!SessionState::Disconnected.is_connected());
    }
}
