//! RTP sequence/timestamp state and send pacing

use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};

use crate::protocol::rtp::constants::{SAMPLE_RATE, SYNC_INTERVAL, TIMESTAMP_ORIGIN};

/// Source of monotonic and wall-clock time
pub trait ClockSource: Send + Sync + fmt::Debug {
    /// Monotonic now
    fn now(&self) -> Instant;

    /// Wall-clock now, used for NTP fields
    fn wall_time(&self) -> SystemTime;
}

/// The operating system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<(Instant, SystemTime)>,
}

impl ManualClock {
    /// Start at the current instant
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new((Instant::now(), SystemTime::now())),
        }
    }

    /// Move both clocks forward
    pub fn advance(&self, by: Duration) {
        if let Ok(mut state) = self.state.lock() {
            state.0 += by;
            state.1 += by;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> Instant {
        match self.state.lock() {
            Ok(state) => state.0,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }

    fn wall_time(&self) -> SystemTime {
        match self.state.lock() {
            Ok(state) => state.1,
            Err(poisoned) => poisoned.into_inner().1,
        }
    }
}

/// Sequence, timestamp and marker state of the outgoing stream
#[derive(Debug, Clone)]
pub struct RtpClock {
    sequence: u16,
    timestamp: u32,
    marker: bool,
    first_sync: bool,
    start: Option<Instant>,
}

impl RtpClock {
    /// Ahead-of-schedule slack below which no sleep happens
    pub const MIN_SLEEP: Duration = Duration::from_millis(1);
    /// Delays above this are treated as a clock glitch
    pub const MAX_SLEEP: Duration = Duration::from_secs(2);

    /// Create a clock at the stream origin
    #[must_use]
    pub fn new() -> Self {
        Self {
            sequence: 0,
            timestamp: TIMESTAMP_ORIGIN,
            marker: true,
            first_sync: true,
            start: None,
        }
    }

    /// Return to `(seq 0, origin timestamp, marker set)`
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Sequence of the next packet
    #[must_use]
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Timestamp of the next packet
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// Whether the next packet carries the marker bit
    #[must_use]
    pub fn marker(&self) -> bool {
        self.marker
    }

    /// Whether a sync packet must precede the next packet
    #[must_use]
    pub fn sync_due(&self) -> bool {
        self.sequence % SYNC_INTERVAL == 0
    }

    /// True exactly once per stream, for the first sync packet
    pub fn take_first_sync(&mut self) -> bool {
        std::mem::replace(&mut self.first_sync, false)
    }

    /// Step past a sent packet of `samples` sample pairs
    pub fn advance(&mut self, samples: u32) {
        self.sequence = self.sequence.wrapping_add(1);
        self.timestamp = self.timestamp.wrapping_add(samples);
        self.marker = false;
    }

    /// How long to wait before sending the next packet
    ///
    /// The packet at the origin timestamp restarts the schedule. Later
    /// packets are due `(timestamp - origin) / 44100` seconds after it; a
    /// wait over `MAX_SLEEP` restarts the schedule at `now` instead.
    pub fn pacing_delay(&mut self, now: Instant) -> Option<Duration> {
        if self.timestamp == TIMESTAMP_ORIGIN {
            self.start = Some(now);
            return None;
        }
        let start = *self.start.get_or_insert(now);

        let elapsed = now.saturating_duration_since(start);
        let samples = self.timestamp.wrapping_sub(TIMESTAMP_ORIGIN);
        let target = Duration::from_secs_f64(f64::from(samples) / f64::from(SAMPLE_RATE));

        let delay = target.checked_sub(elapsed)?;
        if delay > Self::MAX_SLEEP {
            tracing::warn!("Pacing delay {:?} exceeds {:?}, resynchronising", delay, Self::MAX_SLEEP);
            self.start = Some(now);
            return None;
        }
        (delay > Self::MIN_SLEEP).then_some(delay)
    }
}

impl Default for RtpClock {
    fn default() -> Self {
        Self::new()
    }
}
