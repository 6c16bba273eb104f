//! Linear volume to receiver attenuation

/// Attenuation the receiver treats as mute
pub const MUTE_DB: f32 = -144.0;

/// Attenuation at the lowest audible setting
pub const MIN_DB: f32 = -30.0;

/// Content type of `SET_PARAMETER` volume bodies
pub const VOLUME_CONTENT_TYPE: &str = "text/parameters";

/// Requested volume level (0.0 = silent, 1.0 = max)
///
/// The value is kept as requested; out-of-range levels saturate only when
/// converted to dB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volume(f32);

impl Volume {
    /// Silent
    pub const MIN: Self = Self(0.0);
    /// Full scale
    pub const MAX: Self = Self(1.0);

    /// Create a volume level
    #[must_use]
    pub fn new(level: f32) -> Self {
        Self(level)
    }

    /// Get as f32 as requested
    #[must_use]
    pub fn as_f32(&self) -> f32 {
        self.0
    }

    /// Convert to the receiver's dB scale
    ///
    /// `0.0` and below mute, `1.0` and above are 0 dB, everything between
    /// maps linearly onto -30..0 dB.
    #[must_use]
    pub fn to_db(&self) -> f32 {
        if self.0 <= 0.0 || self.0.is_nan() {
            MUTE_DB
        } else if self.0 >= 1.0 {
            0.0
        } else {
            MIN_DB + self.0 * -MIN_DB
        }
    }

    /// Body of the `SET_PARAMETER` request carrying this volume
    #[must_use]
    pub fn parameter_body(&self) -> String {
        format!("volume: {:.6}\r\n", self.to_db())
    }

    /// Check if this level mutes the receiver
    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.to_db() <= MUTE_DB
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::MAX
    }
}

impl From<f32> for Volume {
    fn from(v: f32) -> Self {
        Self::new(v)
    }
}
