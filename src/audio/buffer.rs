//! Fixed-capacity accumulation buffer
//!
//! PCM is collected until a whole frame's worth is present, then the frame
//! is sent and the buffer starts over.

/// Accumulates PCM bytes into frames of exactly `capacity` bytes
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    data: Vec<u8>,
    capacity: usize,
}

impl FrameBuffer {
    /// Create an empty buffer holding `capacity` bytes
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Buffer capacity in bytes
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently held
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if nothing is buffered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if a whole frame is buffered
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    /// Copy as much of `input` as fits; returns the number of bytes taken
    pub fn fill(&mut self, input: &[u8]) -> usize {
        let take = input.len().min(self.capacity - self.data.len());
        self.data.extend_from_slice(&input[..take]);
        take
    }

    /// Top up the remainder with silence
    pub fn pad_with_silence(&mut self) {
        self.data.resize(self.capacity, 0);
    }

    /// Buffered bytes
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Drop buffered bytes
    pub fn clear(&mut self) {
        self.data.clear();
    }
}
