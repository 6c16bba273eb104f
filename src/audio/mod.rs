//! Audio handling: input format checks, frame accumulation, the
//! uncompressed Apple Lossless envelope and per-frame encryption

pub mod buffer;
pub mod format;
pub mod framer;
pub mod raop_encoder;


pub use buffer::FrameBuffer;
pub use format::{AudioFormat, SampleFormat};
pub use framer::{encode_frame, frame_len};
pub use raop_encoder::RaopAudioEncoder;
