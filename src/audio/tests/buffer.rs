use proptest::prelude::*;

use crate::audio::FrameBuffer;

#[test]
fn test_fill_until_full() {
    let mut buffer = FrameBuffer::new(8);
    assert_eq!(buffer.fill(&[1, 2, 3]), 3);
    assert!(!buffer.is_full());
    assert_eq!(buffer.fill(&[4, 5, 6, 7, 8, 9, 10]), 5);
    assert!(buffer.is_full());
    assert_eq!(buffer.as_slice(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(buffer.fill(&[11]), 0);

    buffer.clear();
    assert!(buffer.is_empty());
}

#[test]
fn test_pad_with_silence() {
    let mut buffer = FrameBuffer::new(6);
    buffer.fill(&[7, 7]);
    buffer.pad_with_silence();
    assert!(buffer.is_full());
    assert_eq!(buffer.as_slice(), &[7, 7, 0, 0, 0, 0]);
}

proptest! {
    // Bytes split across any number of writes come out as the same stream of
    // full frames, with the remainder left buffered.
    #[test]
    fn test_concatenation(
        chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..100), 0..20),
        capacity in 1usize..64,
    ) {
        let mut buffer = FrameBuffer::new(capacity);
        let mut frames: Vec<u8> = Vec::new();
        let mut frame_count = 0;

        for chunk in &chunks {
            let mut input = chunk.as_slice();
            while !input.is_empty() {
                let taken = buffer.fill(input);
                input = &input[taken..];
                if buffer.is_full() {
                    prop_assert_eq!(buffer.len(), capacity);
                    frames.extend_from_slice(buffer.as_slice());
                    frame_count += 1;
                    buffer.clear();
                }
            }
        }

        let all: Vec<u8> = chunks.concat();
        prop_assert_eq!(frame_count, all.len() / capacity);
        frames.extend_from_slice(buffer.as_slice());
        prop_assert_eq!(frames, all);
    }
}
