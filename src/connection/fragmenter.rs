//! Splitting outgoing data messages into frames (RFC 6455 Section 5.4).

use std::iter::Peekable;
use std::slice::Chunks;

use crate::protocol::{Frame, OpCode};

/// Iterator over the frames of one outgoing data message.
///
/// The first frame carries the message opcode, later ones are
/// `Continuation`, and only the last has FIN set. An empty payload still
/// yields a single empty frame.
pub struct MessageFragmenter<'a> {
    chunks: Peekable<Chunks<'a, u8>>,
    opcode: OpCode,
    empty: bool,
}

impl<'a> MessageFragmenter<'a> {
    /// `fragment_size` of zero is treated as one byte.
    #[must_use]
    pub fn new(payload: &'a [u8], opcode: OpCode, fragment_size: usize) -> Self {
        Self {
            chunks: payload.chunks(fragment_size.max(1)).peekable(),
            opcode,
            empty: payload.is_empty(),
        }
    }
}

/// Number of frames a payload of `len` bytes is sent as.
#[must_use]
pub fn frame_count(len: usize, fragment_size: usize) -> usize {
    len.div_ceil(fragment_size.max(1)).max(1)
}

impl Iterator for MessageFragmenter<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.empty {
            self.empty = false;
            return Some(Frame::new(true, self.opcode, Vec::new()));
        }
        let chunk = self.chunks.next()?;
        let fin = self.chunks.peek().is_none();
        let opcode = std::mem::replace(&mut self.opcode, OpCode::Continuation);
        Some(Frame::new(fin, opcode, chunk.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_fragmentation_needed() {
        let frames: Vec<_> = MessageFragmenter::new(b"Hello", OpCode::Text, 1024).collect();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].fin);
        assert_eq!(frames[0].opcode, OpCode::Text);
        assert_eq!(frames[0].payload(), b"Hello");
    }

    #[test]
    fn test_uneven_fragmentation() {
        let payload = vec![0xCD; 25];
        let frames: Vec<_> = MessageFragmenter::new(&payload, OpCode::Binary, 10).collect();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].opcode, OpCode::Binary);
        assert_eq!(frames[1].opcode, OpCode::Continuation);
        assert_eq!(frames[2].opcode, OpCode::Continuation);
        assert_eq!(frames[2].payload().len(), 5);
        assert_eq!(
            frames.iter().map(|f| f.fin).collect::<Vec<_>>(),
            vec![false, false, true]
        );
    }

    #[test]
    fn test_empty_payload() {
        let frames: Vec<_> = MessageFragmenter::new(b"", OpCode::Text, 1024).collect();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].fin);
        assert_eq!(frames[0].opcode, OpCode::Text);
        assert!(frames[0].payload().is_empty());
    }

    #[test]
    fn test_payload_equals_fragment_size() {
        let payload = vec![0xEF; 100];
        let frames: Vec<_> = MessageFragmenter::new(&payload, OpCode::Binary, 100).collect();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].fin);
    }

    #[test]
    fn test_default_payload_frame_count() {
        let payload = vec![b'h'; 165_000];
        let frames: Vec<_> = MessageFragmenter::new(&payload, OpCode::Text, 16 * 1024).collect();
        assert_eq!(frames.len(), frame_count(165_000, 16 * 1024));
        assert_eq!(frames.len(), 11);
        let total: usize = frames.iter().map(|f| f.payload().len()).sum();
        assert_eq!(total, 165_000);
    }

    #[test]
    fn test_frame_count() {
        assert_eq!(frame_count(0, 10), 1);
        assert_eq!(frame_count(10, 10), 1);
        assert_eq!(frame_count(11, 10), 2);
        assert_eq!(frame_count(5, 0), 5);
    }
}
