use crate::models::error::CaptureError;

/// Fixed-capacity circular byte buffer holding the most recent audio.
///
/// Not internally synchronized; wrap in `Arc<parking_lot::Mutex<..>>`
/// for cross-thread access. The capture loop is the only writer.
///
/// Overflow behavior: new bytes silently overwrite the oldest ones, so
/// the buffer always holds the last `capacity` bytes written.
#[derive(Debug)]
pub struct RingBuffer {
    storage: Box<[u8]>,
    /// Physical index the next byte lands at.
    write_pos: usize,
    /// Total bytes ever written; distinguishes a partially filled
    /// buffer from one that has wrapped.
    total_written: u64,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be positive");
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            write_pos: 0,
            total_written: 0,
        }
    }

    /// Append one frame, overwriting the oldest bytes on wrap.
    ///
    /// Frames land whole or not at all. A frame larger than the buffer
    /// itself is a programming error and is rejected without touching
    /// the contents. Empty frames are no-ops.
    pub fn write(&mut self, frame: &[u8]) -> Result<(), CaptureError> {
        if frame.is_empty() {
            return Ok(());
        }
        let capacity = self.storage.len();
        if frame.len() > capacity {
            return Err(CaptureError::InvalidFrame(format!(
                "frame of {} bytes exceeds ring capacity of {}",
                frame.len(),
                capacity
            )));
        }

        let first = frame.len().min(capacity - self.write_pos);
        self.storage[self.write_pos..self.write_pos + first].copy_from_slice(&frame[..first]);
        let rest = frame.len() - first;
        if rest > 0 {
            self.storage[..rest].copy_from_slice(&frame[first..]);
        }
        self.write_pos = (self.write_pos + frame.len()) % capacity;
        self.total_written += frame.len() as u64;
        Ok(())
    }

    /// Copy the current contents into `out`, oldest byte first.
    ///
    /// `out` is cleared first and ends up holding exactly `len()` bytes.
    /// Reading never mutates the buffer.
    pub fn snapshot_into(&self, out: &mut Vec<u8>) {
        out.clear();
        out.reserve(self.len());
        let capacity = self.storage.len();
        if self.total_written >= capacity as u64 {
            out.extend_from_slice(&self.storage[self.write_pos..]);
            out.extend_from_slice(&self.storage[..self.write_pos]);
        } else {
            out.extend_from_slice(&self.storage[..self.write_pos]);
        }
    }

    /// Convenience wrapper around `snapshot_into`.
    pub fn snapshot(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.snapshot_into(&mut out);
        out
    }

    /// Logically empty the buffer. Capacity is unchanged and the
    /// underlying storage is not scrubbed.
    pub fn reset(&mut self) {
        self.write_pos = 0;
        self.total_written = 0;
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Bytes a snapshot would currently return.
    pub fn len(&self) -> usize {
        self.total_written.min(self.storage.len() as u64) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.total_written == 0
    }

    /// Whether the oldest audio has already been overwritten.
    pub fn has_wrapped(&self) -> bool {
        self.total_written > self.storage.len() as u64
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_fill_returns_written_prefix() {
        let mut buf = RingBuffer::new(10);
        buf.write(&[1, 2, 3]).unwrap();

        assert_eq!(buf.len(), 3);
        assert!(!buf.has_wrapped());
        assert_eq!(buf.snapshot(), vec![1, 2, 3]);
    }

    #[test]
    fn wrap_keeps_most_recent_capacity_bytes() {
        let mut buf = RingBuffer::new(10);
        buf.write(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]).unwrap();
        assert_eq!(buf.snapshot(), (1..=10).collect::<Vec<u8>>());
        assert!(!buf.has_wrapped());

        buf.write(&[11, 12]).unwrap();
        assert!(buf.has_wrapped());
        assert_eq!(buf.len(), 10);
        assert_eq!(buf.snapshot(), (3..=12).collect::<Vec<u8>>());
    }

    #[test]
    fn frame_spanning_the_boundary_lands_whole() {
        let mut buf = RingBuffer::new(8);
        buf.write(&[1, 2, 3, 4, 5, 6]).unwrap();
        // Next frame crosses the physical end: two bytes at the tail,
        // two at the head.
        buf.write(&[7, 8, 9, 10]).unwrap();

        assert_eq!(buf.snapshot(), vec![3, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn many_wraps_stay_chronological() {
        let mut buf = RingBuffer::new(7);
        let mut counter = 0u8;
        for _ in 0..40 {
            let frame: Vec<u8> = (0..3).map(|_| {
                counter = counter.wrapping_add(1);
                counter
            }).collect();
            buf.write(&frame).unwrap();
        }

        // 120 bytes written; the last 7 are 114..=120.
        assert_eq!(buf.total_written(), 120);
        assert_eq!(buf.snapshot(), (114..=120).collect::<Vec<u8>>());
    }

    #[test]
    fn exact_capacity_write_is_full_and_ordered() {
        let mut buf = RingBuffer::new(5);
        buf.write(&[1, 2, 3, 4, 5]).unwrap();

        assert_eq!(buf.len(), 5);
        assert!(!buf.has_wrapped());
        assert_eq!(buf.snapshot(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn oversized_frame_is_rejected_without_corruption() {
        let mut buf = RingBuffer::new(4);
        buf.write(&[1, 2]).unwrap();

        let err = buf.write(&[9; 5]).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidFrame(_)));

        // Contents untouched.
        assert_eq!(buf.snapshot(), vec![1, 2]);
        assert_eq!(buf.total_written(), 2);
    }

    #[test]
    fn empty_write_is_a_noop() {
        let mut buf = RingBuffer::new(4);
        buf.write(&[]).unwrap();
        assert!(buf.is_empty());
        assert_eq!(buf.total_written(), 0);
    }

    #[test]
    fn reset_empties_logically() {
        let mut buf = RingBuffer::new(6);
        buf.write(&[1, 2, 3, 4, 5, 6]).unwrap();
        buf.write(&[7]).unwrap();
        buf.reset();

        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
        assert!(buf.snapshot().is_empty());
        assert_eq!(buf.capacity(), 6);

        // Writes after reset behave like a fresh buffer.
        buf.write(&[42]).unwrap();
        assert_eq!(buf.snapshot(), vec![42]);
    }

    #[test]
    fn snapshot_into_reuses_the_output_vec() {
        let mut buf = RingBuffer::new(4);
        buf.write(&[1, 2, 3]).unwrap();

        let mut out = vec![9, 9, 9, 9, 9];
        buf.snapshot_into(&mut out);
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn snapshot_does_not_disturb_subsequent_writes() {
        let mut buf = RingBuffer::new(6);
        buf.write(&[1, 2, 3, 4]).unwrap();
        let first = buf.snapshot();
        buf.write(&[5, 6, 7]).unwrap();

        assert_eq!(first, vec![1, 2, 3, 4]);
        assert_eq!(buf.snapshot(), vec![2, 3, 4, 5, 6, 7]);
    }
}
