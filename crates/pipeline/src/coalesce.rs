use std::io::{self, Write};

/// Fixed-capacity byte arena plus a fill index.
///
/// Bytes are only ever appended at the fill index and drained from the
/// front in one piece, so arrival order is preserved by construction.
pub struct CoalescingBuffer {
    data: Box<[u8]>,
    fill: usize,
}

impl CoalescingBuffer {
    /// Allocates an arena of `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "coalescing buffer capacity must be non-zero");
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            fill: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.fill
    }

    pub fn is_empty(&self) -> bool {
        self.fill == 0
    }

    pub fn is_full(&self) -> bool {
        self.fill == self.data.len()
    }

    /// Copies as much of `src` as fits. Returns the number of bytes taken.
    pub fn push(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.data.len() - self.fill);
        self.data[self.fill..self.fill + n].copy_from_slice(&src[..n]);
        self.fill += n;
        n
    }

    /// Hands back the filled region and resets the fill index in the same
    /// step.
    pub fn take(&mut self) -> &[u8] {
        let n = std::mem::take(&mut self.fill);
        &self.data[..n]
    }
}

/// Batches writes into capacity-sized sequential writes to `W`.
///
/// The sink sees one `write_all` per full buffer plus one for the tail on
/// [`flush`](Write::flush) or [`into_inner`](Self::into_inner). Sink errors
/// are returned as-is and the drained bytes are not retried; the caller is
/// expected to abort the run.
pub struct CoalescingWriter<W: Write> {
    sink: W,
    buffer: CoalescingBuffer,
}

impl<W: Write> CoalescingWriter<W> {
    /// Wraps `sink` with a buffer of `capacity` bytes.
    pub fn new(sink: W, capacity: usize) -> Self {
        Self {
            sink,
            buffer: CoalescingBuffer::with_capacity(capacity),
        }
    }

    /// Bytes currently held back from the sink.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Flushes the tail and returns the sink.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.flush()?;
        Ok(self.sink)
    }

    fn flush_buffer(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.sink.write_all(self.buffer.take())
    }
}

impl<W: Write> Write for CoalescingWriter<W> {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        let mut copied = 0;
        while copied < src.len() {
            if self.buffer.is_full() {
                self.flush_buffer()?;
            }
            copied += self.buffer.push(&src[copied..]);
        }
        Ok(copied)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_buffer()?;
        self.sink.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every write call as a separate piece.
    #[derive(Default)]
    struct RecordingSink {
        writes: Vec<Vec<u8>>,
    }

    impl Write for RecordingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("no space left on tape"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn pattern(len: usize, seed: u32) -> Vec<u8> {
        let mut x = seed.wrapping_mul(2_654_435_761).max(1);
        (0..len)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                x as u8
            })
            .collect()
    }

    #[test]
    fn buffer_push_and_take() {
        let mut buf = CoalescingBuffer::with_capacity(4);
        assert!(buf.is_empty());
        assert_eq!(buf.push(b"abc"), 3);
        assert_eq!(buf.push(b"def"), 1);
        assert!(buf.is_full());
        assert_eq!(buf.take(), b"abcd");
        assert!(buf.is_empty());
        assert_eq!(buf.take(), b"");
    }

    #[test]
    #[should_panic]
    fn buffer_rejects_zero_capacity() {
        let _ = CoalescingBuffer::with_capacity(0);
    }

    #[test]
    fn small_writes_are_batched() {
        let mut w = CoalescingWriter::new(RecordingSink::default(), 8);
        for b in b"0123456789abcdef".chunks(2) {
            w.write_all(b).unwrap();
        }
        // Second full buffer is still held until more data or a flush.
        assert_eq!(w.get_ref().writes, vec![b"01234567".to_vec()]);
        assert_eq!(w.buffered(), 8);

        let sink = w.into_inner().unwrap();
        assert_eq!(sink.writes, vec![b"01234567".to_vec(), b"89abcdef".to_vec()]);
    }

    #[test]
    fn large_write_is_split_at_capacity() {
        let mut w = CoalescingWriter::new(RecordingSink::default(), 4);
        w.write_all(b"abcdefghij").unwrap();
        let sink = w.into_inner().unwrap();
        assert_eq!(
            sink.writes,
            vec![b"abcd".to_vec(), b"efgh".to_vec(), b"ij".to_vec()]
        );
    }

    #[test]
    fn flush_on_empty_buffer_is_noop() {
        let mut w = CoalescingWriter::new(RecordingSink::default(), 16);
        w.flush().unwrap();
        w.flush().unwrap();
        assert!(w.get_ref().writes.is_empty());
    }

    #[test]
    fn reassembly_preserves_order_for_any_chunking() {
        let input = pattern(10_007, 7);
        for capacity in [1, 3, 7, 64, 4096, 20_000] {
            for step in [1, 2, 5, 13, 1000, 10_007] {
                let mut w = CoalescingWriter::new(RecordingSink::default(), capacity);
                for piece in input.chunks(step) {
                    w.write_all(piece).unwrap();
                }
                let sink = w.into_inner().unwrap();

                let joined: Vec<u8> = sink.writes.concat();
                assert_eq!(joined, input, "capacity {capacity}, step {step}");

                let (last, full) = sink.writes.split_last().unwrap();
                assert!(full.iter().all(|p| p.len() == capacity));
                assert!(!last.is_empty() && last.len() <= capacity);
            }
        }
    }

    #[test]
    fn sink_error_is_propagated() {
        let mut w = CoalescingWriter::new(FailingSink, 4);
        // Fits in the buffer, so nothing reaches the sink yet.
        w.write_all(b"abcd").unwrap();

        let err = w.write_all(b"e").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert_eq!(err.to_string(), "no space left on tape");
    }

    #[test]
    fn flush_error_is_propagated() {
        let mut w = CoalescingWriter::new(FailingSink, 64);
        w.write_all(b"tail").unwrap();
        assert!(w.flush().is_err());
        assert!(w.into_inner().is_ok());
    }
}
