//! Arena-backed byte buffer with appending writes and consuming reads.
//!
//! The buffer keeps a producer tail and a consumer cursor over one byte
//! sequence: writes append at the tail, reads advance the cursor, and the
//! *unread window* in between is what [`bytes`](Buffer::bytes),
//! [`len`](Buffer::len), [`next`](Buffer::next),
//! [`truncate`](Buffer::truncate) and [`write_to`](Buffer::write_to)
//! operate on. Once the window drains completely both cursors rewind, so
//! the backing storage is recycled instead of growing without bound.

use std::fmt;
use std::io;

use crate::arena::{Arena, ArenaVec};
use crate::error::TransferError;

/// Size of the scratch block [`Buffer::read_from`] streams through.
const READ_BUF_SIZE: usize = 4 * 1024;

/// A read/write byte container backed by arena storage.
///
/// All storage is drawn from the arena supplied at construction; without
/// one (or with an arena that declines, such as an empty
/// [`ConcurrentArena`](crate::arena::ConcurrentArena)) the host allocator
/// is used instead, so the same call sites work either way.
///
/// # Examples
///
/// ```rust
/// use monoarena::arena::MonotonicArena;
/// use monoarena::buffer::Buffer;
///
/// let arena = MonotonicArena::with_min_buffer_size(1024);
/// let mut buf = Buffer::new(Some(&arena));
///
/// buf.write_str("hello world");
/// let mut head = [0u8; 5];
/// assert_eq!(buf.read(&mut head), 5);
/// assert_eq!(&head, b"hello");
/// assert_eq!(buf.read_byte(), Some(b' '));
/// assert_eq!(buf.bytes(), b"world");
/// ```
pub struct Buffer<'a> {
    buf: ArenaVec<'a, u8>,
    /// Read cursor: the unread window is `buf[off..]`.
    off: usize,
    /// Lazily allocated scratch for [`Buffer::read_from`].
    read_buf: Option<ArenaVec<'a, u8>>,
}

impl<'a> Buffer<'a> {
    /// Creates an empty buffer drawing storage from `arena`; `None` falls
    /// back to the host allocator.
    pub fn new(arena: Option<&'a dyn Arena>) -> Self {
        Self {
            buf: ArenaVec::new_in(arena),
            off: 0,
            read_buf: None,
        }
    }

    /// Appends `p` to the buffer. Empty input is a no-op.
    pub fn write(&mut self, p: &[u8]) {
        if p.is_empty() {
            return;
        }
        self.recycle_if_drained();
        self.buf.extend_from_slice(p);
    }

    /// Appends a single byte.
    pub fn write_byte(&mut self, c: u8) {
        self.recycle_if_drained();
        self.buf.push(c);
    }

    /// Appends the bytes of `s`. The empty string is a no-op.
    pub fn write_str(&mut self, s: &str) {
        self.write(s.as_bytes());
    }

    /// Copies up to `p.len()` bytes out of the unread window, consuming
    /// them. Returns the number of bytes copied; zero means the window is
    /// empty (or `p` is).
    pub fn read(&mut self, p: &mut [u8]) -> usize {
        let window = &self.buf[self.off..];
        let n = window.len().min(p.len());
        p[..n].copy_from_slice(&window[..n]);
        self.consume(n);
        n
    }

    /// Consumes and returns the byte at the head of the unread window.
    pub fn read_byte(&mut self) -> Option<u8> {
        let c = *self.buf.as_slice().get(self.off)?;
        self.consume(1);
        Some(c)
    }

    /// Writes the unread window to `w`, consuming the bytes `w` accepted.
    /// Returns the number of bytes written; a writer error reports zero
    /// bytes transferred and leaves the window intact.
    pub fn write_to<W: io::Write>(&mut self, w: &mut W) -> Result<u64, TransferError> {
        if self.is_empty() {
            return Ok(0);
        }
        match w.write(&self.buf[self.off..]) {
            Ok(n) => {
                self.consume(n);
                Ok(n as u64)
            }
            Err(source) => Err(TransferError::new(0, source)),
        }
    }

    /// Streams `r` into the buffer until end of stream, going through a
    /// lazily allocated 4 KiB scratch block. Interrupted reads are
    /// retried; any other reader error carries the byte count accumulated
    /// so far (those bytes remain readable in the buffer).
    pub fn read_from<R: io::Read>(&mut self, r: &mut R) -> Result<u64, TransferError> {
        let mut scratch = match self.read_buf.take() {
            Some(scratch) => scratch,
            None => ArenaVec::zeroed_in(READ_BUF_SIZE, READ_BUF_SIZE, self.buf.arena()),
        };

        let mut total = 0u64;
        let result = loop {
            match r.read(&mut scratch) {
                Ok(0) => break Ok(total),
                Ok(n) => {
                    self.write(&scratch[..n]);
                    total += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => break Err(TransferError::new(total, source)),
            }
        };
        self.read_buf = Some(scratch);
        result
    }

    /// Consumes up to `n` bytes from the head of the unread window and
    /// returns them. `n` is clamped to the window length. The slice is
    /// valid until the next modifying call.
    pub fn next(&mut self, n: usize) -> &[u8] {
        let start = self.off;
        let n = n.min(self.len());
        self.off += n;
        &self.buf[start..start + n]
    }

    /// The unread window. Empty when everything written has been
    /// consumed; valid until the next modifying call.
    pub fn bytes(&self) -> &[u8] {
        &self.buf[self.off..]
    }

    /// Length of the unread window.
    pub fn len(&self) -> usize {
        self.buf.len() - self.off
    }

    /// Returns `true` when the unread window is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity of the underlying storage, in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Empties the buffer, retaining the current backing storage for
    /// reuse.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.off = 0;
    }

    /// Discards all but the first `n` bytes of the unread window.
    ///
    /// # Panics
    ///
    /// Panics if `n` is greater than the window length.
    pub fn truncate(&mut self, n: usize) {
        let len = self.len();
        if n > len {
            panic!("truncation out of range: {n} > {len}");
        }
        self.buf.truncate(self.off + n);
    }

    fn consume(&mut self, n: usize) {
        self.off += n;
        self.recycle_if_drained();
    }

    /// Rewinds both cursors once the window has fully drained so the
    /// storage is reused from the front.
    fn recycle_if_drained(&mut self) {
        if self.off > 0 && self.off == self.buf.len() {
            self.buf.clear();
            self.off = 0;
        }
    }
}

impl io::Write for Buffer<'_> {
    fn write(&mut self, p: &[u8]) -> io::Result<usize> {
        Buffer::write(self, p);
        Ok(p.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Read for Buffer<'_> {
    fn read(&mut self, p: &mut [u8]) -> io::Result<usize> {
        Ok(Buffer::read(self, p))
    }
}

impl fmt::Display for Buffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.bytes()))
    }
}

impl fmt::Debug for Buffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
