//! Monotonic bump arena over a growing list of byte buffers.
//!
//! # Invariants
//!
//! - `0 <= offset <= size` for every buffer; the bytes in `[0, offset)`
//!   are in use and were zeroed when handed out
//! - A buffer's base is materialized lazily as a zeroed block and does not
//!   move until `release`
//! - Buffers are never removed: `reset` rewinds offsets, `release` also
//!   frees the bases; both leave `peak` untouched

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::ptr::{self, NonNull};

use tracing::debug;

use super::{Arena, ArenaOptions};
use crate::utils::align_up;

/// Minimum alignment a buffer base is materialized with. Covers every
/// natural alignment so a fresh buffer needs no pad at offset zero.
const BUFFER_BASE_ALIGN: usize = 16;

/// One contiguous backing region owned by the arena.
struct Buffer {
    /// Base address; `None` until the buffer is first used or after
    /// `release`.
    base: Option<NonNull<u8>>,
    /// Alignment the base was materialized with, required to deallocate.
    base_align: usize,
    size: usize,
    offset: usize,
}

impl Buffer {
    fn new(size: usize) -> Self {
        Self {
            base: None,
            base_align: BUFFER_BASE_ALIGN,
            size,
            offset: 0,
        }
    }

    #[inline]
    fn available(&self) -> usize {
        self.size - self.offset
    }

    /// Bump-allocates from this buffer, materializing the base on first
    /// use. Returns `None` when the padded request does not fit.
    fn try_alloc(&mut self, size: usize, align: usize) -> Option<NonNull<u8>> {
        let base = match self.base {
            Some(base) => base,
            None => {
                // The base comes out aligned to the request, so the fit
                // check needs no pad at offset zero.
                if size > self.size {
                    return None;
                }
                self.materialize(align)
            }
        };

        let addr = base.as_ptr() as usize + self.offset;
        let pad = align_up(addr, align) - addr;
        if size + pad > self.available() {
            return None;
        }

        // SAFETY: offset + pad + size <= self.size was just checked, so the
        // pointer stays inside the materialized block.
        let ptr = unsafe { base.as_ptr().add(self.offset + pad) };
        self.offset += size + pad;

        // Handed-out bytes are zeroed even when the buffer is reused after
        // a reset.
        // SAFETY: ptr..ptr+size lies inside the block per the bound above.
        unsafe { ptr::write_bytes(ptr, 0, size) };

        // SAFETY: ptr points into a live allocation and is non-null.
        Some(unsafe { NonNull::new_unchecked(ptr) })
    }

    fn materialize(&mut self, align: usize) -> NonNull<u8> {
        let base_align = align.max(BUFFER_BASE_ALIGN);
        // size >= 1 here: zero-sized requests never reach a buffer and
        // zero-sized buffers never pass the fit check.
        let layout = Layout::from_size_align(self.size, base_align)
            .expect("buffer size overflows the allocator layout");

        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc_zeroed(layout) };
        let base = match NonNull::new(ptr) {
            Some(base) => base,
            None => handle_alloc_error(layout),
        };
        self.base = Some(base);
        self.base_align = base_align;
        base
    }

    fn reset(&mut self) {
        self.offset = 0;
    }

    fn release(&mut self) {
        self.offset = 0;
        if let Some(base) = self.base.take() {
            // SAFETY: base was obtained from alloc_zeroed with exactly this
            // size and alignment, and take() ensures it is freed once.
            unsafe {
                dealloc(
                    base.as_ptr(),
                    Layout::from_size_align_unchecked(self.size, self.base_align),
                );
            }
        }
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.release();
    }
}

/// Bump allocator over an ordered list of byte buffers.
///
/// Allocation scans the buffers in insertion order and bumps the first one
/// with room, appending a new buffer when none fits. Returned regions are
/// always zeroed. [`reset`](MonotonicArena::reset) rewinds all buffers for
/// reuse; [`release`](MonotonicArena::release) frees their storage while
/// keeping the arena usable.
///
/// Not safe for concurrent use: wrap it in
/// [`ConcurrentArena`](super::ConcurrentArena) to share across threads.
///
/// # Examples
///
/// ```rust
/// use monoarena::arena::{ArenaOptions, MonotonicArena};
///
/// let mut arena =
///     MonotonicArena::with_options(ArenaOptions::new().with_min_buffer_size(1024));
/// let p = arena.alloc(100, 8);
/// assert_eq!(p.as_ptr() as usize % 8, 0);
/// assert_eq!(arena.len(), 100);
///
/// arena.reset();
/// assert_eq!(arena.len(), 0);
/// assert_eq!(arena.peak(), 100); // the high-water mark survives
/// ```
pub struct MonotonicArena {
    buffers: RefCell<Vec<Buffer>>,
    peak: Cell<usize>,
    min_buffer_size: usize,
}

// SAFETY: the arena exclusively owns its buffer memory; moving it to
// another thread moves that ownership with it. Interior mutability is
// unsynchronized Cell/RefCell, so the type stays !Sync.
unsafe impl Send for MonotonicArena {}

impl MonotonicArena {
    /// Creates an arena with the default options (one 32 KiB buffer).
    pub fn new() -> Self {
        Self::with_options(ArenaOptions::default())
    }

    /// Creates an arena from explicit options.
    pub fn with_options(options: ArenaOptions) -> Self {
        let buffers = (0..options.initial_buffer_count)
            .map(|_| Buffer::new(options.min_buffer_size))
            .collect();
        Self {
            buffers: RefCell::new(buffers),
            peak: Cell::new(0),
            min_buffer_size: options.min_buffer_size,
        }
    }

    /// Creates an arena whose buffers are at least `bytes` large.
    pub fn with_min_buffer_size(bytes: usize) -> Self {
        Self::with_options(ArenaOptions::default().with_min_buffer_size(bytes))
    }

    /// Allocates `size` zeroed bytes whose address is a multiple of
    /// `align`.
    ///
    /// Never fails: when no buffer has room, a new buffer is appended,
    /// sized for the request but at least the configured minimum. The
    /// region stays valid until [`reset`](MonotonicArena::reset) or
    /// [`release`](MonotonicArena::release).
    ///
    /// # Panics
    ///
    /// Panics if `align` is zero or not a power of two.
    pub fn alloc(&self, size: usize, align: usize) -> NonNull<u8> {
        assert!(
            align.is_power_of_two(),
            "alignment must be a nonzero power of two"
        );

        if size == 0 {
            // Zero-sized requests consume no space; hand out a well-aligned
            // sentinel the way `NonNull::dangling` does.
            // SAFETY: align >= 1, so the address is non-null.
            return unsafe { NonNull::new_unchecked(align as *mut u8) };
        }

        let mut buffers = self.buffers.borrow_mut();
        if let Some(ptr) = buffers.iter_mut().find_map(|b| b.try_alloc(size, align)) {
            self.update_peak(&buffers);
            return ptr;
        }

        // No buffer has room: append one sized for the request, padding
        // conservatively against the bytes already in use.
        let len = Self::total_len(&buffers);
        let worst_pad = align_up(len, align) - len;
        let buffer_size = (size + worst_pad).max(self.min_buffer_size);
        debug!(
            buffer_size,
            buffer_count = buffers.len() + 1,
            "arena appending buffer"
        );

        let mut buffer = Buffer::new(buffer_size);
        let ptr = buffer
            .try_alloc(size, align)
            .expect("freshly sized buffer must fit its own request");
        buffers.push(buffer);
        self.update_peak(&buffers);
        ptr
    }

    /// Rewinds every buffer, retaining backing storage for reuse.
    ///
    /// Every pointer previously returned by
    /// [`alloc`](MonotonicArena::alloc) becomes invalid.
    pub fn reset(&mut self) {
        for buffer in self.buffers.get_mut() {
            buffer.reset();
        }
    }

    /// Rewinds every buffer and returns its storage to the host allocator.
    ///
    /// The arena remains usable; the next allocation materializes a fresh
    /// block.
    pub fn release(&mut self) {
        for buffer in self.buffers.get_mut() {
            buffer.release();
        }
    }

    /// Total bytes currently allocated, padding included.
    pub fn len(&self) -> usize {
        Self::total_len(&self.buffers.borrow())
    }

    /// Returns `true` when nothing is currently allocated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total configured capacity in bytes, counting buffers whose base has
    /// not been materialized yet.
    pub fn capacity(&self) -> usize {
        self.buffers.borrow().iter().map(|b| b.size).sum()
    }

    /// High-water mark of [`len`](MonotonicArena::len) since construction.
    pub fn peak(&self) -> usize {
        self.peak.get()
    }

    fn total_len(buffers: &[Buffer]) -> usize {
        buffers.iter().map(|b| b.offset).sum()
    }

    fn update_peak(&self, buffers: &[Buffer]) {
        let len = Self::total_len(buffers);
        if len > self.peak.get() {
            self.peak.set(len);
        }
    }

    #[cfg(test)]
    fn buffer_count(&self) -> usize {
        self.buffers.borrow().len()
    }
}

impl Default for MonotonicArena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena for MonotonicArena {
    fn alloc(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        Some(MonotonicArena::alloc(self, size, align))
    }

    fn reset(&mut self) {
        MonotonicArena::reset(self);
    }

    fn release(&mut self) {
        MonotonicArena::release(self);
    }

    fn len(&self) -> usize {
        MonotonicArena::len(self)
    }

    fn capacity(&self) -> usize {
        MonotonicArena::capacity(self)
    }

    fn peak(&self) -> usize {
        MonotonicArena::peak(self)
    }
}

impl fmt::Debug for MonotonicArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonotonicArena")
            .field("buffers", &self.buffers.borrow().len())
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("peak", &self.peak())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::is_aligned;

    #[test]
    fn serves_aligned_zeroed_regions() {
        let arena = MonotonicArena::with_min_buffer_size(1024);

        for &align in &[1usize, 2, 8, 64, 4096] {
            let ptr = arena.alloc(33, align);
            assert!(is_aligned(ptr.as_ptr() as usize, align));
            // SAFETY: 33 bytes at ptr were just allocated by the arena.
            let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 33) };
            assert!(bytes.iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn bumps_are_adjacent_within_a_buffer() {
        let arena = MonotonicArena::with_min_buffer_size(1024);

        let p1 = arena.alloc(100, 1).as_ptr() as usize;
        let p2 = arena.alloc(200, 1).as_ptr() as usize;
        let p3 = arena.alloc(50, 8).as_ptr() as usize;

        assert_eq!(p2, p1 + 100);
        assert!(is_aligned(p3, 8));
        assert!(arena.len() >= 350);
    }

    #[test]
    fn grows_by_appending_buffers() {
        let arena = MonotonicArena::with_options(
            ArenaOptions::new()
                .with_min_buffer_size(100)
                .with_initial_buffer_count(1),
        );

        arena.alloc(100, 1);
        arena.alloc(50, 1);
        arena.alloc(200, 1);

        assert_eq!(arena.len(), 350);
        assert_eq!(arena.peak(), 350);
        assert!(arena.buffer_count() >= 3);
        assert_eq!(arena.capacity(), 400);
    }

    #[test]
    fn reset_retains_capacity_and_peak() {
        let mut arena = MonotonicArena::with_min_buffer_size(256);
        let first = arena.alloc(64, 1);
        // SAFETY: the 64 bytes at `first` are live until the reset below.
        unsafe { ptr::write_bytes(first.as_ptr(), 0xAB, 64) };
        let cap = arena.capacity();

        arena.reset();
        assert_eq!(arena.len(), 0);
        assert_eq!(arena.capacity(), cap);
        assert_eq!(arena.peak(), 64);

        // Reused storage must come back zeroed.
        let again = arena.alloc(64, 1);
        assert_eq!(again.as_ptr(), first.as_ptr());
        // SAFETY: the 64 bytes at `again` were just allocated.
        let bytes = unsafe { std::slice::from_raw_parts(again.as_ptr(), 64) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn release_keeps_the_arena_usable() {
        let mut arena = MonotonicArena::with_min_buffer_size(128);
        arena.alloc(100, 1);
        let cap = arena.capacity();

        arena.release();
        assert_eq!(arena.len(), 0);
        assert_eq!(arena.capacity(), cap);
        assert_eq!(arena.peak(), 100);

        // A released arena lazily re-materializes on the next request.
        let ptr = arena.alloc(32, 4);
        assert!(is_aligned(ptr.as_ptr() as usize, 4));
        assert_eq!(arena.len(), 32);
    }

    #[test]
    fn peak_is_monotonic() {
        let mut arena = MonotonicArena::with_min_buffer_size(512);
        arena.alloc(300, 1);
        arena.reset();
        arena.alloc(100, 1);
        assert_eq!(arena.peak(), 300);

        arena.alloc(400, 1);
        assert_eq!(arena.peak(), 500);
    }

    #[test]
    fn zero_sized_requests_consume_no_space() {
        let arena = MonotonicArena::new();
        let ptr = arena.alloc(0, 64);
        assert!(is_aligned(ptr.as_ptr() as usize, 64));
        assert_eq!(arena.len(), 0);
    }

    #[test]
    fn accepts_degenerate_options() {
        // On-demand sizing with no minimum.
        let on_demand = MonotonicArena::with_options(
            ArenaOptions::new()
                .with_min_buffer_size(0)
                .with_initial_buffer_count(1),
        );
        on_demand.alloc(77, 1);
        assert_eq!(on_demand.len(), 77);

        // No initial buffers at all.
        let empty_start = MonotonicArena::with_options(
            ArenaOptions::new().with_initial_buffer_count(0),
        );
        assert_eq!(empty_start.capacity(), 0);
        empty_start.alloc(16, 8);
        assert_eq!(empty_start.len(), 16);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn rejects_non_power_of_two_alignment() {
        let arena = MonotonicArena::new();
        arena.alloc(8, 3);
    }
}
