//! Arena allocators and typed views over arena memory.
//!
//! # Types
//!
//! - [`MonotonicArena`]: single-threaded bump allocator over a growing list
//!   of zeroed buffers
//! - [`ConcurrentArena`]: the same contract serialized behind a mutex
//! - [`ArenaBox<T>`] / [`ArenaVec<T>`]: typed views with host-allocator
//!   fallback when no arena is supplied
//!
//! # Examples
//!
//! Basic usage:
//! ```rust
//! use monoarena::arena::{Arena, MonotonicArena};
//!
//! let mut arena = MonotonicArena::new();
//! let ptr = arena.alloc(64, 8);
//! assert_eq!(ptr.as_ptr() as usize % 8, 0);
//! assert!(arena.len() >= 64);
//! arena.reset(); // every pointer handed out so far is now invalid
//! ```
//!
//! Thread-safe usage:
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//!
//! use monoarena::arena::{Arena, ConcurrentArena, MonotonicArena};
//!
//! let arena = Arc::new(ConcurrentArena::new(MonotonicArena::new()));
//! let worker = Arc::clone(&arena);
//!
//! let handle = thread::spawn(move || worker.alloc(16, 8).is_some());
//! assert!(handle.join().unwrap());
//! assert_eq!(arena.len(), 16);
//! ```

use std::ptr::NonNull;

mod concurrent;
mod monotonic;
mod typed;

pub use self::concurrent::ConcurrentArena;
pub use self::monotonic::MonotonicArena;
pub use self::typed::{ArenaBox, ArenaVec};

/// Default minimum size of a freshly created arena buffer, in bytes.
pub const DEFAULT_MIN_BUFFER_SIZE: usize = 32 * 1024;

/// Capability shared by every arena implementation.
///
/// An arena serves many allocations that share one lifetime and reclaims
/// them collectively: [`reset`](Arena::reset) rewinds the arena while
/// keeping its backing storage, [`release`](Arena::release) also returns
/// the storage to the host allocator. Both take `&mut self`, so any typed
/// view still borrowing the arena keeps it pinned until the view is gone.
pub trait Arena {
    /// Allocates `size` zeroed bytes whose address is a multiple of
    /// `align`.
    ///
    /// A real allocator never returns `None` for a well-formed request;
    /// `None` is reserved for wrappers with an absent inner arena (see
    /// [`ConcurrentArena::empty`]). Zero-sized requests yield a dangling,
    /// well-aligned pointer and consume no space.
    ///
    /// The returned region stays valid until the next `reset` or
    /// `release`, whichever comes first.
    ///
    /// # Panics
    ///
    /// Panics if `align` is zero or not a power of two.
    fn alloc(&self, size: usize, align: usize) -> Option<NonNull<u8>>;

    /// Rewinds every buffer offset to zero, retaining backing storage for
    /// reuse.
    fn reset(&mut self);

    /// Rewinds every buffer offset and returns the backing storage to the
    /// host allocator.
    ///
    /// The arena remains usable: the next `alloc` lazily materializes a
    /// fresh buffer.
    fn release(&mut self);

    /// Total bytes currently allocated (the sum of all buffer offsets,
    /// padding included).
    fn len(&self) -> usize;

    /// Total configured capacity in bytes. A buffer counts even before its
    /// base has been materialized.
    fn capacity(&self) -> usize;

    /// High-water mark of [`len`](Arena::len) since construction. Never
    /// reset, not even by `release`.
    fn peak(&self) -> usize;

    /// Returns `true` when nothing is currently allocated.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<A: Arena + ?Sized> Arena for Box<A> {
    fn alloc(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        (**self).alloc(size, align)
    }

    fn reset(&mut self) {
        (**self).reset();
    }

    fn release(&mut self) {
        (**self).release();
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn peak(&self) -> usize {
        (**self).peak()
    }
}

/// Construction options for [`MonotonicArena`].
#[derive(Debug, Clone)]
pub struct ArenaOptions {
    /// Minimum size in bytes of each newly created buffer. Zero is
    /// accepted: buffers are then sized on demand for each overflowing
    /// request.
    pub min_buffer_size: usize,
    /// Number of buffers the arena starts with. Zero is accepted: the
    /// arena starts empty and grows on first use.
    pub initial_buffer_count: usize,
}

impl ArenaOptions {
    /// Creates options with the defaults: 32 KiB buffers, one initial
    /// buffer.
    pub fn new() -> Self {
        Self {
            min_buffer_size: DEFAULT_MIN_BUFFER_SIZE,
            initial_buffer_count: 1,
        }
    }

    /// Sets the minimum buffer size in bytes.
    pub fn with_min_buffer_size(mut self, bytes: usize) -> Self {
        self.min_buffer_size = bytes;
        self
    }

    /// Sets the number of buffers created up front.
    pub fn with_initial_buffer_count(mut self, count: usize) -> Self {
        self.initial_buffer_count = count;
        self
    }
}

impl Default for ArenaOptions {
    fn default() -> Self {
        Self::new()
    }
}
