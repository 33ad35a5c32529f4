//! Mutex-serialized arena wrapper.

use std::ptr::NonNull;

use parking_lot::Mutex;

use super::{Arena, MonotonicArena};

/// Serializes every operation of a wrapped arena behind a mutex.
///
/// The wrapper holds no state of its own beyond the inner arena; counters
/// are always read through the lock. An empty wrapper (no inner arena) is
/// valid: its operations return benign defaults instead of panicking.
/// `alloc` yields `None`, counters read zero and `reset`/`release` are
/// no-ops. Typed views treat that `None` like a missing arena and fall
/// back to the host allocator.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use std::thread;
///
/// use monoarena::arena::{Arena, ConcurrentArena, MonotonicArena};
///
/// let arena = Arc::new(ConcurrentArena::new(MonotonicArena::new()));
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let arena = Arc::clone(&arena);
///         thread::spawn(move || arena.alloc(10, 1).is_some())
///     })
///     .collect();
/// for handle in handles {
///     assert!(handle.join().unwrap());
/// }
/// assert_eq!(arena.len(), 40);
/// ```
pub struct ConcurrentArena<A: Arena = MonotonicArena> {
    inner: Mutex<Option<A>>,
}

impl<A: Arena> ConcurrentArena<A> {
    /// Wraps `inner` for shared use across threads.
    pub fn new(inner: A) -> Self {
        Self {
            inner: Mutex::new(Some(inner)),
        }
    }

    /// Creates a wrapper with no inner arena. Every operation is a safe
    /// no-op returning its zero value.
    pub fn empty() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Unwraps the inner arena, if any.
    pub fn into_inner(self) -> Option<A> {
        self.inner.into_inner()
    }
}

impl<A: Arena> Arena for ConcurrentArena<A> {
    fn alloc(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        self.inner.lock().as_ref().and_then(|a| a.alloc(size, align))
    }

    fn reset(&mut self) {
        if let Some(arena) = self.inner.get_mut() {
            arena.reset();
        }
    }

    fn release(&mut self) {
        if let Some(arena) = self.inner.get_mut() {
            arena.release();
        }
    }

    fn len(&self) -> usize {
        self.inner.lock().as_ref().map_or(0, |a| a.len())
    }

    fn capacity(&self) -> usize {
        self.inner.lock().as_ref().map_or(0, |a| a.capacity())
    }

    fn peak(&self) -> usize {
        self.inner.lock().as_ref().map_or(0, |a| a.peak())
    }
}
