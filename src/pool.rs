//! Arena reuse pool with per-key adaptive sizing.
//!
//! Request handlers that repeatedly need a short-lived arena check one out
//! with [`ArenaPool::acquire`] and hand it back with
//! [`ArenaPool::release`]. The pool tracks the peak usage of each
//! workload key across a rolling window, so freshly minted arenas start
//! with a buffer sized close to what the workload actually needs. Idle
//! arenas are bounded: past the configured thresholds the oldest ones are
//! dropped, so unused arenas do not accumulate forever.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::arena::{ArenaOptions, MonotonicArena};

/// Number of release samples folded into a key's rolling statistic before
/// it collapses toward its mean.
const SIZE_SAMPLE_WINDOW: usize = 50;

/// Initial buffer size for keys with no recorded history.
const DEFAULT_ARENA_SIZE: usize = 1024 * 1024;

/// Construction options for [`ArenaPool`].
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Most idle arenas retained at once; the oldest are dropped past
    /// this.
    pub max_idle: usize,
    /// Upper bound on the summed capacity of idle arenas, in bytes.
    pub max_retained_bytes: usize,
}

impl PoolOptions {
    /// Creates options with the defaults: 64 idle arenas, 64 MiB retained.
    pub fn new() -> Self {
        Self {
            max_idle: 64,
            max_retained_bytes: 64 * 1024 * 1024,
        }
    }

    /// Sets the maximum number of idle arenas.
    pub fn with_max_idle(mut self, count: usize) -> Self {
        self.max_idle = count;
        self
    }

    /// Sets the maximum summed capacity of idle arenas, in bytes.
    pub fn with_max_retained_bytes(mut self, bytes: usize) -> Self {
        self.max_retained_bytes = bytes;
        self
    }
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// An arena checked out of (or returnable to) an [`ArenaPool`], tagged
/// with the caller's workload key. Key 0 means "not in use".
#[derive(Debug)]
pub struct PoolItem {
    /// The pooled arena.
    pub arena: MonotonicArena,
    /// Workload key the arena is currently serving; 0 while idle.
    pub key: u64,
}

/// Rolling per-key statistic over released arenas' peak usage.
#[derive(Debug, Clone, Copy, Default)]
struct SizeStat {
    count: usize,
    total_bytes: usize,
}

impl SizeStat {
    fn absorb(&mut self, peak: usize) {
        if self.count == SIZE_SAMPLE_WINDOW {
            // Collapse toward the mean so old samples decay instead of
            // dominating forever.
            self.count = 1;
            self.total_bytes /= SIZE_SAMPLE_WINDOW;
        }
        self.count += 1;
        self.total_bytes += peak;
    }

    fn mean(&self) -> usize {
        self.total_bytes / self.count
    }
}

/// A thread-safe reuse pool of [`MonotonicArena`]s.
///
/// # Examples
///
/// ```rust
/// use monoarena::pool::ArenaPool;
///
/// const RENDER: u64 = 7;
///
/// let pool = ArenaPool::new();
/// let item = pool.acquire(RENDER);
/// item.arena.alloc(512, 8);
/// pool.release(item);
///
/// // The next acquire for any key reuses the parked arena.
/// let again = pool.acquire(RENDER);
/// assert_eq!(again.key, RENDER);
/// ```
pub struct ArenaPool {
    inner: Mutex<PoolInner>,
    options: PoolOptions,
}

struct PoolInner {
    /// Idle arenas: acquired from the tail, evicted from the front.
    idle: VecDeque<PoolItem>,
    sizes: HashMap<u64, SizeStat>,
}

impl ArenaPool {
    /// Creates a pool with the default retention thresholds.
    pub fn new() -> Self {
        Self::with_options(PoolOptions::default())
    }

    /// Creates a pool from explicit options.
    pub fn with_options(options: PoolOptions) -> Self {
        Self {
            inner: Mutex::new(PoolInner {
                idle: VecDeque::new(),
                sizes: HashMap::new(),
            }),
            options,
        }
    }

    /// Checks out an idle arena, or mints a fresh one whose buffer size is
    /// estimated from the key's recorded peak usage (1 MiB for unknown
    /// keys).
    pub fn acquire(&self, key: u64) -> PoolItem {
        let min_buffer_size = {
            let mut inner = self.inner.lock();
            if let Some(mut item) = inner.idle.pop_back() {
                trace!(key, "arena pool reuse");
                item.key = key;
                return item;
            }
            inner.estimated_size(key)
        };

        trace!(key, min_buffer_size, "arena pool mint");
        PoolItem {
            arena: MonotonicArena::with_options(
                ArenaOptions::new().with_min_buffer_size(min_buffer_size),
            ),
            key,
        }
    }

    /// Returns an arena to the pool: its peak feeds the key's rolling
    /// statistic, the arena is reset (invalidating everything allocated
    /// from it) and parked at the tail of the idle list.
    pub fn release(&self, item: PoolItem) {
        let mut inner = self.inner.lock();
        inner.park(item);
        self.evict(&mut inner);
    }

    /// [`release`](ArenaPool::release) for a batch, taking the pool lock
    /// once.
    pub fn release_many<I>(&self, items: I)
    where
        I: IntoIterator<Item = PoolItem>,
    {
        let mut inner = self.inner.lock();
        for item in items {
            inner.park(item);
        }
        self.evict(&mut inner);
    }

    /// Estimated initial buffer size for a fresh arena serving `key`.
    pub fn estimated_size(&self, key: u64) -> usize {
        self.inner.lock().estimated_size(key)
    }

    /// Number of idle arenas currently parked.
    pub fn idle_count(&self) -> usize {
        self.inner.lock().idle.len()
    }

    /// Drops the oldest idle arenas while either retention threshold is
    /// exceeded.
    fn evict(&self, inner: &mut PoolInner) {
        let mut retained: usize = inner.idle.iter().map(|i| i.arena.capacity()).sum();
        while inner.idle.len() > self.options.max_idle
            || (retained > self.options.max_retained_bytes && !inner.idle.is_empty())
        {
            if let Some(evicted) = inner.idle.pop_front() {
                let capacity = evicted.arena.capacity();
                retained -= capacity;
                debug!(capacity, idle = inner.idle.len(), "arena pool evict");
            }
        }
    }
}

impl Default for ArenaPool {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolInner {
    fn park(&mut self, mut item: PoolItem) {
        let peak = item.arena.peak();
        item.arena.reset();
        self.sizes.entry(item.key).or_default().absorb(peak);
        item.key = 0;
        self.idle.push_back(item);
    }

    fn estimated_size(&self, key: u64) -> usize {
        self.sizes.get(&key).map_or(DEFAULT_ARENA_SIZE, SizeStat::mean)
    }
}
