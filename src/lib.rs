//! Region-based memory allocation for request-scoped workloads.
//!
//! Many small allocations that share one lifetime (the objects built
//! while handling a single request, say) are served by bump allocation
//! over a handful of large buffers, then reclaimed together:
//!
//! - [`MonotonicArena`]: bump allocator over a growing list of zeroed
//!   buffers, with alignment handling and high-water-mark tracking
//! - [`ConcurrentArena`]: the same contract serialized behind a mutex for
//!   cross-thread use
//! - [`ArenaBox`] / [`ArenaVec`]: typed views over arena memory with
//!   transparent host-allocator fallback when no arena is supplied
//! - [`Buffer`]: an arena-backed byte buffer with appending writes,
//!   consuming reads and streaming ingestion
//! - [`ArenaPool`]: keyed arena reuse with adaptive initial sizing from
//!   observed peak usage
//!
//! # Quick start
//!
//! ```rust
//! use monoarena::prelude::*;
//!
//! let mut arena = MonotonicArena::new();
//! {
//!     let mut buf = Buffer::new(Some(&arena));
//!     buf.write_str("hello world");
//!     assert_eq!(buf.bytes(), b"hello world");
//! }
//! arena.reset(); // storage retained for the next request
//! assert_eq!(arena.len(), 0);
//! ```
//!
//! # Lifetimes
//!
//! Everything allocated from an arena becomes invalid at its next
//! [`reset`](Arena::reset) or [`release`](Arena::release). Both take
//! `&mut self`, and the typed views hold a shared borrow of the arena, so
//! the contract is enforced by the borrow checker rather than by
//! convention. No per-object deallocation exists; memory is reclaimed
//! collectively.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod arena;
pub mod buffer;
pub mod pool;

mod error;
mod utils;

pub use crate::arena::{
    Arena, ArenaBox, ArenaOptions, ArenaVec, ConcurrentArena, MonotonicArena,
};
pub use crate::buffer::Buffer;
pub use crate::error::TransferError;
pub use crate::pool::{ArenaPool, PoolItem, PoolOptions};

pub mod prelude {
    //! Convenient re-exports of the commonly used types.

    pub use crate::arena::{
        Arena, ArenaBox, ArenaOptions, ArenaVec, ConcurrentArena, MonotonicArena,
    };
    pub use crate::buffer::Buffer;
    pub use crate::pool::{ArenaPool, PoolItem, PoolOptions};
}
