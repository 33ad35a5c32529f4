//! Integration tests for the arena pool's reuse and adaptive sizing.

use std::sync::Arc;
use std::thread;

use monoarena::pool::{ArenaPool, PoolItem, PoolOptions};

const CHECKOUT: u64 = 11;
const RENDER: u64 = 12;

#[test]
fn estimated_size_converges_to_observed_peaks() {
    let pool = ArenaPool::new();

    // Many acquire/release cycles with a steady ~8 KiB working set.
    for _ in 0..120 {
        let item = pool.acquire(CHECKOUT);
        item.arena.alloc(8 * 1024, 8);
        pool.release(item);
    }

    let estimate = pool.estimated_size(CHECKOUT);
    assert!(
        (8 * 1024..=16 * 1024).contains(&estimate),
        "estimate {estimate} strayed from the observed peak"
    );

    // Keys are tracked independently.
    assert_eq!(pool.estimated_size(RENDER), 1024 * 1024);
}

#[test]
fn interleaved_acquire_release_cycles() {
    let pool = ArenaPool::new();

    for round in 0..10 {
        let items: Vec<PoolItem> = (0..10).map(|_| pool.acquire(CHECKOUT)).collect();
        for item in &items {
            item.arena.alloc(1024, 1);
        }
        pool.release_many(items);
        assert!(pool.idle_count() >= 1, "round {round}");
    }

    // Fresh arenas for this key now start close to the 1 KiB peak.
    let estimate = pool.estimated_size(CHECKOUT);
    assert!((1024..=4096).contains(&estimate));
}

#[test]
fn eviction_bounds_idle_memory() {
    let pool = ArenaPool::with_options(
        PoolOptions::new()
            .with_max_idle(4)
            .with_max_retained_bytes(8 * 1024 * 1024),
    );

    let items: Vec<PoolItem> = (0..16).map(|_| pool.acquire(CHECKOUT)).collect();
    pool.release_many(items);
    assert!(pool.idle_count() <= 4);
}

#[test]
fn pool_is_shareable_across_threads() {
    let pool = Arc::new(ArenaPool::new());
    let mut handles = Vec::new();

    for t in 0..8u64 {
        let pool = Arc::clone(&pool);
        handles.push(thread::spawn(move || {
            for _ in 0..50 {
                let item = pool.acquire(t);
                item.arena.alloc(256, 8);
                pool.release(item);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    for t in 0..8u64 {
        assert_eq!(pool.estimated_size(t), 256);
    }
}
