// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded recycling pool for buffers and writers.
//!
//! Unlike a fixed slab, the pool never refuses a request: an empty freelist
//! fabricates a fresh object through the factory, and a release into a full
//! freelist drops the object. The freelist is therefore a cache bounded by
//! `capacity`, not a hard limit on objects in flight.
//!
//! # Design
//! - **Lock-free:** crossbeam `ArrayQueue` freelist (MPMC-safe)
//! - **Reset on release:** objects re-enter the freelist already reset
//! - **Scoped return:** [`Pooled`] returns its object on drop, on every exit path

use crossbeam::queue::ArrayQueue;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;
type Reset<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// Recyclable object pool with a factory and a reset function.
pub struct Pool<T> {
    freelist: ArrayQueue<T>,
    factory: Factory<T>,
    reset: Reset<T>,
    /// Objects fabricated because the freelist was empty
    created: AtomicU64,
    /// Objects accepted back into the freelist
    recycled: AtomicU64,
    /// Objects dropped because the freelist was full
    discarded: AtomicU64,
}

impl<T> Pool<T> {
    /// Create a pool keeping at most `capacity` idle objects.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new<F, R>(capacity: usize, factory: F, reset: R) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        R: Fn(&mut T) + Send + Sync + 'static,
    {
        assert!(capacity > 0, "Pool capacity must be at least 1");
        Self {
            freelist: ArrayQueue::new(capacity),
            factory: Box::new(factory),
            reset: Box::new(reset),
            created: AtomicU64::new(0),
            recycled: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    /// Take an idle object, or fabricate one. Never blocks.
    pub fn acquire(&self) -> T {
        match self.freelist.pop() {
            Some(item) => item,
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                (self.factory)()
            }
        }
    }

    /// Reset `item` and keep it for reuse; drop it if the pool is already full.
    pub fn release(&self, mut item: T) {
        (self.reset)(&mut item);
        match self.freelist.push(item) {
            Ok(()) => {
                self.recycled.fetch_add(1, Ordering::Relaxed);
            }
            Err(_dropped) => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                log::trace!(
                    "[pool] freelist full (capacity={}), discarding object",
                    self.freelist.capacity()
                );
            }
        }
    }

    /// Maximum number of idle objects kept.
    pub fn capacity(&self) -> usize {
        self.freelist.capacity()
    }

    /// Number of idle objects currently available without fabrication.
    pub fn available(&self) -> usize {
        self.freelist.len()
    }

    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    pub fn recycled(&self) -> u64 {
        self.recycled.load(Ordering::Relaxed)
    }

    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

impl<T> Pool<T> {
    /// Acquire an object wrapped in a guard that returns it on drop.
    pub fn checkout(self: &Arc<Self>) -> Pooled<T> {
        Pooled {
            item: Some(self.acquire()),
            pool: Arc::clone(self),
        }
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("capacity", &self.capacity())
            .field("available", &self.available())
            .field("created", &self.created())
            .field("recycled", &self.recycled())
            .field("discarded", &self.discarded())
            .finish()
    }
}

/// An object borrowed from a [`Pool`], returned exactly once when dropped.
pub struct Pooled<T> {
    item: Option<T>,
    pool: Arc<Pool<T>>,
}

/// A payload buffer borrowed from the endpoint's buffer pool.
pub type PooledBuffer = Pooled<Vec<u8>>;

impl<T> Deref for Pooled<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // `item` is only taken in `drop`
        match &self.item {
            Some(item) => item,
            None => unreachable!("pooled object accessed after release"),
        }
    }
}

impl<T> DerefMut for Pooled<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.item {
            Some(item) => item,
            None => unreachable!("pooled object accessed after release"),
        }
    }
}

impl<T> Drop for Pooled<T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.release(item);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pooled").field(&self.item).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_pool(capacity: usize, size: usize) -> Arc<Pool<Vec<u8>>> {
        Arc::new(Pool::new(
            capacity,
            move || Vec::with_capacity(size),
            Vec::clear,
        ))
    }

    #[test]
    fn test_acquire_fabricates_when_empty() {
        let pool = buffer_pool(2, 64);
        assert_eq!(pool.available(), 0);

        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();
        assert_eq!(pool.created(), 3);
        assert!(a.capacity() >= 64 && b.capacity() >= 64 && c.capacity() >= 64);
    }

    #[test]
    fn test_release_resets_and_discards_on_overflow() {
        let pool = buffer_pool(2, 16);
        let items: Vec<Vec<u8>> = (0..3)
            .map(|i| {
                let mut v = pool.acquire();
                v.push(i);
                v
            })
            .collect();

        for item in items {
            pool.release(item);
        }
        assert_eq!(pool.available(), 2);
        assert_eq!(pool.recycled(), 2);
        assert_eq!(pool.discarded(), 1);

        // Recycled objects come back reset
        let reused = pool.acquire();
        assert!(reused.is_empty());
        assert_eq!(pool.created(), 3);
    }

    #[test]
    fn test_pooled_guard_returns_on_drop() {
        let pool = buffer_pool(4, 32);
        {
            let mut guard = pool.checkout();
            guard.extend_from_slice(b"abc");
            assert_eq!(&guard[..], b"abc");
            assert_eq!(pool.available(), 0);
        }
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.recycled(), 1);
        assert!(pool.checkout().is_empty());
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let pool = buffer_pool(8, 128);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        let mut guard = pool.checkout();
                        guard.push(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker thread should not panic");
        }
        assert!(pool.available() <= pool.capacity());
        assert_eq!(pool.recycled() + pool.discarded(), 4000);
    }

    #[test]
    #[should_panic(expected = "Pool capacity must be at least 1")]
    fn test_zero_capacity_panics() {
        let _ = buffer_pool(0, 16);
    }
}
