use std::sync::{Mutex, PoisonError};

use domain::firewall::entity::BufferHandle;
use ports::secondary::buffer_pool_port::BufferPoolPort;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("network buffer pool exhausted ({capacity} descriptors in use)")]
    Exhausted { capacity: usize },
}

#[derive(Debug)]
struct PoolState {
    /// Free descriptor numbers, popped from the back.
    free: Vec<u32>,
    in_use: Vec<bool>,
}

/// Fixed-capacity pool of network buffer descriptors.
///
/// Hands out [`BufferHandle`]s and takes them back through
/// [`BufferPoolPort::release`], which is what the filter calls for every
/// dropped packet.
#[derive(Debug)]
pub struct NetworkBufferPool {
    state: Mutex<PoolState>,
    capacity: usize,
}

impl NetworkBufferPool {
    /// Create a pool of `capacity` descriptors, numbered `0..capacity`.
    ///
    /// Descriptors are `u32`, so `capacity` is clamped to `u32::MAX`.
    pub fn new(capacity: usize) -> Self {
        let count = u32::try_from(capacity).unwrap_or(u32::MAX);
        let free: Vec<u32> = (0..count).rev().collect();
        let capacity = free.len();
        Self {
            state: Mutex::new(PoolState {
                free,
                in_use: vec![false; capacity],
            }),
            capacity,
        }
    }

    /// Take a free descriptor.
    pub fn acquire(&self) -> Result<BufferHandle, PoolError> {
        let mut state = self.lock();
        let index = state.free.pop().ok_or(PoolError::Exhausted {
            capacity: self.capacity,
        })?;
        state.in_use[index as usize] = true;
        Ok(BufferHandle(index))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.lock().free.len()
    }

    pub fn outstanding(&self) -> usize {
        self.capacity - self.available()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BufferPoolPort for NetworkBufferPool {
    fn release(&self, buffer: BufferHandle) {
        let mut state = self.lock();
        let index = buffer.0;
        match state.in_use.get_mut(index as usize) {
            Some(slot) if *slot => {
                *slot = false;
                state.free.push(index);
            }
            _ => warn!(buffer = index, "release of a buffer that is not outstanding ignored"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_until_exhausted() {
        let pool = NetworkBufferPool::new(2);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_ne!(a, b);
        assert_eq!(pool.outstanding(), 2);
        assert_eq!(pool.acquire(), Err(PoolError::Exhausted { capacity: 2 }));
    }

    #[test]
    fn handles_are_handed_out_lowest_first() {
        let pool = NetworkBufferPool::new(3);
        assert_eq!(pool.acquire().unwrap(), BufferHandle(0));
        assert_eq!(pool.acquire().unwrap(), BufferHandle(1));
    }

    #[test]
    fn release_returns_descriptor() {
        let pool = NetworkBufferPool::new(1);
        let h = pool.acquire().unwrap();
        assert_eq!(pool.available(), 0);
        pool.release(h);
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.acquire().unwrap(), BufferHandle(0));
    }

    #[test]
    fn double_release_is_ignored() {
        let pool = NetworkBufferPool::new(2);
        let h = pool.acquire().unwrap();
        pool.release(h);
        pool.release(BufferHandle(0));
        assert_eq!(pool.available(), 2);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn foreign_handle_is_ignored() {
        let pool = NetworkBufferPool::new(2);
        pool.release(BufferHandle(99));
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn zero_capacity_pool_is_always_exhausted() {
        let pool = NetworkBufferPool::new(0);
        assert!(pool.acquire().is_err());
        assert_eq!(pool.capacity(), 0);
    }
}
