//! Pool of reusable render targets.
//!
//! A buffer is handed out under a [`ScratchLease`] guard and returns to the
//! pool when the guard drops. Leased buffers are cleared before use, and
//! callers copy results out before releasing the lease, so no rendering ever
//! aliases a pooled buffer.

use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;

use crate::core::{NO_DEPTH, Rgb};

/// Render target buffers.
pub struct ScratchBuffers {
    /// Depth buffer (millimeters)
    pub depth: Vec<u16>,
    /// Color buffer
    pub color: Vec<Rgb>,
}

impl ScratchBuffers {
    /// Create buffers for `pixels` pixels.
    pub fn new(pixels: usize) -> Self {
        Self {
            depth: vec![NO_DEPTH; pixels],
            color: vec![[0, 0, 0]; pixels],
        }
    }

    fn detached() -> Self {
        Self {
            depth: Vec::new(),
            color: Vec::new(),
        }
    }

    /// Overwrite every pixel with the cleared value.
    pub fn clear(&mut self) {
        self.depth.fill(NO_DEPTH);
        self.color.fill([0, 0, 0]);
    }
}

/// Thread-safe pool of [`ScratchBuffers`].
pub struct ScratchPool {
    pixels: usize,
    free: Mutex<Vec<ScratchBuffers>>,
}

impl ScratchPool {
    /// Create an empty pool for images of `pixels` pixels.
    pub fn new(pixels: usize) -> Self {
        Self {
            pixels,
            free: Mutex::new(Vec::new()),
        }
    }

    /// Lease a cleared buffer, allocating if the pool is empty.
    pub fn lease(&self) -> ScratchLease<'_> {
        let mut buffers = self
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| ScratchBuffers::new(self.pixels));
        buffers.clear();
        ScratchLease {
            pool: self,
            buffers,
        }
    }

    /// Number of idle buffers
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

/// Exclusive use of one pooled buffer.
pub struct ScratchLease<'a> {
    pool: &'a ScratchPool,
    buffers: ScratchBuffers,
}

impl Deref for ScratchLease<'_> {
    type Target = ScratchBuffers;

    fn deref(&self) -> &ScratchBuffers {
        &self.buffers
    }
}

impl DerefMut for ScratchLease<'_> {
    fn deref_mut(&mut self) -> &mut ScratchBuffers {
        &mut self.buffers
    }
}

impl Drop for ScratchLease<'_> {
    fn drop(&mut self) {
        let buffers = std::mem::replace(&mut self.buffers, ScratchBuffers::detached());
        self.pool.free.lock().push(buffers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_returns_to_pool() {
        let pool = ScratchPool::new(4);
        {
            let _a = pool.lease();
            let _b = pool.lease();
            assert_eq!(pool.idle(), 0);
        }
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn test_reused_buffer_is_cleared() {
        let pool = ScratchPool::new(4);
        {
            let mut lease = pool.lease();
            lease.depth[2] = 500;
            lease.color[2] = [9, 9, 9];
        }
        let lease = pool.lease();
        assert!(lease.depth.iter().all(|&d| d == NO_DEPTH));
        assert!(lease.color.iter().all(|&c| c == [0, 0, 0]));
    }
}
