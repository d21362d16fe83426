//! Scratch object pools.
//!
//! Effects need short-lived masks and planes on every tile. Pools keep the
//! allocations around between calls and hand out RAII guards: the object
//! goes back to the pool when the guard drops, so a returned object cannot
//! be touched again by the borrower.

use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;

use crate::raster::{CoverageMask, PixelFormat, RasterPlane};

/// Objects that can be recycled through an `ObjectPool`.
pub trait Poolable: Default + Send {
    /// Bring a returned object back to its pristine state.
    fn reset(&mut self);
}

impl Poolable for CoverageMask {
    fn reset(&mut self) {
        self.clear();
    }
}

impl Poolable for RasterPlane {
    fn reset(&mut self) {
        self.reinit(PixelFormat::default());
    }
}

/// Thread-safe free list. Each checkout gets a distinct instance.
pub struct ObjectPool<T: Poolable> {
    free: Mutex<Vec<T>>,
    limit: usize,
}

impl<T: Poolable> Default for ObjectPool<T> {
    fn default() -> Self {
        ObjectPool::with_limit(16)
    }
}

impl<T: Poolable> ObjectPool<T> {
    /// Pool retaining at most `limit` idle objects.
    pub fn with_limit(limit: usize) -> Self {
        ObjectPool {
            free: Mutex::new(Vec::new()),
            limit,
        }
    }

    pub fn checkout(&self) -> PoolGuard<'_, T> {
        let item = self.free.lock().pop().unwrap_or_default();
        PoolGuard {
            pool: self,
            item: Some(item),
        }
    }

    /// Number of idle objects.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn give_back(&self, mut item: T) {
        item.reset();
        let mut free = self.free.lock();
        if free.len() < self.limit {
            free.push(item);
        }
    }
}

/// Scoped handle to a pooled object.
pub struct PoolGuard<'a, T: Poolable> {
    pool: &'a ObjectPool<T>,
    item: Option<T>,
}

impl<T: Poolable> Deref for PoolGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `drop` takes the item out.
        match &self.item {
            Some(item) => item,
            None => unreachable!("pool guard used after release"),
        }
    }
}

impl<T: Poolable> DerefMut for PoolGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.item {
            Some(item) => item,
            None => unreachable!("pool guard used after release"),
        }
    }
}

impl<T: Poolable> Drop for PoolGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.give_back(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    #[test]
    fn test_guard_returns_reset_object() {
        let pool: ObjectPool<CoverageMask> = ObjectPool::default();
        {
            let mut mask = pool.checkout();
            mask.fill(Rect::new(0, 0, 4, 4), 255);
            assert_eq!(pool.idle(), 0);
        }
        assert_eq!(pool.idle(), 1);
        let mask = pool.checkout();
        assert!(mask.is_empty());
        assert_eq!(mask.extent(), Rect::default());
    }

    #[test]
    fn test_concurrent_checkouts_are_distinct() {
        let pool: ObjectPool<CoverageMask> = ObjectPool::default();
        let mut a = pool.checkout();
        let b = pool.checkout();
        a.fill(Rect::new(0, 0, 1, 1), 9);
        assert_eq!(b.pixel(0, 0), 0);
    }

    #[test]
    fn test_limit_caps_idle_objects() {
        let pool: ObjectPool<RasterPlane> = ObjectPool::with_limit(1);
        {
            let _a = pool.checkout();
            let _b = pool.checkout();
        }
        assert_eq!(pool.idle(), 1);
    }
}
