//! Generic pooled-object abstraction, shared by the fence, semaphore, and internal
//! command-buffer pools (§5).

use std::hash::Hash;
use std::sync::{Arc, Mutex};

use anyhow::Result;

/// An object that can be recycled through a [`Pool`].
pub trait Poolable: Sized {
    type Key: Clone + Hash + Eq;

    /// Reset internal state right before the object is returned to the pool.
    fn on_release(&mut self);
}

struct PoolInner<P: Poolable> {
    idle: Vec<P>,
    create: Box<dyn FnMut(&P::Key) -> Result<P> + Send>,
}

/// A pool of reusable `P`s, keyed by `P::Key` (e.g. a queue family index for command pools, or
/// `()` for fences/semaphores which are fungible). New-block-style acquisition: pop an idle
/// entry if one exists, otherwise call the pool's creation closure.
pub struct Pool<P: Poolable> {
    inner: Arc<Mutex<PoolInner<P>>>,
}

impl<P: Poolable> Clone for Pool<P> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<P: Poolable> Pool<P> {
    pub fn new(create: impl FnMut(&P::Key) -> Result<P> + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PoolInner {
                idle: Vec::new(),
                create: Box::new(create),
            })),
        }
    }

    /// Acquire a pooled object for `key`, wrapped so it is returned to this pool on drop.
    pub fn acquire(&self, key: P::Key) -> Result<Pooled<P>> {
        let item = {
            let mut inner = self.inner.lock().unwrap();
            match inner.idle.pop() {
                Some(item) => item,
                None => (inner.create)(&key)?,
            }
        };
        Ok(Pooled {
            item: Some(item),
            pool: self.clone(),
        })
    }

    pub fn idle_count(&self) -> usize {
        self.inner.lock().unwrap().idle.len()
    }

    fn release(&self, mut item: P) {
        item.on_release();
        self.inner.lock().unwrap().idle.push(item);
    }
}

/// A `P` on loan from a [`Pool`]. Returned to the pool automatically on drop.
pub struct Pooled<P: Poolable> {
    item: Option<P>,
    pool: Pool<P>,
}

impl<P: Poolable> std::ops::Deref for Pooled<P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.item.as_ref().expect("Pooled item taken before drop")
    }
}

impl<P: Poolable> std::ops::DerefMut for Pooled<P> {
    fn deref_mut(&mut self) -> &mut P {
        self.item.as_mut().expect("Pooled item taken before drop")
    }
}

impl<P: Poolable> Drop for Pooled<P> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.release(item);
        }
    }
}

impl<P: Poolable + std::fmt::Debug> std::fmt::Debug for Pooled<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pooled").field("item", &self.item).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Counter(u32);

    impl Poolable for Counter {
        type Key = ();

        fn on_release(&mut self) {
            self.0 = 0;
        }
    }

    #[test]
    fn acquiring_with_an_empty_pool_creates_a_fresh_item() {
        let pool: Pool<Counter> = Pool::new(|_| Ok(Counter(1)));
        let item = pool.acquire(()).unwrap();
        assert_eq!(item.0, 1);
    }

    #[test]
    fn dropping_returns_the_item_for_reuse() {
        let pool: Pool<Counter> = Pool::new(|_| Ok(Counter(7)));
        {
            let mut item = pool.acquire(()).unwrap();
            item.0 = 99;
        }
        assert_eq!(pool.idle_count(), 1);
        let item = pool.acquire(()).unwrap();
        assert_eq!(item.0, 0, "on_release should have reset state before reuse");
    }
}
