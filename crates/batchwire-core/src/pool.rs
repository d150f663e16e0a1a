use std::sync::{Mutex, PoisonError};

/// An explicit checkout/return pool for expensive-to-allocate objects.
///
/// The pool is mutex-guarded so codec instances on separate connections can
/// share it; a checked-out object is owned exclusively by its caller until
/// returned. The idle list is bounded, so returns beyond the cap drop the
/// object instead of retaining it.
pub struct ObjectPool<T> {
    idle: Mutex<Vec<T>>,
    max_idle: usize,
}

impl<T> ObjectPool<T> {
    /// Creates a pool retaining at most `max_idle` idle objects.
    ///
    /// `const` so pools can back process-wide statics.
    pub const fn new(max_idle: usize) -> Self {
        Self { idle: Mutex::new(Vec::new()), max_idle }
    }

    /// Takes an idle object from the pool, or builds a fresh one with `make`.
    pub fn checkout<F: FnOnce() -> T>(&self, make: F) -> T {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(make)
    }

    /// Returns an object to the pool for reuse.
    /// Dropped instead if the pool already holds `max_idle` objects.
    pub fn restore(&self, object: T) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(object);
        }
    }

    /// Returns the number of objects currently idle in the pool.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drops all idle objects.
    pub fn clear(&self) {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_and_restore() {
        let pool: ObjectPool<Vec<u8>> = ObjectPool::new(4);

        let buf = pool.checkout(|| Vec::with_capacity(64));
        assert!(buf.capacity() >= 64);
        assert_eq!(pool.idle_count(), 0);

        pool.restore(buf);
        assert_eq!(pool.idle_count(), 1);

        // Checkout again reuses the idle object rather than calling make.
        let reused = pool.checkout(|| panic!("should reuse idle object"));
        assert!(reused.capacity() >= 64);
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_max_idle_bound() {
        let pool: ObjectPool<Vec<u8>> = ObjectPool::new(2);

        for _ in 0..5 {
            pool.restore(Vec::new());
        }

        assert_eq!(pool.idle_count(), 2);
    }

    #[test]
    fn test_clear() {
        let pool: ObjectPool<Vec<u8>> = ObjectPool::new(8);

        for _ in 0..3 {
            pool.restore(Vec::new());
        }
        assert_eq!(pool.idle_count(), 3);

        pool.clear();
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_concurrent_checkout_is_exclusive() {
        use std::sync::Arc;
        use std::thread;

        let pool: Arc<ObjectPool<Box<u32>>> = Arc::new(ObjectPool::new(8));
        for i in 0..8 {
            pool.restore(Box::new(i));
        }

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = Arc::clone(&pool);
            handles.push(thread::spawn(move || {
                let object = pool.checkout(|| Box::new(100));
                let value = *object;
                pool.restore(object);
                value
            }));
        }

        for handle in handles {
            // No two threads may have seen the same pooled object at once;
            // each checkout either popped a distinct box or built a fresh one.
            let value = handle.join().unwrap();
            assert!(value <= 100);
        }
    }
}
