//! Weakly-held observer registry
//!
//! The registry never keeps a subscriber alive. Subscribers whose owner has
//! dropped them are pruned on the next access.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Thread-safe set of weakly-held subscribers
pub struct ObserverRegistry<T: ?Sized> {
    subscribers: Mutex<Vec<Weak<T>>>,
}

impl<T: ?Sized> ObserverRegistry<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Weak<T>>> {
        let mut entries = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        entries.retain(|weak| weak.strong_count() > 0);
        entries
    }

    /// Register a subscriber. Adding the same subscriber twice is a no-op.
    pub fn add(&self, subscriber: &Arc<T>) {
        let mut entries = self.entries();
        if !entries
            .iter()
            .any(|weak| std::ptr::addr_eq(weak.as_ptr(), Arc::as_ptr(subscriber)))
        {
            entries.push(Arc::downgrade(subscriber));
        }
    }

    /// Unregister a subscriber
    pub fn remove(&self, subscriber: &Arc<T>) {
        self.entries()
            .retain(|weak| !std::ptr::addr_eq(weak.as_ptr(), Arc::as_ptr(subscriber)));
    }

    pub fn remove_all(&self) {
        self.entries().clear();
    }

    /// Whether no live subscriber remains
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Number of live subscribers
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Invoke `notify` once for every live subscriber.
    ///
    /// Callbacks run after the lock is released, so a subscriber may add or
    /// remove subscribers from inside its callback.
    pub fn publish(&self, mut notify: impl FnMut(&T)) {
        let live: Vec<Arc<T>> = self.entries().iter().filter_map(Weak::upgrade).collect();
        for subscriber in &live {
            notify(&**subscriber);
        }
    }
}

impl<T: ?Sized> Default for ObserverRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Listener: Send + Sync {
        fn heard(&self, value: usize);
    }

    #[derive(Default)]
    struct Counter {
        total: AtomicUsize,
        calls: AtomicUsize,
    }

    impl Listener for Counter {
        fn heard(&self, value: usize) {
            self.total.fetch_add(value, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_publish_reaches_each_subscriber_once() {
        let registry: ObserverRegistry<dyn Listener> = ObserverRegistry::new();
        let a = Arc::new(Counter::default());
        let b = Arc::new(Counter::default());
        let a_dyn: Arc<dyn Listener> = a.clone();
        let b_dyn: Arc<dyn Listener> = b.clone();

        registry.add(&a_dyn);
        registry.add(&a_dyn);
        registry.add(&b_dyn);
        registry.publish(|l| l.heard(5));

        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.total.load(Ordering::SeqCst), 5);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_dropped_subscriber_is_skipped() {
        let registry: ObserverRegistry<dyn Listener> = ObserverRegistry::new();
        let kept = Arc::new(Counter::default());
        let kept_dyn: Arc<dyn Listener> = kept.clone();
        registry.add(&kept_dyn);
        {
            let transient: Arc<dyn Listener> = Arc::new(Counter::default());
            registry.add(&transient);
            assert_eq!(registry.len(), 2);
        }

        registry.publish(|l| l.heard(1));
        assert_eq!(kept.calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_does_not_extend_lifetime() {
        let registry: ObserverRegistry<Counter> = ObserverRegistry::new();
        let counter = Arc::new(Counter::default());
        registry.add(&counter);
        assert_eq!(Arc::strong_count(&counter), 1);
        drop(counter);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_and_remove_all() {
        let registry: ObserverRegistry<Counter> = ObserverRegistry::new();
        let a = Arc::new(Counter::default());
        let b = Arc::new(Counter::default());
        registry.add(&a);
        registry.add(&b);

        registry.remove(&a);
        registry.publish(|c| c.heard(1));
        assert_eq!(a.calls.load(Ordering::SeqCst), 0);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);

        registry.remove_all();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_mutation() {
        let registry = Arc::new(ObserverRegistry::<Counter>::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let c = Arc::new(Counter::default());
                        registry.add(&c);
                        registry.publish(|c| c.heard(1));
                        registry.remove(&c);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(registry.is_empty());
    }
}
