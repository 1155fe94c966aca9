//! Lock-free `f64` accumulator.

use std::sync::atomic::{AtomicU64, Ordering};

/// An `f64` stored as its bit pattern in an [`AtomicU64`].
///
/// `fetch_add` is a compare-and-swap loop, so concurrent adds are never lost.
#[derive(Debug, Default)]
pub(crate) struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub(crate) fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }

    /// Add `delta` and return the previous value.
    pub(crate) fn fetch_add(&self, delta: f64) -> f64 {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(prev) => return f64::from_bits(prev),
                Err(actual) => current = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zero() {
        assert_eq!(AtomicF64::default().load(), 0.0);
    }

    #[test]
    fn fetch_add_returns_previous() {
        let a = AtomicF64::default();
        assert_eq!(a.fetch_add(1.5), 0.0);
        assert_eq!(a.fetch_add(2.5), 1.5);
        assert_eq!(a.load(), 4.0);
    }

    #[test]
    fn concurrent_adds_are_not_lost() {
        let a = AtomicF64::default();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1_000 {
                        a.fetch_add(1.0);
                    }
                });
            }
        });
        // Integers below 2^53 add exactly.
        assert_eq!(a.load(), 8_000.0);
    }

    #[test]
    fn store_overwrites() {
        let a = AtomicF64::default();
        a.fetch_add(3.0);
        a.store(0.0);
        assert_eq!(a.load(), 0.0);
    }
}
