// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Serialized stream-position changes on a shared input.

use parking_lot::Mutex;

use crate::core::error::Result;

/// One per input. Every subflow reading the input shares it, so at most one
/// position reset is in flight at a time, and unrelated inputs never contend.
#[derive(Debug)]
pub struct SharedInputCoordinator {
    input: String,
    /// Number of completed resets.
    generation: Mutex<u64>,
}

impl SharedInputCoordinator {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            generation: Mutex::new(0),
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Resets completed so far. Read this before a pull to detect a reset
    /// made by a sibling in the meantime.
    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    /// Run `seek` while holding the input's lock.
    pub fn with_exclusive_seek_access<F, R>(&self, seek: F) -> Result<R>
    where
        F: FnOnce() -> Result<R>,
    {
        let mut generation = self.generation.lock();
        let value = seek()?;
        *generation += 1;
        Ok(value)
    }

    /// Reset the input unless a sibling already did so since `observed`.
    ///
    /// Returns `true` if this call ran `seek`. Either way the caller's next
    /// pull starts from the rewound position.
    pub fn reset_once<F>(&self, observed: u64, seek: F) -> Result<bool>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut generation = self.generation.lock();
        if *generation != observed {
            tracing::debug!(
                "[{}] Reset already done by another subflow (generation {})",
                self.input,
                *generation
            );
            return Ok(false);
        }
        seek()?;
        *generation += 1;
        tracing::debug!("[{}] Rewound to start (generation {})", self.input, *generation);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_stale_observer_skips_seek() {
        let coord = SharedInputCoordinator::new("cam");
        let observed = coord.generation();
        assert!(coord.reset_once(observed, || Ok(())).unwrap());
        assert!(!coord.reset_once(observed, || panic!("second seek")).unwrap());
        assert_eq!(coord.generation(), 1);
    }

    #[test]
    fn test_failed_seek_does_not_advance_generation() {
        let coord = SharedInputCoordinator::new("cam");
        let result = coord.reset_once(0, || {
            Err(crate::core::error::EdgeFlowError::RuntimeIo("seek failed".into()))
        });
        assert!(result.is_err());
        assert_eq!(coord.generation(), 0);
    }

    #[test]
    fn test_exclusive_access_under_contention() {
        let coord = Arc::new(SharedInputCoordinator::new("cam"));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let coord = Arc::clone(&coord);
                let in_flight = Arc::clone(&in_flight);
                let max_seen = Arc::clone(&max_seen);
                std::thread::spawn(move || {
                    for _ in 0..20 {
                        coord
                            .with_exclusive_seek_access(|| {
                                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                                max_seen.fetch_max(now, Ordering::SeqCst);
                                std::thread::sleep(Duration::from_micros(50));
                                in_flight.fetch_sub(1, Ordering::SeqCst);
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(coord.generation(), 160);
    }
}
