// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out inference core ids round-robin as models are loaded.
#[derive(Debug)]
pub struct TargetAllocator {
    core_ids: Vec<u32>,
    next: AtomicUsize,
}

impl TargetAllocator {
    pub fn new(core_ids: Vec<u32>) -> Self {
        let core_ids = if core_ids.is_empty() { vec![0] } else { core_ids };
        Self {
            core_ids,
            next: AtomicUsize::new(0),
        }
    }

    pub fn next_core(&self) -> u32 {
        let slot = self.next.fetch_add(1, Ordering::Relaxed) % self.core_ids.len();
        self.core_ids[slot]
    }

    pub fn core_ids(&self) -> &[u32] {
        &self.core_ids
    }
}

impl Default for TargetAllocator {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        let alloc = TargetAllocator::new(vec![1, 2, 3]);
        let picked: Vec<u32> = (0..5).map(|_| alloc.next_core()).collect();
        assert_eq!(picked, vec![1, 2, 3, 1, 2]);
    }

    #[test]
    fn test_empty_list_falls_back_to_core_zero() {
        let alloc = TargetAllocator::new(Vec::new());
        assert_eq!(alloc.next_core(), 0);
        assert_eq!(alloc.next_core(), 0);
    }
}
