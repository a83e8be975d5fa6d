// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Ownership-tracked frame handles.

use bytes::Bytes;

/// One unit of capture data handed out by a media pipeline endpoint.
///
/// `data` is reference counted: cloning a unit or borrowing it into a
/// [`FrameBuffer`] never copies pixels.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    /// Position of this unit in its stream, counted from 0 after each seek.
    pub sequence: u64,
}

impl WorkUnit {
    pub fn new(data: Bytes, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            data,
            width,
            height,
            sequence,
        }
    }
}

/// Who owns the memory behind a [`FrameBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Never acquired.
    Unacquired,
    /// Aliases memory owned by the upstream pipeline.
    BorrowedZeroCopy,
    /// Holds a private allocation.
    OwnedAllocated,
    /// Terminal state after [`FrameBuffer::release`].
    Released,
}

impl std::fmt::Display for Ownership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ownership::Unacquired => write!(f, "Unacquired"),
            Ownership::BorrowedZeroCopy => write!(f, "BorrowedZeroCopy"),
            Ownership::OwnedAllocated => write!(f, "OwnedAllocated"),
            Ownership::Released => write!(f, "Released"),
        }
    }
}

#[derive(Debug)]
enum FrameStorage {
    Empty,
    Borrowed(Bytes),
    Owned(Vec<u8>),
}

/// Handle to a frame's pixels with an explicit release point.
///
/// A borrowed buffer keeps the upstream unit's memory alive until it is
/// released, so callers must release before handing the unit back.
#[derive(Debug)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    ownership: Ownership,
    storage: FrameStorage,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::unacquired()
    }
}

impl FrameBuffer {
    pub fn unacquired() -> Self {
        Self {
            width: 0,
            height: 0,
            ownership: Ownership::Unacquired,
            storage: FrameStorage::Empty,
        }
    }

    /// Alias the unit's memory without allocating.
    pub fn borrowed(unit: &WorkUnit) -> Self {
        Self {
            width: unit.width,
            height: unit.height,
            ownership: Ownership::BorrowedZeroCopy,
            storage: FrameStorage::Borrowed(unit.data.clone()),
        }
    }

    /// Copy the unit's memory into a private allocation.
    pub fn copied(unit: &WorkUnit) -> Self {
        Self {
            width: unit.width,
            height: unit.height,
            ownership: Ownership::OwnedAllocated,
            storage: FrameStorage::Owned(unit.data.to_vec()),
        }
    }

    /// A zero-filled private allocation of `len` bytes.
    pub fn allocate(width: u32, height: u32, len: usize) -> Self {
        Self {
            width,
            height,
            ownership: Ownership::OwnedAllocated,
            storage: FrameStorage::Owned(vec![0u8; len]),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn len(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pixels, or an empty slice once released.
    pub fn data(&self) -> &[u8] {
        match &self.storage {
            FrameStorage::Empty => &[],
            FrameStorage::Borrowed(bytes) => bytes,
            FrameStorage::Owned(vec) => vec,
        }
    }

    /// Mutable pixels. Only owned buffers are writable.
    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.storage {
            FrameStorage::Owned(vec) => Some(vec.as_mut_slice()),
            _ => None,
        }
    }

    /// The aliased upstream memory of a zero-copy buffer.
    pub fn shared_bytes(&self) -> Option<Bytes> {
        match &self.storage {
            FrameStorage::Borrowed(bytes) => Some(bytes.clone()),
            _ => None,
        }
    }

    /// Drop the storage. Safe to call any number of times, on any buffer.
    pub fn release(&mut self) {
        if self.ownership == Ownership::Released {
            return;
        }
        self.storage = FrameStorage::Empty;
        self.ownership = Ownership::Released;
    }
}

impl Drop for FrameBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(len: usize) -> WorkUnit {
        WorkUnit::new(Bytes::from(vec![7u8; len]), 4, 2, 0)
    }

    #[test]
    fn test_borrowed_aliases_without_copy() {
        let unit = unit(24);
        let frame = FrameBuffer::borrowed(&unit);
        assert_eq!(frame.ownership(), Ownership::BorrowedZeroCopy);
        assert_eq!(frame.data().as_ptr(), unit.data.as_ptr());
    }

    #[test]
    fn test_borrowed_is_read_only() {
        let mut frame = FrameBuffer::borrowed(&unit(24));
        assert!(frame.data_mut().is_none());
        assert!(frame.shared_bytes().is_some());
    }

    #[test]
    fn test_copied_owns_private_memory() {
        let unit = unit(24);
        let mut frame = FrameBuffer::copied(&unit);
        assert_eq!(frame.ownership(), Ownership::OwnedAllocated);
        assert_ne!(frame.data().as_ptr(), unit.data.as_ptr());

        frame.data_mut().unwrap()[0] = 1;
        assert_eq!(unit.data[0], 7);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut frame = FrameBuffer::copied(&unit(8));
        frame.release();
        frame.release();
        assert_eq!(frame.ownership(), Ownership::Released);
        assert!(frame.is_empty());
    }

    #[test]
    fn test_release_never_acquired() {
        let mut frame = FrameBuffer::default();
        assert_eq!(frame.ownership(), Ownership::Unacquired);
        frame.release();
        assert_eq!(frame.ownership(), Ownership::Released);
    }

    #[test]
    fn test_release_drops_alias() {
        let unit = unit(16);
        let mut frame = FrameBuffer::borrowed(&unit);
        frame.release();
        assert!(frame.shared_bytes().is_none());
        assert_eq!(unit.data.len(), 16);
    }

    #[test]
    fn test_scope_exit_releases_alias() {
        let unit = unit(16);
        {
            let frame = FrameBuffer::borrowed(&unit);
            assert!(!unit.data.is_unique());
            assert_eq!(frame.len(), 16);
        }
        assert!(unit.data.is_unique());

        let mut frame = FrameBuffer::borrowed(&unit);
        frame.release();
        drop(frame);
        assert!(unit.data.is_unique());
    }
}
