// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::core::error::{EdgeFlowError, Result};
use crate::core::frames::FrameBuffer;
use crate::core::traits::{Overlay, OverlayPainter};

/// Marks painted frames and keeps the most recent overlay list.
#[derive(Debug, Default)]
pub struct RecordingPainter {
    painted: AtomicUsize,
    last: Mutex<Vec<Overlay>>,
}

impl RecordingPainter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paint_count(&self) -> usize {
        self.painted.load(Ordering::SeqCst)
    }

    pub fn last_overlays(&self) -> Vec<Overlay> {
        self.last.lock().clone()
    }
}

impl OverlayPainter for RecordingPainter {
    fn paint(&self, frame: &mut FrameBuffer, overlays: &[Overlay]) -> Result<()> {
        let ownership = frame.ownership();
        let pixels = frame.data_mut().ok_or_else(|| {
            EdgeFlowError::InvalidState(format!("Cannot paint into a {} frame", ownership))
        })?;
        if let Some(first) = pixels.first_mut() {
            *first = overlays.len().min(u8::MAX as usize) as u8;
        }

        *self.last.lock() = overlays.to_vec();
        self.painted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
