// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt::Write as _;

use crate::core::debug::DebugDump;
use crate::core::error::{EdgeFlowError, Result};
use crate::core::frames::{FrameBuffer, Tensor, TensorDesc};

/// Moves a pre-processed capture unit into the model's input tensor.
///
/// In zero-copy mode the tensor aliases the unit's memory and must be
/// detached with [`Preprocessor::finish`] before the unit is released.
#[derive(Debug)]
pub struct Preprocessor {
    zero_copy: bool,
    debug: DebugDump,
}

impl Preprocessor {
    pub fn new(zero_copy: bool, debug: DebugDump) -> Self {
        Self { zero_copy, debug }
    }

    pub fn zero_copy(&self) -> bool {
        self.zero_copy
    }

    /// The input tensor this mode needs: unallocated for zero-copy,
    /// an owned allocation otherwise.
    pub fn input_tensor(&self, desc: TensorDesc) -> Tensor {
        if self.zero_copy {
            Tensor::unallocated(desc)
        } else {
            Tensor::allocated(desc)
        }
    }

    pub fn apply(&mut self, frame: &FrameBuffer, input: &mut Tensor) -> Result<()> {
        if self.zero_copy {
            let bytes = frame.shared_bytes().ok_or_else(|| {
                EdgeFlowError::InvalidState(format!(
                    "Zero-copy input needs a borrowed frame, got {}",
                    frame.ownership()
                ))
            })?;
            input.alias(bytes)?;
        } else {
            input.copy_from(frame.data())?;
        }

        self.debug.log_and_advance(|| render_bytes(input.bytes()))
    }

    /// Detach the input tensor from the capture unit.
    pub fn finish(&self, input: &mut Tensor) {
        if self.zero_copy {
            input.drop_alias();
        }
    }
}

fn render_bytes(bytes: &[u8]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "bytes {}", bytes.len());
    for row in bytes.chunks(16).take(16) {
        let line: Vec<String> = row.iter().map(|b| format!("{:02x}", b)).collect();
        let _ = writeln!(out, "{}", line.join(" "));
    }
    out
}
