// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use crate::core::error::Result;
use crate::core::frames::Tensor;

/// A loaded network.
///
/// The handle is read-only after loading and is shared by every subflow that
/// names the same model, so `run` takes `&self` and may be called from
/// several executor threads concurrently.
pub trait InferenceEngine: Send + Sync {
    fn run(&self, inputs: &[Tensor], outputs: &mut [Tensor]) -> Result<()>;
}
