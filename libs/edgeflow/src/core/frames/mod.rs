// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod frame_buffer;
mod tensor;

pub use frame_buffer::{FrameBuffer, Ownership, WorkUnit};
pub use tensor::{DType, Tensor, TensorDesc};
