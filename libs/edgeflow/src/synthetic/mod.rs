// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Built-in collaborators that need no camera, accelerator or display.
//!
//! Used by the integration tests and by `edgeflow run`.

mod model;
mod painter;
mod pipeline;

pub use model::{SyntheticEngine, SyntheticModelLoader};
pub use painter::RecordingPainter;
pub use pipeline::{Delivery, SyntheticPipeline, SyntheticPipelineConfig};
