// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Seams to the external collaborators: the media pipeline, the inference
//! engine, the model artifact loader and the overlay painter.

mod inference_engine;
mod media_pipeline;
mod model_loader;
mod overlay_painter;

pub use inference_engine::InferenceEngine;
pub use media_pipeline::{MediaPipeline, PullOutcome};
pub use model_loader::{LoadedModel, ModelLoadRequest, ModelLoader, PreProcessParams};
pub use overlay_painter::{BoundingBox, Keypoint, Overlay, OverlayPainter};
