// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::InferenceEngine;
use crate::core::error::Result;
use crate::core::frames::TensorDesc;
use crate::core::processing::TaskType;

/// What the registry asks a loader for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelLoadRequest {
    pub model_path: String,
    pub labels_path: Option<String>,
    /// Inference core picked round-robin by the registry.
    pub core_id: u32,
}

/// Pre-processing parameters recorded in the model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreProcessParams {
    pub width: u32,
    pub height: u32,
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
    /// `NCHW` or `NHWC`.
    pub data_layout: String,
}

/// A model artifact after loading.
#[derive(Clone)]
pub struct LoadedModel {
    pub engine: Arc<dyn InferenceEngine>,
    pub task_type: TaskType,
    /// Single input tensor.
    pub input: TensorDesc,
    pub outputs: Vec<TensorDesc>,
    pub preprocess: PreProcessParams,
    /// Class index to display label.
    pub class_names: Vec<String>,
    pub core_id: u32,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("task_type", &self.task_type)
            .field("input", &self.input)
            .field("outputs", &self.outputs)
            .field("preprocess", &self.preprocess)
            .field("class_names", &self.class_names.len())
            .field("core_id", &self.core_id)
            .finish_non_exhaustive()
    }
}

impl LoadedModel {
    pub fn class_label(&self, index: usize) -> String {
        self.class_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("class {}", index))
    }
}

/// Parses on-disk model artifacts.
pub trait ModelLoader: Send + Sync {
    fn load(&self, request: &ModelLoadRequest) -> Result<LoadedModel>;
}
