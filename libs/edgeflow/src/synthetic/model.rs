// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Model loader and engine that produce deterministic tensors.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::core::error::{EdgeFlowError, Result};
use crate::core::frames::{DType, Tensor, TensorDesc};
use crate::core::processing::TaskType;
use crate::core::traits::{InferenceEngine, LoadedModel, ModelLoadRequest, ModelLoader, PreProcessParams};

const NUM_CLASSES: usize = 10;
const DETECTION_ROWS: usize = 4;
const POSE_KEYPOINTS: usize = 17;
const MASK_CLASSES: usize = 3;
const MASK_SIZE: usize = 8;

/// Hands out [`SyntheticEngine`]s with a `[1, 3, h, w]` u8 input.
pub struct SyntheticModelLoader {
    input_width: u32,
    input_height: u32,
    default_task: TaskType,
    tasks: HashMap<String, TaskType>,
    failing: HashSet<String>,
    loads: AtomicUsize,
    loaded_paths: Mutex<Vec<String>>,
}

impl SyntheticModelLoader {
    pub fn new(input_width: u32, input_height: u32) -> Self {
        Self {
            input_width,
            input_height,
            default_task: TaskType::Classification,
            tasks: HashMap::new(),
            failing: HashSet::new(),
            loads: AtomicUsize::new(0),
            loaded_paths: Mutex::new(Vec::new()),
        }
    }

    /// Report `task` for the artifact at `model_path`.
    pub fn with_task(mut self, model_path: impl Into<String>, task: TaskType) -> Self {
        self.tasks.insert(model_path.into(), task);
        self
    }

    /// Fail every load of `model_path`.
    pub fn with_failure(mut self, model_path: impl Into<String>) -> Self {
        self.failing.insert(model_path.into());
        self
    }

    /// Bytes of one pre-processed unit.
    pub fn input_len(&self) -> usize {
        3 * self.input_width as usize * self.input_height as usize
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn loaded_paths(&self) -> Vec<String> {
        self.loaded_paths.lock().clone()
    }

    fn output_descs(&self, task: TaskType) -> Vec<TensorDesc> {
        let shape = match task {
            TaskType::Classification => vec![1, NUM_CLASSES],
            TaskType::Detection => vec![1, DETECTION_ROWS, 6],
            TaskType::Segmentation => vec![1, MASK_CLASSES, MASK_SIZE, MASK_SIZE],
            TaskType::Pose => vec![1, DETECTION_ROWS, 5 + 3 * POSE_KEYPOINTS],
        };
        vec![TensorDesc::new("output0", DType::F32, shape)]
    }
}

impl ModelLoader for SyntheticModelLoader {
    fn load(&self, request: &ModelLoadRequest) -> Result<LoadedModel> {
        if self.failing.contains(&request.model_path) {
            return Err(EdgeFlowError::ModelLoad(format!(
                "{}: artifact unreadable",
                request.model_path
            )));
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.loaded_paths.lock().push(request.model_path.clone());

        let task = self
            .tasks
            .get(&request.model_path)
            .copied()
            .unwrap_or(self.default_task);
        let input = TensorDesc::new(
            "input0",
            DType::U8,
            vec![1, 3, self.input_height as usize, self.input_width as usize],
        );

        Ok(LoadedModel {
            engine: Arc::new(SyntheticEngine::new(task, self.input_width, self.input_height)),
            task_type: task,
            input,
            outputs: self.output_descs(task),
            preprocess: PreProcessParams {
                width: self.input_width,
                height: self.input_height,
                mean: vec![0.0; 3],
                scale: vec![1.0; 3],
                data_layout: "NCHW".to_string(),
            },
            class_names: (0..NUM_CLASSES).map(|i| format!("class{}", i)).collect(),
            core_id: request.core_id,
        })
    }
}

/// Fills output tensors with values that depend only on the task and the
/// number of previous runs.
#[derive(Debug)]
pub struct SyntheticEngine {
    task: TaskType,
    width: f32,
    height: f32,
    runs: AtomicU64,
}

impl SyntheticEngine {
    pub fn new(task: TaskType, input_width: u32, input_height: u32) -> Self {
        Self {
            task,
            width: input_width as f32,
            height: input_height as f32,
            runs: AtomicU64::new(0),
        }
    }

    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    fn detection_row(&self, row: usize) -> [f32; 5] {
        let step = row as f32 / DETECTION_ROWS as f32;
        [
            self.width * step * 0.5,
            self.height * step * 0.5,
            self.width * (0.5 + step * 0.5),
            self.height * (0.5 + step * 0.5),
            0.9 - 0.2 * row as f32,
        ]
    }

    fn fill(&self, desc: &TensorDesc, run: u64) -> Vec<f32> {
        let count = desc.element_count();
        match self.task {
            TaskType::Classification => (0..count)
                .map(|i| ((i as u64 * 7 + run) % NUM_CLASSES as u64) as f32 / NUM_CLASSES as f32)
                .collect(),
            TaskType::Detection => (0..DETECTION_ROWS)
                .flat_map(|row| {
                    let mut values = self.detection_row(row).to_vec();
                    values.push(row as f32);
                    values
                })
                .collect(),
            TaskType::Segmentation => {
                let plane = MASK_SIZE * MASK_SIZE;
                (0..count)
                    .map(|i| {
                        let channel = i / plane;
                        let pixel = i % plane;
                        if (pixel + run as usize) % MASK_CLASSES == channel {
                            1.0
                        } else {
                            0.0
                        }
                    })
                    .collect()
            }
            TaskType::Pose => (0..DETECTION_ROWS)
                .flat_map(|row| {
                    let header = self.detection_row(row);
                    let mut values = header.to_vec();
                    for k in 0..POSE_KEYPOINTS {
                        let t = k as f32 / POSE_KEYPOINTS as f32;
                        values.push(header[0] + (header[2] - header[0]) * t);
                        values.push(header[1] + (header[3] - header[1]) * t);
                        values.push(if k % 2 == 0 { 0.8 } else { 0.3 });
                    }
                    values
                })
                .collect(),
        }
    }
}

impl InferenceEngine for SyntheticEngine {
    fn run(&self, inputs: &[Tensor], outputs: &mut [Tensor]) -> Result<()> {
        let input = inputs
            .first()
            .ok_or_else(|| EdgeFlowError::Inference("No input tensor".to_string()))?;
        if input.bytes().len() != input.desc().size_bytes() {
            return Err(EdgeFlowError::Inference(format!(
                "Input '{}' is not populated ({} of {} bytes)",
                input.desc().name,
                input.bytes().len(),
                input.desc().size_bytes()
            )));
        }

        let run = self.runs.fetch_add(1, Ordering::SeqCst);
        for output in outputs.iter_mut() {
            let values = self.fill(output.desc(), run);
            output.write_f32(&values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &str) -> ModelLoadRequest {
        ModelLoadRequest {
            model_path: path.to_string(),
            labels_path: None,
            core_id: 1,
        }
    }

    #[test]
    fn test_load_counts_and_shapes() {
        let loader = SyntheticModelLoader::new(4, 2).with_task("/m/ssd", TaskType::Detection);
        let model = loader.load(&request("/m/ssd")).unwrap();
        assert_eq!(model.task_type, TaskType::Detection);
        assert_eq!(model.input.size_bytes(), loader.input_len());
        assert_eq!(model.outputs[0].shape, vec![1, DETECTION_ROWS, 6]);
        assert_eq!(model.core_id, 1);
        assert_eq!(loader.load_count(), 1);
        assert_eq!(loader.loaded_paths(), vec!["/m/ssd".to_string()]);
    }

    #[test]
    fn test_failing_artifact() {
        let loader = SyntheticModelLoader::new(4, 2).with_failure("/m/broken");
        assert!(matches!(
            loader.load(&request("/m/broken")),
            Err(EdgeFlowError::ModelLoad(_))
        ));
        assert_eq!(loader.load_count(), 0);
    }

    #[test]
    fn test_engine_rejects_unpopulated_input() {
        let loader = SyntheticModelLoader::new(4, 2);
        let model = loader.load(&request("/m/cls")).unwrap();
        let inputs = vec![Tensor::unallocated(model.input.clone())];
        let mut outputs = vec![Tensor::allocated(model.outputs[0].clone())];
        assert!(model.engine.run(&inputs, &mut outputs).is_err());
    }

    #[test]
    fn test_engine_is_deterministic() {
        let desc = TensorDesc::new("input0", DType::U8, vec![1, 3, 2, 4]);
        let inputs = vec![Tensor::allocated(desc)];
        let out_desc = TensorDesc::new("output0", DType::F32, vec![1, NUM_CLASSES]);

        let a = SyntheticEngine::new(TaskType::Classification, 4, 2);
        let b = SyntheticEngine::new(TaskType::Classification, 4, 2);
        let mut out_a = vec![Tensor::allocated(out_desc.clone())];
        let mut out_b = vec![Tensor::allocated(out_desc)];
        a.run(&inputs, &mut out_a).unwrap();
        b.run(&inputs, &mut out_b).unwrap();
        assert_eq!(out_a[0].to_f32_vec(), out_b[0].to_f32_vec());
        assert_eq!(a.runs(), 1);
    }
}
