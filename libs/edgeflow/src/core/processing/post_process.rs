// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Turns raw model outputs into overlays for the sensor frame.

use std::sync::Arc;

use super::TaskKind;
use crate::core::debug::DebugDump;
use crate::core::error::{EdgeFlowError, Result};
use crate::core::frames::{FrameBuffer, Tensor};
use crate::core::graph::SensorRegion;
use crate::core::traits::{BoundingBox, Keypoint, Overlay, OverlayPainter};

/// Detection rows are `[x1, y1, x2, y2, score, class]`.
const DETECTION_ROW: usize = 6;
/// Pose rows are `[x1, y1, x2, y2, score]` followed by `(x, y, score)` triples.
const POSE_HEADER: usize = 5;
/// Mask pixels hold a `u8` class id.
const MAX_MASK_CLASSES: usize = 256;

pub struct PostProcessor {
    task: TaskKind,
    title: String,
    class_names: Vec<String>,
    /// Model input resolution; detections are scaled from it to `sensor`.
    model_input: (u32, u32),
    sensor: SensorRegion,
    painter: Arc<dyn OverlayPainter>,
    debug: DebugDump,
}

impl std::fmt::Debug for PostProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostProcessor")
            .field("task", &self.task)
            .field("title", &self.title)
            .field("model_input", &self.model_input)
            .field("sensor", &self.sensor)
            .finish_non_exhaustive()
    }
}

impl PostProcessor {
    pub fn new(
        task: TaskKind,
        title: String,
        class_names: Vec<String>,
        model_input: (u32, u32),
        sensor: SensorRegion,
        painter: Arc<dyn OverlayPainter>,
        debug: DebugDump,
    ) -> Self {
        Self {
            task,
            title,
            class_names,
            model_input,
            sensor,
            painter,
            debug,
        }
    }

    pub fn task(&self) -> TaskKind {
        self.task
    }

    /// Compute the overlays, paint them into `frame` and dump them.
    pub fn run(&mut self, outputs: &[Tensor], frame: &mut FrameBuffer) -> Result<()> {
        let overlays = self.overlays(outputs)?;
        self.painter.paint(frame, &overlays)?;
        self.debug.log_and_advance(|| {
            overlays
                .iter()
                .map(|o| format!("{}\n", o))
                .collect::<String>()
        })
    }

    /// What to draw for one set of model outputs. The title banner comes
    /// first.
    pub fn overlays(&self, outputs: &[Tensor]) -> Result<Vec<Overlay>> {
        let first = outputs
            .first()
            .ok_or_else(|| EdgeFlowError::Inference("Model produced no outputs".to_string()))?;

        let mut overlays = vec![Overlay::Title(self.title.clone())];
        match self.task {
            TaskKind::Classification { top_n } => {
                overlays.push(self.classify(first, top_n));
            }
            TaskKind::Detection { viz_threshold } => {
                overlays.extend(self.detect(first, viz_threshold)?);
            }
            TaskKind::Segmentation { alpha } => {
                overlays.push(self.segment(first, alpha)?);
            }
            TaskKind::Pose { viz_threshold } => {
                overlays.extend(self.pose(first, viz_threshold)?);
            }
        }
        Ok(overlays)
    }

    fn label(&self, index: usize) -> String {
        self.class_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("class {}", index))
    }

    fn classify(&self, scores: &Tensor, top_n: usize) -> Overlay {
        let values = scores.to_f32_vec();
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&a, &b| values[b].total_cmp(&values[a]).then(a.cmp(&b)));
        let labels = order
            .into_iter()
            .take(top_n)
            .map(|i| self.label(i))
            .collect();

        Overlay::ClassList {
            header: format!("Recognized Classes (Top {}):", top_n),
            labels,
        }
    }

    fn scale(&self) -> (f32, f32) {
        let (mw, mh) = self.model_input;
        let sx = if mw == 0 { 1.0 } else { self.sensor.width as f32 / mw as f32 };
        let sy = if mh == 0 { 1.0 } else { self.sensor.height as f32 / mh as f32 };
        (sx, sy)
    }

    fn scaled_box(&self, row: &[f32]) -> BoundingBox {
        let (sx, sy) = self.scale();
        BoundingBox {
            x1: row[0] * sx,
            y1: row[1] * sy,
            x2: row[2] * sx,
            y2: row[3] * sy,
        }
    }

    fn detect(&self, rows: &Tensor, threshold: f32) -> Result<Vec<Overlay>> {
        let values = rows.to_f32_vec();
        if values.len() % DETECTION_ROW != 0 {
            return Err(EdgeFlowError::Inference(format!(
                "Detection output '{}' has {} values, not a multiple of {}",
                rows.desc().name,
                values.len(),
                DETECTION_ROW
            )));
        }

        Ok(values
            .chunks_exact(DETECTION_ROW)
            .filter(|row| row[4] >= threshold)
            .map(|row| Overlay::Detection {
                bbox: self.scaled_box(row),
                label: self.label(row[5].max(0.0) as usize),
                score: row[4],
            })
            .collect())
    }

    fn segment(&self, map: &Tensor, alpha: f32) -> Result<Overlay> {
        let dims: Vec<usize> = {
            let shape = &map.desc().shape;
            let skip = shape.iter().take_while(|&&d| d == 1).count();
            // Keep at least two spatial dimensions.
            let skip = skip.min(shape.len().saturating_sub(2));
            shape[skip..].to_vec()
        };
        let values = map.to_f32_vec();
        let too_many_classes = || {
            EdgeFlowError::Inference(format!(
                "Segmentation output '{}' has more than {} classes",
                map.desc().name,
                MAX_MASK_CLASSES
            ))
        };

        let (height, width, classes) = match dims.as_slice() {
            [h, w] => {
                let classes = values
                    .iter()
                    .map(|v| u8::try_from(v.max(0.0) as u32).map_err(|_| too_many_classes()))
                    .collect::<Result<Vec<u8>>>()?;
                (*h, *w, classes)
            }
            [c, h, w] => {
                if *c > MAX_MASK_CLASSES {
                    return Err(too_many_classes());
                }
                let plane = h * w;
                let classes = (0..plane)
                    .map(|p| {
                        (0..*c)
                            .max_by(|&a, &b| values[a * plane + p].total_cmp(&values[b * plane + p]))
                            .unwrap_or(0) as u8
                    })
                    .collect();
                (*h, *w, classes)
            }
            other => {
                return Err(EdgeFlowError::Inference(format!(
                    "Segmentation output '{}' has unsupported shape {:?}",
                    map.desc().name,
                    other
                )));
            }
        };

        Ok(Overlay::Mask {
            width: width as u32,
            height: height as u32,
            classes,
            alpha,
        })
    }

    fn pose(&self, rows: &Tensor, threshold: f32) -> Result<Vec<Overlay>> {
        let row_len = rows.desc().shape.last().copied().unwrap_or(0);
        if row_len < POSE_HEADER || (row_len - POSE_HEADER) % 3 != 0 {
            return Err(EdgeFlowError::Inference(format!(
                "Pose output '{}' has row length {}, expected 5 + 3k",
                rows.desc().name,
                row_len
            )));
        }
        let (sx, sy) = self.scale();
        let values = rows.to_f32_vec();

        Ok(values
            .chunks_exact(row_len)
            .filter(|row| row[4] >= threshold)
            .map(|row| Overlay::Pose {
                bbox: self.scaled_box(row),
                score: row[4],
                keypoints: row[POSE_HEADER..]
                    .chunks_exact(3)
                    .filter(|kp| kp[2] >= threshold)
                    .map(|kp| Keypoint {
                        x: kp[0] * sx,
                        y: kp[1] * sy,
                        score: kp[2],
                    })
                    .collect(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::debug::DebugStage;
    use crate::core::frames::{DType, TensorDesc};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Capture(Mutex<Vec<Overlay>>);

    impl OverlayPainter for Capture {
        fn paint(&self, _frame: &mut FrameBuffer, overlays: &[Overlay]) -> Result<()> {
            self.0.lock().extend_from_slice(overlays);
            Ok(())
        }
    }

    fn tensor(shape: Vec<usize>, values: &[f32]) -> Tensor {
        let mut t = Tensor::allocated(TensorDesc::new("out", DType::F32, shape));
        t.write_f32(values).unwrap();
        t
    }

    fn processor(task: TaskKind, painter: Arc<dyn OverlayPainter>) -> PostProcessor {
        PostProcessor::new(
            task,
            "Model: test".into(),
            vec!["cat".into(), "dog".into(), "bird".into()],
            (100, 100),
            SensorRegion {
                width: 200,
                height: 50,
            },
            painter,
            DebugDump::disabled(DebugStage::Post),
        )
    }

    #[test]
    fn test_classification_top_n() {
        let post = processor(
            TaskKind::Classification { top_n: 2 },
            Arc::new(Capture::default()),
        );
        let overlays = post.overlays(&[tensor(vec![1, 3], &[0.1, 0.7, 0.2])]).unwrap();
        assert_eq!(overlays[0], Overlay::Title("Model: test".into()));
        assert_eq!(
            overlays[1],
            Overlay::ClassList {
                header: "Recognized Classes (Top 2):".into(),
                labels: vec!["dog".into(), "bird".into()],
            }
        );
    }

    #[test]
    fn test_detection_threshold_and_scaling() {
        let post = processor(
            TaskKind::Detection { viz_threshold: 0.5 },
            Arc::new(Capture::default()),
        );
        let rows = tensor(
            vec![1, 2, 6],
            &[10.0, 20.0, 50.0, 60.0, 0.9, 1.0, 0.0, 0.0, 5.0, 5.0, 0.2, 0.0],
        );
        let overlays = post.overlays(&[rows]).unwrap();
        assert_eq!(overlays.len(), 2);
        match &overlays[1] {
            Overlay::Detection { bbox, label, score } => {
                assert_eq!(*bbox, BoundingBox { x1: 20.0, y1: 10.0, x2: 100.0, y2: 30.0 });
                assert_eq!(label, "dog");
                assert!((score - 0.9).abs() < 1e-6);
            }
            other => panic!("unexpected overlay {:?}", other),
        }
    }

    #[test]
    fn test_segmentation_argmax_over_channels() {
        let post = processor(
            TaskKind::Segmentation { alpha: 0.4 },
            Arc::new(Capture::default()),
        );
        // Two classes over a 1x2 image: pixel 0 -> class 1, pixel 1 -> class 0.
        let map = tensor(vec![1, 2, 1, 2], &[0.1, 0.9, 0.8, 0.2]);
        let overlays = post.overlays(&[map]).unwrap();
        assert_eq!(
            overlays[1],
            Overlay::Mask {
                width: 2,
                height: 1,
                classes: vec![1, 0],
                alpha: 0.4,
            }
        );
    }

    #[test]
    fn test_segmentation_rejects_unrepresentable_classes() {
        let post = processor(
            TaskKind::Segmentation { alpha: 0.4 },
            Arc::new(Capture::default()),
        );
        let wide = tensor(vec![1, 257, 1, 1], &[0.0; 257]);
        assert!(matches!(
            post.overlays(&[wide]),
            Err(EdgeFlowError::Inference(_))
        ));

        let direct = tensor(vec![1, 2], &[3.0, 300.0]);
        assert!(matches!(
            post.overlays(&[direct]),
            Err(EdgeFlowError::Inference(_))
        ));

        let full = tensor(vec![1, 256, 1, 1], &[0.0; 256]);
        assert!(post.overlays(&[full]).is_ok());
    }

    #[test]
    fn test_pose_drops_weak_keypoints() {
        let post = processor(TaskKind::Pose { viz_threshold: 0.5 }, Arc::new(Capture::default()));
        let rows = tensor(
            vec![1, 1, 11],
            &[0.0, 0.0, 10.0, 10.0, 0.8, 5.0, 5.0, 0.9, 6.0, 6.0, 0.1],
        );
        let overlays = post.overlays(&[rows]).unwrap();
        match &overlays[1] {
            Overlay::Pose { keypoints, .. } => {
                assert_eq!(keypoints.len(), 1);
                assert_eq!(keypoints[0].x, 10.0);
            }
            other => panic!("unexpected overlay {:?}", other),
        }
    }

    #[test]
    fn test_run_paints_overlays() {
        let painter = Arc::new(Capture::default());
        let mut post = processor(TaskKind::Classification { top_n: 1 }, painter.clone());
        let mut frame = FrameBuffer::allocate(4, 4, 48);
        post.run(&[tensor(vec![3], &[0.0, 0.0, 1.0])], &mut frame)
            .unwrap();
        assert_eq!(painter.0.lock().len(), 2);
    }

    #[test]
    fn test_missing_outputs_is_error() {
        let post = processor(
            TaskKind::Classification { top_n: 1 },
            Arc::new(Capture::default()),
        );
        assert!(matches!(post.overlays(&[]), Err(EdgeFlowError::Inference(_))));
    }
}
