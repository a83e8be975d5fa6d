// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::frames::FrameBuffer;

/// Box corners in sensor-region pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

/// One drawing instruction computed by post-processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Overlay {
    /// Banner text at the top of the frame.
    Title(String),
    ClassList {
        header: String,
        labels: Vec<String>,
    },
    Detection {
        bbox: BoundingBox,
        label: String,
        score: f32,
    },
    /// Per-pixel class indices blended over the frame.
    Mask {
        width: u32,
        height: u32,
        classes: Vec<u8>,
        alpha: f32,
    },
    Pose {
        bbox: BoundingBox,
        score: f32,
        keypoints: Vec<Keypoint>,
    },
}

impl std::fmt::Display for Overlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Overlay::Title(text) => write!(f, "title \"{}\"", text),
            Overlay::ClassList { header, labels } => {
                write!(f, "{} {}", header, labels.join(", "))
            }
            Overlay::Detection { bbox, label, score } => write!(
                f,
                "box [{:.1}, {:.1}, {:.1}, {:.1}] {} {:.3}",
                bbox.x1, bbox.y1, bbox.x2, bbox.y2, label, score
            ),
            Overlay::Mask {
                width,
                height,
                alpha,
                ..
            } => write!(f, "mask {}x{} alpha {:.2}", width, height, alpha),
            Overlay::Pose {
                bbox,
                score,
                keypoints,
            } => write!(
                f,
                "pose [{:.1}, {:.1}, {:.1}, {:.1}] {:.3} keypoints {}",
                bbox.x1,
                bbox.y1,
                bbox.x2,
                bbox.y2,
                score,
                keypoints.len()
            ),
        }
    }
}

/// Computer-vision drawing primitives.
pub trait OverlayPainter: Send + Sync {
    /// Draw `overlays` into an owned (writable) frame.
    fn paint(&self, frame: &mut FrameBuffer, overlays: &[Overlay]) -> Result<()>;
}
