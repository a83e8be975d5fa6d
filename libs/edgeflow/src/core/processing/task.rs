// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of vision tasks a model can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Classification,
    Detection,
    Segmentation,
    Pose,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::Classification => write!(f, "classification"),
            TaskType::Detection => write!(f, "detection"),
            TaskType::Segmentation => write!(f, "segmentation"),
            TaskType::Pose => write!(f, "pose"),
        }
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classification" => Ok(TaskType::Classification),
            "detection" => Ok(TaskType::Detection),
            "segmentation" => Ok(TaskType::Segmentation),
            "pose" | "keypoint_detection" => Ok(TaskType::Pose),
            other => Err(format!("unknown task type '{}'", other)),
        }
    }
}

/// Per-model knobs from the `models` section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelTunables {
    pub alpha: f32,
    pub viz_threshold: f32,
    pub top_n: usize,
}

impl Default for ModelTunables {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            viz_threshold: 0.5,
            top_n: 5,
        }
    }
}

/// A task type together with the tunables its post-processing uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaskKind {
    Classification { top_n: usize },
    Detection { viz_threshold: f32 },
    Segmentation { alpha: f32 },
    Pose { viz_threshold: f32 },
}

impl TaskKind {
    pub fn new(task_type: TaskType, tunables: &ModelTunables) -> Self {
        match task_type {
            TaskType::Classification => TaskKind::Classification {
                top_n: tunables.top_n,
            },
            TaskType::Detection => TaskKind::Detection {
                viz_threshold: tunables.viz_threshold,
            },
            TaskType::Segmentation => TaskKind::Segmentation {
                alpha: tunables.alpha,
            },
            TaskType::Pose => TaskKind::Pose {
                viz_threshold: tunables.viz_threshold,
            },
        }
    }

    pub fn task_type(&self) -> TaskType {
        match self {
            TaskKind::Classification { .. } => TaskType::Classification,
            TaskKind::Detection { .. } => TaskType::Detection,
            TaskKind::Segmentation { .. } => TaskType::Segmentation,
            TaskKind::Pose { .. } => TaskType::Pose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_task_type() {
        assert_eq!("Detection".parse::<TaskType>(), Ok(TaskType::Detection));
        assert_eq!(
            "keypoint_detection".parse::<TaskType>(),
            Ok(TaskType::Pose)
        );
        assert!("tracking".parse::<TaskType>().is_err());
    }

    #[test]
    fn test_kind_picks_relevant_tunable() {
        let tunables = ModelTunables {
            alpha: 0.3,
            viz_threshold: 0.7,
            top_n: 2,
        };
        assert_eq!(
            TaskKind::new(TaskType::Classification, &tunables),
            TaskKind::Classification { top_n: 2 }
        );
        assert_eq!(
            TaskKind::new(TaskType::Segmentation, &tunables),
            TaskKind::Segmentation { alpha: 0.3 }
        );
        assert_eq!(
            TaskKind::new(TaskType::Pose, &tunables).task_type(),
            TaskType::Pose
        );
    }
}
