// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

/// Lifecycle of an [`InferenceExecutor`](super::InferenceExecutor).
///
/// `Idle -> Running -> Draining -> Stopped`; a runtime failure goes from
/// `Running` straight to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutorState {
    #[default]
    Idle,
    Running,
    Draining,
    Stopped,
}

impl std::fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorState::Idle => write!(f, "Idle"),
            ExecutorState::Running => write!(f, "Running"),
            ExecutorState::Draining => write!(f, "Draining"),
            ExecutorState::Stopped => write!(f, "Stopped"),
        }
    }
}
