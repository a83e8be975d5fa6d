// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod post_process;
mod pre_process;
mod task;

pub use post_process::PostProcessor;
pub use pre_process::Preprocessor;
pub use task::{ModelTunables, TaskKind, TaskType};
