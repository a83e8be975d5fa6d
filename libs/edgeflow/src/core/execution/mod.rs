// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod cancellation;
mod coordinator;
mod executor_state;
mod inference_executor;

pub use cancellation::CancellationToken;
pub use coordinator::SharedInputCoordinator;
pub use executor_state::ExecutorState;
pub use inference_executor::{
    ExecutorConfig, ExecutorParts, InferenceExecutor, TAG_FRAMERATE, TAG_INFERENCE,
    TAG_TOTAL_TIME,
};
