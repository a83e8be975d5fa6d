// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! De-duplicated inputs, models and outputs.

mod ids;
mod input_spec;
mod model_spec;
mod output_spec;
mod resource_registry;
mod target_allocator;

pub use ids::{InputId, ModelId, OutputId};
pub use input_spec::InputSpec;
pub use model_spec::{model_name_from_path, ModelSpec};
pub use output_spec::{background_frame_len, OutputSpec};
pub use resource_registry::ResourceRegistry;
pub use target_allocator::TargetAllocator;
