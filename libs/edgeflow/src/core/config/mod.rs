// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Declarative flow configuration (`inputs`, `models`, `outputs`, `flows`).

mod flow_config;
mod flow_entry;
mod fraction;
mod ordered;

pub use flow_config::{
    DebugDecl, FlowConfigFile, FrameRateDecl, InputDecl, ModelDecl, OutputDecl, RuntimeDecl,
};
pub use flow_entry::FlowEntry;
pub use fraction::to_fraction;
