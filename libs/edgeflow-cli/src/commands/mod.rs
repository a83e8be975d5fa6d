// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod check;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};
use edgeflow::{FlowConfigFile, FlowGraph};

/// Parse and resolve a configuration file.
pub fn load_graph(path: &Path) -> Result<FlowGraph> {
    let config = FlowConfigFile::from_yaml_file(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    FlowGraph::from_config(&config)
        .with_context(|| format!("Invalid flow configuration in {}", path.display()))
}
