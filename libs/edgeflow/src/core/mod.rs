// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod config;
pub mod debug;
pub mod error;
pub mod execution;
pub mod frames;
pub mod graph;
pub mod observability;
pub mod processing;
pub mod registry;
pub mod runtime;
pub mod traits;

pub use config::*;
pub use debug::*;
pub use error::*;
pub use execution::*;
pub use frames::*;
pub use graph::*;
pub use observability::*;
pub use processing::*;
pub use registry::*;
pub use runtime::*;
pub use traits::*;
