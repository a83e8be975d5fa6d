// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Configuration-driven runtime for real-time video analytics flows.
//!
//! A flow binds one capture input to one or more subflows; each subflow runs
//! one model and renders into one or more outputs. Inputs, models and outputs
//! are declared once and shared by every flow that names them. Subflows that
//! render into the same output are laid out as a mosaic.
//!
//! The crate resolves that graph once ([`FlowGraphResolver`]), then runs one
//! [`InferenceExecutor`] thread per subflow against an external
//! [`MediaPipeline`] until shutdown.

// Suppress pedantic clippy warnings that are intentional design choices
#![allow(clippy::too_many_arguments)] // Executor wiring takes many collaborators
#![allow(clippy::type_complexity)] // Complex types are clear in context

pub mod core;
pub mod synthetic;

pub use core::{
    // Configuration
    DebugDecl,
    FlowConfigFile,
    FlowEntry,
    InputDecl,
    ModelDecl,
    OutputDecl,
    RuntimeDecl,
    // Errors
    ConfigError,
    EdgeFlowError,
    Result,
    StatsError,
    // Registry
    InputId,
    InputSpec,
    ModelId,
    ModelSpec,
    OutputId,
    OutputSpec,
    ResourceRegistry,
    TargetAllocator,
    // Graph
    DebugWindow,
    DisplaySlot,
    FlowGraph,
    FlowGraphResolver,
    FlowSpec,
    MosaicLayoutValidator,
    MosaicRegion,
    Rect,
    SensorRegion,
    SinkRoute,
    SlotId,
    SubFlowSpec,
    // Frames
    DType,
    FrameBuffer,
    Ownership,
    Tensor,
    TensorDesc,
    WorkUnit,
    // Collaborators
    InferenceEngine,
    LoadedModel,
    MediaPipeline,
    ModelLoadRequest,
    ModelLoader,
    Overlay,
    OverlayPainter,
    PreProcessParams,
    PullOutcome,
    // Debug artifacts
    DebugDump,
    DebugDumpConfig,
    DebugStage,
    // Processing
    ModelTunables,
    PostProcessor,
    Preprocessor,
    TaskKind,
    TaskType,
    // Execution
    CancellationToken,
    ExecutorConfig,
    ExecutorParts,
    ExecutorState,
    InferenceExecutor,
    SharedInputCoordinator,
    // Observability
    format_rows,
    StatKind,
    StatSample,
    StatisticsAggregator,
    StatsReporter,
    StatsRow,
    // Runtime
    FlowRuntime,
};
