// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Wires a resolved [`FlowGraph`] to its collaborators and runs it.
//!
//! `build` loads every model once, creates the statistics entries and one
//! [`InferenceExecutor`] per subflow. `start` hands each mosaic output its
//! background frame and spawns the executors. Shutdown is cooperative:
//! `send_exit_signal` then `wait_for_exit`.

use std::sync::Arc;
use std::time::Duration;

use crate::core::debug::{DebugDump, DebugDumpConfig, DebugStage};
use crate::core::error::{EdgeFlowError, Result};
use crate::core::execution::{
    ExecutorConfig, ExecutorParts, ExecutorState, InferenceExecutor, SharedInputCoordinator,
};
use crate::core::frames::{FrameBuffer, Tensor};
use crate::core::graph::{FlowGraph, SubFlowSpec};
use crate::core::observability::StatisticsAggregator;
use crate::core::processing::{PostProcessor, Preprocessor};
use crate::core::traits::{MediaPipeline, ModelLoader, OverlayPainter};

pub struct FlowRuntime {
    graph: FlowGraph,
    pipeline: Arc<dyn MediaPipeline>,
    stats: Arc<StatisticsAggregator>,
    executors: Vec<InferenceExecutor>,
    backgrounds: Vec<FrameBuffer>,
    started: bool,
}

impl FlowRuntime {
    pub fn build(
        graph: FlowGraph,
        pipeline: Arc<dyn MediaPipeline>,
        loader: &dyn ModelLoader,
        painter: Arc<dyn OverlayPainter>,
    ) -> Result<Self> {
        let stats = Arc::new(StatisticsAggregator::new());

        // One coordinator per input, shared by every subflow reading it.
        let coordinators: Vec<Arc<SharedInputCoordinator>> = graph
            .registry()
            .inputs()
            .iter()
            .map(|input| Arc::new(SharedInputCoordinator::new(&input.name)))
            .collect();

        let mut executors = Vec::with_capacity(graph.subflow_count());
        for sub in graph.subflows() {
            let coordinator = coordinators
                .get(sub.input.index())
                .cloned()
                .ok_or_else(|| {
                    EdgeFlowError::InvalidState(format!("No coordinator for {}", sub.input))
                })?;
            let executor = Self::build_executor(
                &graph,
                sub,
                &pipeline,
                loader,
                &painter,
                &stats,
                coordinator,
            )?;
            executors.push(executor);
        }

        tracing::info!(
            "[{}] Built {} executors over {} inputs",
            graph.title(),
            executors.len(),
            graph.registry().inputs().len()
        );

        Ok(Self {
            graph,
            pipeline,
            stats,
            executors,
            backgrounds: Vec::new(),
            started: false,
        })
    }

    fn build_executor(
        graph: &FlowGraph,
        sub: &SubFlowSpec,
        pipeline: &Arc<dyn MediaPipeline>,
        loader: &dyn ModelLoader,
        painter: &Arc<dyn OverlayPainter>,
        stats: &Arc<StatisticsAggregator>,
        coordinator: Arc<SharedInputCoordinator>,
    ) -> Result<InferenceExecutor> {
        let registry = graph.registry();
        let input = registry.input(sub.input);
        let model = registry.model(sub.model);
        let loaded = model.handle(loader, registry.targets())?;
        let task = model.task_kind(&loaded);
        let model_name = model.model_name();
        let runtime = graph.runtime();

        let dump = |stage| -> Result<DebugDump> {
            DebugDump::new(DebugDumpConfig::for_stage(
                &sub.debug,
                stage,
                &input.name,
                &model_name,
                input.index,
            ))
        };

        let preprocessor = Preprocessor::new(runtime.zero_copy, dump(DebugStage::Pre)?);
        let postprocessor = PostProcessor::new(
            task,
            sub.title.clone(),
            loaded.class_names.clone(),
            (loaded.preprocess.width, loaded.preprocess.height),
            sub.sensor,
            Arc::clone(painter),
            dump(DebugStage::Post)?,
        );
        let input_tensors = vec![preprocessor.input_tensor(loaded.input.clone())];
        let output_tensors: Vec<Tensor> = loaded
            .outputs
            .iter()
            .cloned()
            .map(Tensor::allocated)
            .collect();

        if let Err(e) = stats.add_entry(
            sub.instance_id,
            &input.source,
            &task.task_type().to_string(),
            &model_name,
        ) {
            tracing::warn!("[subflow {}] {}", sub.instance_id, e);
        }

        let config = ExecutorConfig {
            instance_id: sub.instance_id,
            input_name: input.name.clone(),
            loop_on_end: input.loop_on_end,
            pre_proc_endpoint: sub.pre_proc_endpoint.clone(),
            sensor_endpoint: sub.sensor_endpoint.clone(),
            route: sub.route.clone(),
            pull_timeout: Duration::from_millis(runtime.pull_timeout_ms),
        };
        let parts = ExecutorParts {
            pipeline: Arc::clone(pipeline),
            engine: Arc::clone(&loaded.engine),
            coordinator,
            stats: Arc::clone(stats),
            preprocessor,
            postprocessor,
            inference_debug: dump(DebugStage::Inference)?,
            input_tensors,
            output_tensors,
        };

        tracing::debug!(
            "[subflow {}] {} -> {} ({}, sensor {})",
            sub.instance_id,
            input.name,
            model_name,
            task.task_type(),
            sub.sensor
        );
        Ok(InferenceExecutor::new(config, parts))
    }

    /// Push mosaic backgrounds, then start every executor.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(EdgeFlowError::InvalidState(
                "Runtime already started".to_string(),
            ));
        }

        let mut backgrounds: Vec<FrameBuffer> = Vec::new();
        for output in self.graph.registry().outputs() {
            if !output.mosaic_enabled() {
                continue;
            }
            let Some(len) = output.background_len() else {
                tracing::warn!(
                    "[{}] No background for format '{}'",
                    output.name,
                    output.format
                );
                continue;
            };
            let mut background = FrameBuffer::allocate(output.width, output.height, len);
            if let Err(e) = self.pipeline.push_background(&output.name, &background) {
                background.release();
                for pushed in &mut backgrounds {
                    pushed.release();
                }
                return Err(e);
            }
            backgrounds.push(background);
        }
        self.backgrounds = backgrounds;
        self.started = true;

        let mut failure = None;
        for executor in &mut self.executors {
            if let Err(e) = executor.start() {
                failure = Some(e);
                break;
            }
        }
        if let Some(e) = failure {
            tracing::error!("[start] {}", e);
            self.send_exit_signal();
            return Err(e);
        }

        tracing::info!("[start] {} executors running", self.executors.len());
        Ok(())
    }

    pub fn send_exit_signal(&self) {
        for executor in &self.executors {
            executor.send_exit_signal();
        }
    }

    /// Join every executor. Returns the first join failure after all have
    /// been joined.
    pub fn wait_for_exit(&mut self) -> Result<()> {
        let mut first_error = None;
        for executor in &mut self.executors {
            if let Err(e) = executor.wait_for_exit() {
                tracing::error!("{}", e);
                first_error.get_or_insert(e);
            }
        }
        for background in &mut self.backgrounds {
            background.release();
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn statistics(&self) -> Arc<StatisticsAggregator> {
        Arc::clone(&self.stats)
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    pub fn executor_states(&self) -> Vec<(u32, ExecutorState)> {
        self.executors
            .iter()
            .map(|e| (e.instance_id(), e.state()))
            .collect()
    }

    /// Whether every executor has stopped.
    pub fn is_finished(&self) -> bool {
        self.executors
            .iter()
            .all(|e| e.state() == ExecutorState::Stopped)
    }
}
