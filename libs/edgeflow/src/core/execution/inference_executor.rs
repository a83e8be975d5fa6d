// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! One worker thread per subflow.
//!
//! Each cycle pulls a pre-processed unit, runs the model, pulls the matching
//! raw capture unit, draws the results into it and pushes it to the output
//! route. Failures stay inside the executor: the worker stops, signals
//! end-of-stream on its route, and siblings keep running.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::{CancellationToken, ExecutorState, SharedInputCoordinator};
use crate::core::debug::DebugDump;
use crate::core::error::{EdgeFlowError, Result};
use crate::core::frames::{FrameBuffer, Tensor, WorkUnit};
use crate::core::graph::SinkRoute;
use crate::core::observability::StatisticsAggregator;
use crate::core::processing::{PostProcessor, Preprocessor};
use crate::core::traits::{InferenceEngine, MediaPipeline, PullOutcome};

pub const TAG_INFERENCE: &str = "dl-inference";
pub const TAG_TOTAL_TIME: &str = "total time";
pub const TAG_FRAMERATE: &str = "framerate";

/// Static wiring of one executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub instance_id: u32,
    pub input_name: String,
    pub loop_on_end: bool,
    pub pre_proc_endpoint: String,
    pub sensor_endpoint: String,
    pub route: SinkRoute,
    pub pull_timeout: Duration,
}

/// Collaborators and buffers the worker takes ownership of at start.
pub struct ExecutorParts {
    pub pipeline: Arc<dyn MediaPipeline>,
    pub engine: Arc<dyn InferenceEngine>,
    pub coordinator: Arc<SharedInputCoordinator>,
    pub stats: Arc<StatisticsAggregator>,
    pub preprocessor: Preprocessor,
    pub postprocessor: PostProcessor,
    pub inference_debug: DebugDump,
    pub input_tensors: Vec<Tensor>,
    pub output_tensors: Vec<Tensor>,
}

/// Runs one subflow on a dedicated thread.
pub struct InferenceExecutor {
    config: ExecutorConfig,
    state: Arc<Mutex<ExecutorState>>,
    cancel: CancellationToken,
    parts: Option<ExecutorParts>,
    handle: Option<JoinHandle<()>>,
}

impl InferenceExecutor {
    pub fn new(config: ExecutorConfig, parts: ExecutorParts) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(ExecutorState::Idle)),
            cancel: CancellationToken::new(),
            parts: Some(parts),
            handle: None,
        }
    }

    pub fn instance_id(&self) -> u32 {
        self.config.instance_id
    }

    pub fn state(&self) -> ExecutorState {
        *self.state.lock()
    }

    /// Spawn the worker. Only valid from `Idle`.
    pub fn start(&mut self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != ExecutorState::Idle {
                return Err(EdgeFlowError::InvalidState(format!(
                    "[subflow {}] Cannot start from state {}",
                    self.config.instance_id, *state
                )));
            }
            *state = ExecutorState::Running;
        }

        let parts = self.parts.take().ok_or_else(|| {
            EdgeFlowError::InvalidState(format!(
                "[subflow {}] Executor already consumed",
                self.config.instance_id
            ))
        })?;
        let worker = Worker {
            config: self.config.clone(),
            parts,
            state: Arc::clone(&self.state),
            cancel: self.cancel.clone(),
            last_cycle: None,
        };

        let handle = std::thread::Builder::new()
            .name(format!("infer-{}", self.config.instance_id))
            .spawn(move || worker.run())
            .map_err(|e| {
                *self.state.lock() = ExecutorState::Stopped;
                EdgeFlowError::RuntimeIo(format!("Failed to spawn thread: {}", e))
            })?;

        self.handle = Some(handle);
        Ok(())
    }

    /// Ask the worker to stop. It finishes the cycle in progress first.
    pub fn send_exit_signal(&self) {
        tracing::debug!("[subflow {}] Exit requested", self.config.instance_id);
        self.cancel.cancel();
    }

    /// Block until the worker has exited.
    pub fn wait_for_exit(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        handle.join().map_err(|_| {
            *self.state.lock() = ExecutorState::Stopped;
            EdgeFlowError::InvalidState(format!(
                "[subflow {}] Worker thread panicked",
                self.config.instance_id
            ))
        })
    }
}

impl Drop for InferenceExecutor {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.send_exit_signal();
            if let Err(e) = self.wait_for_exit() {
                tracing::warn!("{}", e);
            }
        }
    }
}

enum Pulled {
    Unit(WorkUnit),
    EndOfStream,
    Cancelled,
}

enum CycleOutcome {
    Continue,
    EndOfStream,
    Cancelled,
}

struct Worker {
    config: ExecutorConfig,
    parts: ExecutorParts,
    state: Arc<Mutex<ExecutorState>>,
    cancel: CancellationToken,
    last_cycle: Option<Instant>,
}

impl Worker {
    fn run(mut self) {
        let id = self.config.instance_id;
        tracing::info!(
            "[subflow {}] Thread started ({} -> {})",
            id,
            self.config.pre_proc_endpoint,
            self.config.route.endpoint
        );

        let failed = loop {
            if self.cancel.is_cancelled() {
                tracing::debug!("[subflow {}] Exit signal observed", id);
                break false;
            }
            match self.cycle() {
                Ok(CycleOutcome::Continue) => {}
                Ok(CycleOutcome::EndOfStream) => {
                    tracing::info!("[subflow {}] End of stream, draining", id);
                    break false;
                }
                Ok(CycleOutcome::Cancelled) => break false,
                Err(e) => {
                    tracing::error!("[subflow {}] Cycle failed: {}", id, e);
                    break true;
                }
            }
        };

        if !failed {
            *self.state.lock() = ExecutorState::Draining;
        }
        if let Err(e) = self
            .parts
            .pipeline
            .send_eos(&self.config.route)
        {
            tracing::warn!("[subflow {}] Failed to send end-of-stream: {}", id, e);
        }

        for tensor in self
            .parts
            .input_tensors
            .iter_mut()
            .chain(self.parts.output_tensors.iter_mut())
        {
            tensor.release();
        }

        *self.state.lock() = ExecutorState::Stopped;
        tracing::info!("[subflow {}] Thread exiting", id);
    }

    fn cycle(&mut self) -> Result<CycleOutcome> {
        let id = self.config.instance_id;

        let unit = match self.pull(&self.config.pre_proc_endpoint)? {
            Pulled::Unit(unit) => unit,
            Pulled::EndOfStream => return Ok(CycleOutcome::EndOfStream),
            Pulled::Cancelled => return Ok(CycleOutcome::Cancelled),
        };

        // Pre-process and infer on the borrowed unit, then let it go.
        let mut pre_frame = FrameBuffer::borrowed(&unit);
        drop(unit);
        let inferred = self.infer(&pre_frame);
        if let Some(input) = self.parts.input_tensors.first_mut() {
            self.parts.preprocessor.finish(input);
        }
        pre_frame.release();
        inferred?;

        let sensor = match self.pull(&self.config.sensor_endpoint)? {
            Pulled::Unit(unit) => unit,
            Pulled::EndOfStream => return Ok(CycleOutcome::EndOfStream),
            Pulled::Cancelled => return Ok(CycleOutcome::Cancelled),
        };
        let mut frame = FrameBuffer::copied(&sensor);
        drop(sensor);

        self.parts
            .postprocessor
            .run(&self.parts.output_tensors, &mut frame)?;
        self.parts.pipeline.push(&self.config.route, &frame)?;
        frame.release();

        let now = Instant::now();
        if let Some(prev) = self.last_cycle.replace(now) {
            let elapsed_ms = now.duration_since(prev).as_secs_f64() * 1000.0;
            if let Err(e) = self
                .parts
                .stats
                .report_metric(id, TAG_TOTAL_TIME, "ms", elapsed_ms)
            {
                tracing::warn!("[subflow {}] {}", id, e);
            }
            let fps = 1000.0 / elapsed_ms.max(1e-6);
            if let Err(e) = self
                .parts
                .stats
                .report_metric(id, TAG_FRAMERATE, "fps", fps)
            {
                tracing::warn!("[subflow {}] {}", id, e);
            }
        }

        Ok(CycleOutcome::Continue)
    }

    fn infer(&mut self, frame: &FrameBuffer) -> Result<()> {
        let id = self.config.instance_id;
        let input = self.parts.input_tensors.first_mut().ok_or_else(|| {
            EdgeFlowError::InvalidState(format!("[subflow {}] Model has no input tensor", id))
        })?;
        self.parts.preprocessor.apply(frame, input)?;

        let start = Instant::now();
        self.parts
            .engine
            .run(&self.parts.input_tensors, &mut self.parts.output_tensors)?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        if let Err(e) = self
            .parts
            .stats
            .report_proc_time(id, TAG_INFERENCE, elapsed_ms)
        {
            tracing::warn!("[subflow {}] {}", id, e);
        }

        let outputs = &self.parts.output_tensors;
        self.parts.inference_debug.log_and_advance(|| {
            outputs
                .iter()
                .map(|t| {
                    let values = t.to_f32_vec();
                    let head: Vec<String> =
                        values.iter().take(32).map(|v| format!("{:.4}", v)).collect();
                    format!("{} {:?}: {}\n", t.desc().name, t.desc().shape, head.join(" "))
                })
                .collect::<String>()
        })
    }

    /// Pull from `endpoint`, rewinding a looping input once on end-of-stream.
    fn pull(&self, endpoint: &str) -> Result<Pulled> {
        let observed = self.parts.coordinator.generation();
        match self.pull_once(endpoint)? {
            Pulled::EndOfStream if self.config.loop_on_end => {}
            other => return Ok(other),
        }

        let rewound = self.parts.coordinator.reset_once(observed, || {
            self.parts.pipeline.seek_to_start(&self.config.input_name)
        })?;
        tracing::debug!(
            "[subflow {}] Looping '{}' ({})",
            self.config.instance_id,
            self.config.input_name,
            if rewound { "rewound" } else { "already rewound" }
        );

        self.pull_once(endpoint)
    }

    fn pull_once(&self, endpoint: &str) -> Result<Pulled> {
        let outcome = self
            .parts
            .pipeline
            .pull(endpoint, self.config.pull_timeout, &self.cancel)
            .map_err(|e| match e {
                EdgeFlowError::RuntimeIo(msg) => {
                    EdgeFlowError::RuntimeIo(format!("{}: {}", endpoint, msg))
                }
                other => other,
            })?;
        Ok(match outcome {
            PullOutcome::Unit(unit) => Pulled::Unit(unit),
            PullOutcome::EndOfStream => Pulled::EndOfStream,
            PullOutcome::Cancelled => Pulled::Cancelled,
        })
    }
}
