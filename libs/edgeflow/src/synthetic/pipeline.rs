// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! In-process media pipeline that generates frames instead of decoding them.
//!
//! Every subflow endpoint is a branch of its input's stream. An input holds
//! `frames_per_input` frames (or never ends); seeking an input rewinds all
//! of its branches. Pushed frames are counted per sink endpoint and queued
//! on a channel for inspection.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::core::error::{EdgeFlowError, Result};
use crate::core::execution::CancellationToken;
use crate::core::frames::{FrameBuffer, WorkUnit};
use crate::core::graph::{FlowGraph, SinkRoute};
use crate::core::traits::{MediaPipeline, PullOutcome};

/// Bytes per raw capture pixel.
const SENSOR_BYTES_PER_PIXEL: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticPipelineConfig {
    /// Frames each input yields before end-of-stream. `None` never ends.
    pub frames_per_input: Option<u64>,
    /// Size of every pre-processed unit; must match the model input tensor.
    pub pre_proc_len: usize,
    /// Pacing between frames on every endpoint.
    pub frame_interval: Duration,
    /// Time a seek holds the input, to widen races in tests.
    pub seek_delay: Duration,
}

impl Default for SyntheticPipelineConfig {
    fn default() -> Self {
        Self {
            frames_per_input: None,
            pre_proc_len: 0,
            frame_interval: Duration::ZERO,
            seek_delay: Duration::ZERO,
        }
    }
}

/// A pushed frame as the sink saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub endpoint: String,
    pub outputs: Vec<String>,
    pub width: u32,
    pub height: u32,
    pub len: usize,
}

#[derive(Debug)]
struct Endpoint {
    input: String,
    width: u32,
    height: u32,
    len: usize,
    cursor: u64,
}

#[derive(Debug, Default)]
struct State {
    endpoints: HashMap<String, Endpoint>,
    seeks: HashMap<String, usize>,
    stalled: HashSet<String>,
    pushed: HashMap<String, usize>,
    eos: HashSet<String>,
    backgrounds: HashMap<String, usize>,
    rejected_backgrounds: HashSet<String>,
}

pub struct SyntheticPipeline {
    config: SyntheticPipelineConfig,
    state: Mutex<State>,
    seeks_in_flight: AtomicUsize,
    max_concurrent_seeks: AtomicUsize,
    delivery_tx: Sender<Delivery>,
    delivery_rx: Receiver<Delivery>,
}

impl SyntheticPipeline {
    /// Create the capture endpoints every subflow of `graph` pulls from.
    pub fn from_graph(graph: &FlowGraph, config: SyntheticPipelineConfig) -> Self {
        let mut state = State::default();
        for sub in graph.subflows() {
            let input = graph.registry().input(sub.input);
            state.endpoints.insert(
                sub.sensor_endpoint.clone(),
                Endpoint {
                    input: input.name.clone(),
                    width: input.width,
                    height: input.height,
                    len: input.width as usize * input.height as usize * SENSOR_BYTES_PER_PIXEL,
                    cursor: 0,
                },
            );
            state.endpoints.insert(
                sub.pre_proc_endpoint.clone(),
                Endpoint {
                    input: input.name.clone(),
                    width: input.width,
                    height: input.height,
                    len: config.pre_proc_len,
                    cursor: 0,
                },
            );
        }
        tracing::debug!(
            "[synthetic] {} endpoints over {} inputs",
            state.endpoints.len(),
            graph.registry().inputs().len()
        );

        let (delivery_tx, delivery_rx) = crossbeam_channel::unbounded();
        Self {
            config,
            state: Mutex::new(state),
            seeks_in_flight: AtomicUsize::new(0),
            max_concurrent_seeks: AtomicUsize::new(0),
            delivery_tx,
            delivery_rx,
        }
    }

    /// Make every endpoint of `input` stop producing; pulls then time out.
    pub fn stall_input(&self, input: &str) {
        self.state.lock().stalled.insert(input.to_string());
    }

    /// Fail the next background pushes to `output`.
    pub fn reject_background(&self, output: &str) {
        self.state
            .lock()
            .rejected_backgrounds
            .insert(output.to_string());
    }

    /// Accept backgrounds for `output` again.
    pub fn accept_background(&self, output: &str) {
        self.state.lock().rejected_backgrounds.remove(output);
    }

    pub fn seek_count(&self, input: &str) -> usize {
        self.state.lock().seeks.get(input).copied().unwrap_or(0)
    }

    /// Highest number of seeks observed running at the same time.
    pub fn max_concurrent_seeks(&self) -> usize {
        self.max_concurrent_seeks.load(Ordering::SeqCst)
    }

    pub fn pushed(&self, endpoint: &str) -> usize {
        self.state.lock().pushed.get(endpoint).copied().unwrap_or(0)
    }

    pub fn eos_received(&self, endpoint: &str) -> bool {
        self.state.lock().eos.contains(endpoint)
    }

    /// Length of the background frame handed to `output`, if any.
    pub fn background_len(&self, output: &str) -> Option<usize> {
        self.state.lock().backgrounds.get(output).copied()
    }

    pub fn deliveries(&self) -> Receiver<Delivery> {
        self.delivery_rx.clone()
    }

    fn next_unit(&self, endpoint: &str) -> Result<Next> {
        let mut state = self.state.lock();
        let State {
            endpoints, stalled, ..
        } = &mut *state;
        let ep = endpoints.get_mut(endpoint).ok_or_else(|| {
            EdgeFlowError::RuntimeIo(format!("Unknown endpoint '{}'", endpoint))
        })?;
        if stalled.contains(&ep.input) {
            return Ok(Next::Stalled);
        }
        if let Some(limit) = self.config.frames_per_input {
            if ep.cursor >= limit {
                return Ok(Next::End);
            }
        }

        let sequence = ep.cursor;
        ep.cursor += 1;
        let data = Bytes::from(vec![(sequence % 251) as u8; ep.len]);
        Ok(Next::Unit(WorkUnit::new(data, ep.width, ep.height, sequence)))
    }
}

enum Next {
    Unit(WorkUnit),
    End,
    Stalled,
}

impl MediaPipeline for SyntheticPipeline {
    fn pull(
        &self,
        endpoint: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<PullOutcome> {
        if !self.config.frame_interval.is_zero() && cancel.wait_timeout(self.config.frame_interval)
        {
            return Ok(PullOutcome::Cancelled);
        }

        match self.next_unit(endpoint)? {
            Next::Unit(unit) => Ok(PullOutcome::Unit(unit)),
            Next::End => Ok(PullOutcome::EndOfStream),
            Next::Stalled => {
                if cancel.wait_timeout(timeout) {
                    Ok(PullOutcome::Cancelled)
                } else {
                    Err(EdgeFlowError::RuntimeIo(format!(
                        "No unit within {:?}",
                        timeout
                    )))
                }
            }
        }
    }

    fn seek_to_start(&self, input: &str) -> Result<()> {
        let now = self.seeks_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_seeks.fetch_max(now, Ordering::SeqCst);
        if !self.config.seek_delay.is_zero() {
            std::thread::sleep(self.config.seek_delay);
        }

        {
            let mut state = self.state.lock();
            for ep in state.endpoints.values_mut().filter(|ep| ep.input == input) {
                ep.cursor = 0;
            }
            *state.seeks.entry(input.to_string()).or_default() += 1;
        }
        tracing::debug!("[synthetic] Seek '{}' to start", input);

        self.seeks_in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn push(&self, route: &SinkRoute, frame: &FrameBuffer) -> Result<()> {
        *self
            .state
            .lock()
            .pushed
            .entry(route.endpoint.clone())
            .or_default() += 1;
        let delivery = Delivery {
            endpoint: route.endpoint.clone(),
            outputs: route.slots.iter().map(|s| s.output.clone()).collect(),
            width: frame.width(),
            height: frame.height(),
            len: frame.len(),
        };
        self.delivery_tx
            .send(delivery)
            .map_err(|e| EdgeFlowError::RuntimeIo(format!("Sink queue closed: {}", e)))
    }

    fn send_eos(&self, route: &SinkRoute) -> Result<()> {
        tracing::debug!("[synthetic] End-of-stream on '{}'", route.endpoint);
        self.state.lock().eos.insert(route.endpoint.clone());
        Ok(())
    }

    fn push_background(&self, output: &str, frame: &FrameBuffer) -> Result<()> {
        let mut state = self.state.lock();
        if state.rejected_backgrounds.contains(output) {
            return Err(EdgeFlowError::RuntimeIo(format!(
                "{} rejected the background",
                output
            )));
        }
        state.backgrounds.insert(output.to_string(), frame.len());
        Ok(())
    }
}
