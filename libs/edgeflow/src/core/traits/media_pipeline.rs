// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::time::Duration;

use crate::core::error::Result;
use crate::core::execution::CancellationToken;
use crate::core::frames::{FrameBuffer, WorkUnit};
use crate::core::graph::SinkRoute;

/// Result of a blocking pull from a capture endpoint.
#[derive(Debug)]
pub enum PullOutcome {
    Unit(WorkUnit),
    /// The input is exhausted. Not an error.
    EndOfStream,
    /// The cancellation token fired while waiting.
    Cancelled,
}

/// The multimedia engine that moves and decodes frames.
///
/// Each subflow pulls from two named endpoints of its input (pre-processed
/// and raw capture) and pushes into one named sink endpoint. Implementations
/// must be safe to call from every executor thread at once.
pub trait MediaPipeline: Send + Sync {
    /// Block until a unit is available, the stream ends, the token is
    /// cancelled, or `timeout` elapses. A timeout without end-of-stream is
    /// an error.
    fn pull(
        &self,
        endpoint: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<PullOutcome>;

    /// Rewind the named input to its first frame.
    fn seek_to_start(&self, input: &str) -> Result<()>;

    /// Submit a post-processed frame to the route's compositor slots.
    fn push(&self, route: &SinkRoute, frame: &FrameBuffer) -> Result<()>;

    /// Signal that no more frames will be pushed on this route.
    fn send_eos(&self, route: &SinkRoute) -> Result<()>;

    /// Hand a mosaic output its shared background frame.
    fn push_background(&self, output: &str, frame: &FrameBuffer) -> Result<()>;
}
