// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use super::mosaic::{MosaicRegion, SlotId};
use crate::core::debug::DUMP_MASK_ALL;
use crate::core::registry::{InputId, ModelId, OutputId};

/// Working resolution of a subflow's post-processing: the largest width and
/// the largest height over the regions it renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SensorRegion {
    pub width: u32,
    pub height: u32,
}

impl SensorRegion {
    pub fn cover(self, region: &MosaicRegion) -> Self {
        Self {
            width: self.width.max(region.rect.width.max(0) as u32),
            height: self.height.max(region.rect.height.max(0) as u32),
        }
    }
}

impl std::fmt::Display for SensorRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Which stages dump debug artifacts, and for which frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugWindow {
    /// Bits: 0x1 pre, 0x2 inference, 0x4 post.
    pub mask: u32,
    pub out_dir: String,
    pub start_frame: u32,
    pub end_frame: u32,
}

impl DebugWindow {
    pub fn disabled() -> Self {
        Self {
            mask: 0,
            out_dir: "debug_out".to_string(),
            start_frame: 1,
            end_frame: i32::MAX as u32,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mask & DUMP_MASK_ALL != 0
    }
}

impl Default for DebugWindow {
    fn default() -> Self {
        Self::disabled()
    }
}

/// An output slot a subflow's frames are composited into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSlotRef {
    pub output: String,
    pub output_id: OutputId,
    pub slot: SlotId,
}

/// Where a subflow pushes its post-processed frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkRoute {
    pub endpoint: String,
    pub slots: Vec<OutputSlotRef>,
}

/// One output a subflow renders into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubFlowBinding {
    pub output: OutputId,
    pub region: MosaicRegion,
    pub slot: SlotId,
    /// Name of the flow-table entry that declared this binding.
    pub entry: String,
    pub debug_tag: Option<String>,
}

/// One model run against one input, rendering into one or more outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubFlowSpec {
    /// Process-wide id; keys statistics and names the executor thread.
    pub instance_id: u32,
    pub input: InputId,
    pub model: ModelId,
    pub bindings: Vec<SubFlowBinding>,
    pub sensor: SensorRegion,
    pub debug: DebugWindow,
    pub title: String,
    pub sensor_endpoint: String,
    pub pre_proc_endpoint: String,
    pub route: SinkRoute,
}

impl SubFlowSpec {
    pub fn outputs(&self) -> impl Iterator<Item = OutputId> + '_ {
        self.bindings.iter().map(|b| b.output)
    }
}

/// A capture input and the subflows that consume it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSpec {
    /// Name of the first flow-table entry for this input.
    pub name: String,
    pub index: u32,
    pub input: InputId,
    pub subflows: Vec<SubFlowSpec>,
}

pub(crate) fn sensor_endpoint(flow: u32, subflow: u32) -> String {
    format!("flow{}_sensor{}", flow, subflow)
}

pub(crate) fn pre_proc_endpoint(flow: u32, subflow: u32) -> String {
    format!("flow{}_pre_proc{}", flow, subflow)
}

pub(crate) fn post_proc_endpoint(flow: u32, subflow: u32) -> String {
    format!("flow{}_post_proc{}", flow, subflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::Rect;

    #[test]
    fn test_sensor_covers_largest_extent() {
        let a = MosaicRegion::mosaic(Rect::new(0, 0, 640, 200));
        let b = MosaicRegion::mosaic(Rect::new(640, 0, 320, 360));
        let sensor = SensorRegion::default().cover(&a).cover(&b);
        assert_eq!(sensor, SensorRegion { width: 640, height: 360 });
    }

    #[test]
    fn test_endpoint_names() {
        assert_eq!(sensor_endpoint(1, 0), "flow1_sensor0");
        assert_eq!(pre_proc_endpoint(0, 2), "flow0_pre_proc2");
        assert_eq!(post_proc_endpoint(3, 1), "flow3_post_proc1");
    }
}
