// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Flow graph resolution and mosaic layout.

mod flow_spec;
mod mosaic;
mod resolver;

pub use flow_spec::{
    DebugWindow, FlowSpec, OutputSlotRef, SensorRegion, SinkRoute, SubFlowBinding, SubFlowSpec,
};
pub use mosaic::{DisplaySlot, MosaicLayoutValidator, MosaicRegion, Rect, SlotId};
pub use resolver::{FlowGraph, FlowGraphResolver};
