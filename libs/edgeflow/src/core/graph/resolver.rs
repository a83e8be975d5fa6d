// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Turns the flow table into flows, subflows and display slots.

use super::flow_spec::{
    post_proc_endpoint, pre_proc_endpoint, sensor_endpoint, DebugWindow, FlowSpec, OutputSlotRef,
    SensorRegion, SinkRoute, SubFlowBinding, SubFlowSpec,
};
use super::mosaic::{MosaicLayoutValidator, MosaicRegion};
use crate::core::config::{FlowConfigFile, FlowEntry, RuntimeDecl};
use crate::core::debug::DUMP_MASK_ALL;
use crate::core::error::{ConfigError, ResourceKind};
use crate::core::registry::{InputId, ModelId, ResourceRegistry};

/// The resolved, validated flow graph. Immutable once built.
#[derive(Debug)]
pub struct FlowGraph {
    title: String,
    registry: ResourceRegistry,
    flows: Vec<FlowSpec>,
    debug: DebugWindow,
    runtime: RuntimeDecl,
}

impl FlowGraph {
    /// Resolve the registry and build the graph in one step.
    pub fn from_config(config: &FlowConfigFile) -> Result<Self, ConfigError> {
        let registry = ResourceRegistry::resolve(config)?;
        FlowGraphResolver::build(config, registry)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn flows(&self) -> &[FlowSpec] {
        &self.flows
    }

    pub fn subflows(&self) -> impl Iterator<Item = &SubFlowSpec> + '_ {
        self.flows.iter().flat_map(|f| f.subflows.iter())
    }

    pub fn subflow_count(&self) -> usize {
        self.flows.iter().map(|f| f.subflows.len()).sum()
    }

    pub fn debug_window(&self) -> &DebugWindow {
        &self.debug
    }

    pub fn runtime(&self) -> &RuntimeDecl {
        &self.runtime
    }

    /// Number of subflows reading from `input`.
    pub fn input_consumers(&self, input: InputId) -> usize {
        self.subflows().filter(|s| s.input == input).count()
    }

    /// Number of subflows running `model`.
    pub fn model_users(&self, model: ModelId) -> usize {
        self.subflows().filter(|s| s.model == model).count()
    }

    /// Human-readable listing of every resource, flow, slot and endpoint.
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for FlowGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = &self.registry;
        writeln!(f, "Flow graph '{}'", self.title)?;

        writeln!(f, "Inputs:")?;
        for input in registry.inputs() {
            writeln!(
                f,
                "  [{}] {}: source={} {}x{} framerate={} loop={} format={} consumers={}",
                input.id,
                input.name,
                input.source,
                input.width,
                input.height,
                input.framerate.as_deref().unwrap_or("-"),
                input.loop_on_end,
                input.format,
                self.input_consumers(input.id)
            )?;
        }

        writeln!(f, "Models:")?;
        for model in registry.models() {
            let task = model
                .task_override
                .map(|t| t.to_string())
                .unwrap_or_else(|| "from artifact".to_string());
            writeln!(
                f,
                "  [{}] {}: path={} name={} task={} users={}",
                model.id,
                model.name,
                model.model_path,
                model.model_name(),
                task,
                self.model_users(model.id)
            )?;
        }

        writeln!(f, "Outputs:")?;
        for output in registry.outputs() {
            writeln!(
                f,
                "  [{}] {}: sink={} {}x{} format={} mosaic={}",
                output.id,
                output.name,
                output.sink,
                output.width,
                output.height,
                output.format,
                output.mosaic_enabled()
            )?;
            for slot in output.slots() {
                writeln!(
                    f,
                    "    {}: {} {} \"{}\"",
                    slot.slot, slot.region.rect, slot.label, slot.title
                )?;
            }
        }

        writeln!(f, "Flows:")?;
        for flow in &self.flows {
            writeln!(
                f,
                "  flow{} '{}' <- {}",
                flow.index,
                flow.name,
                registry.input(flow.input).name
            )?;
            for sub in &flow.subflows {
                let outputs: Vec<&str> = sub
                    .outputs()
                    .map(|o| registry.output(o).name.as_str())
                    .collect();
                writeln!(
                    f,
                    "    subflow {}: model {} -> [{}] sensor {}",
                    sub.instance_id,
                    registry.model(sub.model).name,
                    outputs.join(", "),
                    sub.sensor
                )?;
                writeln!(
                    f,
                    "      pull {}, {}; push {}",
                    sub.pre_proc_endpoint, sub.sensor_endpoint, sub.route.endpoint
                )?;
            }
        }

        if self.debug.is_enabled() {
            writeln!(
                f,
                "Debug: mask=0x{:x} dir={} frames {}..={}",
                self.debug.mask, self.debug.out_dir, self.debug.start_frame, self.debug.end_frame
            )?;
        }
        Ok(())
    }
}

/// Builds a [`FlowGraph`] from a configuration and its resolved registry.
pub struct FlowGraphResolver;

impl FlowGraphResolver {
    /// Group the flow table by input (in first-appearance order), then by
    /// model, validate each subflow's regions and register its display slots.
    pub fn build(
        config: &FlowConfigFile,
        mut registry: ResourceRegistry,
    ) -> Result<FlowGraph, ConfigError> {
        let debug = Self::debug_window(config)?;

        let input_order: Vec<(InputId, String)> = registry
            .inputs()
            .iter()
            .map(|i| (i.id, i.name.clone()))
            .collect();

        let mut flows = Vec::with_capacity(input_order.len());
        let mut next_instance = 0u32;

        for (flow_index, (input_id, input_name)) in input_order.into_iter().enumerate() {
            let flow_index = flow_index as u32;
            let entries: Vec<&(String, FlowEntry)> = config
                .flows
                .iter()
                .filter(|(_, e)| e.input == input_name)
                .collect();
            let flow_name = entries
                .first()
                .map(|(name, _)| name.clone())
                .unwrap_or_else(|| input_name.clone());

            let mut subflows = Vec::new();
            for (sub_index, group) in group_by_model(&entries).into_iter().enumerate() {
                let subflow = Self::build_subflow(
                    &mut registry,
                    input_id,
                    flow_index,
                    sub_index as u32,
                    next_instance,
                    &group,
                    &debug,
                )?;
                next_instance += 1;
                subflows.push(subflow);
            }

            tracing::debug!(
                "[{}] Flow {} built with {} subflow(s)",
                flow_name,
                flow_index,
                subflows.len()
            );
            flows.push(FlowSpec {
                name: flow_name,
                index: flow_index,
                input: input_id,
                subflows,
            });
        }

        Ok(FlowGraph {
            title: config.title.clone(),
            registry,
            flows,
            debug,
            runtime: config.runtime.clone(),
        })
    }

    fn debug_window(config: &FlowConfigFile) -> Result<DebugWindow, ConfigError> {
        let Some(decl) = &config.debug else {
            return Ok(DebugWindow::disabled());
        };
        let mask = decl.enable_mask.ok_or_else(|| {
            tracing::error!("enable_mask needs to be set if debug is enabled");
            ConfigError::malformed("debug", "enable_mask", "required when debug is present")
        })?;
        let mask = if mask > DUMP_MASK_ALL {
            tracing::warn!(
                "Invalid debug enable mask 0x{:x}, disabling debug dumps",
                mask
            );
            0
        } else {
            mask
        };
        Ok(DebugWindow {
            mask,
            out_dir: decl.out_dir.clone(),
            start_frame: decl.start_frame,
            end_frame: decl.end_frame,
        })
    }

    fn build_subflow(
        registry: &mut ResourceRegistry,
        input_id: InputId,
        flow_index: u32,
        sub_index: u32,
        instance_id: u32,
        group: &[&(String, FlowEntry)],
        debug: &DebugWindow,
    ) -> Result<SubFlowSpec, ConfigError> {
        let (first_name, first_entry) = group[0];
        let model_id = registry.model_id(&first_entry.model).ok_or_else(|| {
            ConfigError::UndefinedReference {
                flow: first_name.clone(),
                kind: ResourceKind::Model,
                name: first_entry.model.clone(),
            }
        })?;
        let title = format!("Model: {}", registry.model(model_id).model_name());

        // Validate every region before any slot is registered.
        let mut sensor = SensorRegion::default();
        let mut pending = Vec::with_capacity(group.len());
        for (entry_name, entry) in group {
            let output_id = registry.output_id(&entry.output).ok_or_else(|| {
                ConfigError::UndefinedReference {
                    flow: entry_name.clone(),
                    kind: ResourceKind::Output,
                    name: entry.output.clone(),
                }
            })?;
            let output = registry.output(output_id);
            let region = MosaicRegion::for_entry(entry.region, output);
            MosaicLayoutValidator::validate_region(
                entry_name,
                &region,
                output,
                registry.input(input_id),
            )?;
            sensor = sensor.cover(&region);
            pending.push((output_id, region, entry_name.clone(), entry.debug_tag.clone()));
        }

        let mut bindings = Vec::with_capacity(pending.len());
        let mut slots = Vec::with_capacity(pending.len());
        for (output_id, region, entry_name, debug_tag) in pending {
            let output = registry.output_mut(output_id);
            let slot = MosaicLayoutValidator::register_region(output, region, &entry_name, &title)?;
            slots.push(OutputSlotRef {
                output: output.name.clone(),
                output_id,
                slot,
            });
            bindings.push(SubFlowBinding {
                output: output_id,
                region,
                slot,
                entry: entry_name,
                debug_tag,
            });
        }

        Ok(SubFlowSpec {
            instance_id,
            input: input_id,
            model: model_id,
            bindings,
            sensor,
            debug: debug.clone(),
            title,
            sensor_endpoint: sensor_endpoint(flow_index, sub_index),
            pre_proc_endpoint: pre_proc_endpoint(flow_index, sub_index),
            route: SinkRoute {
                endpoint: post_proc_endpoint(flow_index, sub_index),
                slots,
            },
        })
    }
}

/// Split one input's entries into per-model groups, keeping first-appearance
/// order of models and of entries within each group.
fn group_by_model<'a>(
    entries: &[&'a (String, FlowEntry)],
) -> Vec<Vec<&'a (String, FlowEntry)>> {
    let mut groups: Vec<Vec<&'a (String, FlowEntry)>> = Vec::new();
    for entry in entries {
        match groups.iter_mut().find(|g| g[0].1.model == entry.1.model) {
            Some(group) => group.push(*entry),
            None => groups.push(vec![*entry]),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
inputs:
    cam:
        source: /dev/video0
        width: 1280
        height: 720
models:
    ssd:
        model_path: /models/ssd
    resnet:
        model_path: /models/resnet
outputs:
    left:
        sink: kmssink
        width: 1920
        height: 1080
    right:
        sink: fakesink
        width: 1280
        height: 720
flows:
    f0: [cam, ssd, left, [0, 0, 640, 360]]
    f1: [cam, resnet, left, [640, 0, 640, 360]]
    f2: [cam, ssd, right, [0, 0, 1280, 720]]
"#;

    #[test]
    fn test_entries_grouped_by_model() {
        let config = FlowConfigFile::from_yaml_str(CONFIG).unwrap();
        let graph = FlowGraph::from_config(&config).unwrap();

        assert_eq!(graph.flows().len(), 1);
        let flow = &graph.flows()[0];
        assert_eq!(flow.name, "f0");
        assert_eq!(flow.subflows.len(), 2);

        let ssd = &flow.subflows[0];
        assert_eq!(graph.registry().model(ssd.model).name, "ssd");
        assert_eq!(ssd.bindings.len(), 2);
        assert_eq!(ssd.sensor, SensorRegion { width: 1280, height: 720 });
        assert_eq!(ssd.route.endpoint, "flow0_post_proc0");
        assert_eq!(ssd.route.slots.len(), 2);

        let resnet = &flow.subflows[1];
        assert_eq!(resnet.instance_id, 1);
        assert_eq!(resnet.pre_proc_endpoint, "flow0_pre_proc1");
        assert_eq!(resnet.bindings[0].slot, crate::core::graph::SlotId(1));
    }

    #[test]
    fn test_debug_section_requires_mask() {
        let text = format!("{}debug:\n    out_dir: dumps\n", CONFIG);
        let config = FlowConfigFile::from_yaml_str(&text).unwrap();
        let err = FlowGraph::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedField { ref field, .. } if field == "enable_mask"));
    }

    #[test]
    fn test_out_of_range_mask_disables_dumps() {
        let text = format!("{}debug:\n    enable_mask: 9\n", CONFIG);
        let config = FlowConfigFile::from_yaml_str(&text).unwrap();
        let graph = FlowGraph::from_config(&config).unwrap();
        assert!(!graph.debug_window().is_enabled());
    }

    #[test]
    fn test_describe_lists_endpoints_and_slots() {
        let config = FlowConfigFile::from_yaml_str(CONFIG).unwrap();
        let text = FlowGraph::from_config(&config).unwrap().describe();
        assert!(text.contains("flow0_sensor0"));
        assert!(text.contains("flow0_pre_proc1"));
        assert!(text.contains("\"Model: resnet\""));
        assert!(text.contains("consumers=2"));
    }
}
