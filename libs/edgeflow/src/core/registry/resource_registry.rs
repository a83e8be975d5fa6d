// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Arena of de-duplicated resources.

use super::{InputId, InputSpec, ModelId, ModelSpec, OutputId, OutputSpec, TargetAllocator};
use crate::core::config::FlowConfigFile;
use crate::core::error::{ConfigError, ResourceKind};

/// Owns every input, model and output the flow table references.
///
/// Each declared name is instantiated once no matter how many flows name it;
/// everything else holds ids into these arenas. Ids are dense and follow the
/// order names first appear in the flow table.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    inputs: Vec<InputSpec>,
    models: Vec<ModelSpec>,
    outputs: Vec<OutputSpec>,
    targets: TargetAllocator,
}

impl ResourceRegistry {
    /// Walk the flow table and instantiate every referenced resource once.
    pub fn resolve(config: &FlowConfigFile) -> Result<Self, ConfigError> {
        let mut registry = Self {
            targets: TargetAllocator::new(config.runtime.inferer_core_ids.clone()),
            ..Self::default()
        };

        for (flow_name, entry) in &config.flows {
            registry.intern_input(config, flow_name, &entry.input)?;
            registry.intern_model(config, flow_name, &entry.model)?;
            registry.intern_output(config, flow_name, &entry.output)?;
        }

        tracing::debug!(
            "Resolved {} input(s), {} model(s), {} output(s)",
            registry.inputs.len(),
            registry.models.len(),
            registry.outputs.len()
        );
        Ok(registry)
    }

    fn intern_input(
        &mut self,
        config: &FlowConfigFile,
        flow: &str,
        name: &str,
    ) -> Result<InputId, ConfigError> {
        if let Some(id) = self.input_id(name) {
            return Ok(id);
        }
        let decl = config
            .input(name)
            .ok_or_else(|| undefined(flow, ResourceKind::Input, name))?;
        let id = InputId(self.inputs.len() as u32);
        self.inputs.push(InputSpec::from_decl(id, name, decl)?);
        Ok(id)
    }

    fn intern_model(
        &mut self,
        config: &FlowConfigFile,
        flow: &str,
        name: &str,
    ) -> Result<ModelId, ConfigError> {
        if let Some(id) = self.model_id(name) {
            return Ok(id);
        }
        let decl = config
            .model(name)
            .ok_or_else(|| undefined(flow, ResourceKind::Model, name))?;
        let id = ModelId(self.models.len() as u32);
        self.models.push(ModelSpec::from_decl(id, name, decl)?);
        Ok(id)
    }

    fn intern_output(
        &mut self,
        config: &FlowConfigFile,
        flow: &str,
        name: &str,
    ) -> Result<OutputId, ConfigError> {
        if let Some(id) = self.output_id(name) {
            return Ok(id);
        }
        let decl = config
            .output(name)
            .ok_or_else(|| undefined(flow, ResourceKind::Output, name))?;
        let id = OutputId(self.outputs.len() as u32);
        self.outputs.push(OutputSpec::from_decl(id, name, decl)?);
        Ok(id)
    }

    pub fn input_id(&self, name: &str) -> Option<InputId> {
        self.inputs.iter().find(|i| i.name == name).map(|i| i.id)
    }

    pub fn model_id(&self, name: &str) -> Option<ModelId> {
        self.models.iter().find(|m| m.name == name).map(|m| m.id)
    }

    pub fn output_id(&self, name: &str) -> Option<OutputId> {
        self.outputs.iter().find(|o| o.name == name).map(|o| o.id)
    }

    pub fn input(&self, id: InputId) -> &InputSpec {
        &self.inputs[id.index()]
    }

    pub fn model(&self, id: ModelId) -> &ModelSpec {
        &self.models[id.index()]
    }

    pub fn output(&self, id: OutputId) -> &OutputSpec {
        &self.outputs[id.index()]
    }

    pub(crate) fn output_mut(&mut self, id: OutputId) -> &mut OutputSpec {
        &mut self.outputs[id.index()]
    }

    /// Inputs in first-appearance order.
    pub fn inputs(&self) -> &[InputSpec] {
        &self.inputs
    }

    pub fn models(&self) -> &[ModelSpec] {
        &self.models
    }

    pub fn outputs(&self) -> &[OutputSpec] {
        &self.outputs
    }

    pub fn targets(&self) -> &TargetAllocator {
        &self.targets
    }
}

fn undefined(flow: &str, kind: ResourceKind, name: &str) -> ConfigError {
    tracing::error!("[{}] Invalid {} [{}] specified", flow, kind, name);
    ConfigError::UndefinedReference {
        flow: flow.to_string(),
        kind,
        name: name.to_string(),
    }
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
    clip:
        source: clip.mp4
        width: 640
        height: 480
models:
    ssd:
        model_path: /models/ssd
    resnet:
        model_path: /models/resnet/
outputs:
    screen:
        sink: kmssink
        width: 1920
        height: 1080
flows:
    flow0: [clip, resnet, screen, [0, 0, 640, 480]]
    flow1: [cam, ssd, screen, [640, 0, 640, 360]]
    flow2: [clip, ssd, screen, [0, 480, 640, 480]]
"#;

    #[test]
    fn test_shared_names_resolve_once() {
        let config = FlowConfigFile::from_yaml_str(CONFIG).unwrap();
        let registry = ResourceRegistry::resolve(&config).unwrap();
        assert_eq!(registry.inputs().len(), 2);
        assert_eq!(registry.models().len(), 2);
        assert_eq!(registry.outputs().len(), 1);
    }

    #[test]
    fn test_ids_follow_first_appearance() {
        let config = FlowConfigFile::from_yaml_str(CONFIG).unwrap();
        let registry = ResourceRegistry::resolve(&config).unwrap();
        assert_eq!(registry.input_id("clip").map(InputId::get), Some(0));
        assert_eq!(registry.input_id("cam").map(InputId::get), Some(1));
        assert_eq!(registry.model_id("resnet").map(ModelId::get), Some(0));
        assert_eq!(registry.model_id("ssd").map(ModelId::get), Some(1));
    }

    #[test]
    fn test_undefined_reference_names_flow() {
        let text = CONFIG.replace("flow1: [cam, ssd", "flow1: [cam, yolo");
        let config = FlowConfigFile::from_yaml_str(&text).unwrap();
        let err = ResourceRegistry::resolve(&config).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UndefinedReference {
                flow: "flow1".into(),
                kind: ResourceKind::Model,
                name: "yolo".into(),
            }
        );
    }

    #[test]
    fn test_unreferenced_declarations_are_skipped() {
        let text = CONFIG.replace("flow2: [clip, ssd, screen, [0, 480, 640, 480]]", "");
        let text = text.replace("flow1: [cam, ssd, screen, [640, 0, 640, 360]]", "");
        let config = FlowConfigFile::from_yaml_str(&text).unwrap();
        let registry = ResourceRegistry::resolve(&config).unwrap();
        assert_eq!(registry.inputs().len(), 1);
        assert!(registry.input_id("cam").is_none());
        assert!(registry.model_id("ssd").is_none());
    }
}
