// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The flow configuration document.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::flow_entry::FlowEntry;
use super::fraction::to_fraction;
use super::ordered;
use crate::core::error::ConfigError;

fn default_title() -> String {
    "edgeflow".to_string()
}

fn default_true() -> bool {
    true
}

fn default_format() -> String {
    "auto".to_string()
}

fn default_output_format() -> String {
    "RGB".to_string()
}

fn default_alpha() -> f32 {
    0.5
}

fn default_viz_threshold() -> f32 {
    0.5
}

fn default_top_n() -> usize {
    5
}

fn default_out_dir() -> String {
    "debug_out".to_string()
}

fn default_start_frame() -> u32 {
    1
}

fn default_end_frame() -> u32 {
    i32::MAX as u32
}

fn default_core_ids() -> Vec<u32> {
    vec![0]
}

fn default_pull_timeout_ms() -> u64 {
    2000
}

/// Frame rate as written in the document: a bare number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameRateDecl {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FrameRateDecl {
    /// The `num/den` form used by capture caps.
    pub fn as_fraction(&self) -> Result<String, String> {
        match self {
            Self::Integer(v) => to_fraction(&v.to_string()),
            Self::Float(v) => to_fraction(&v.to_string()),
            Self::Text(s) => to_fraction(s),
        }
    }
}

/// A capture source declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDecl {
    pub source: String,
    pub width: i64,
    pub height: i64,
    #[serde(default)]
    pub framerate: Option<FrameRateDecl>,
    /// Restart from the beginning on end-of-stream.
    #[serde(rename = "loop", default = "default_true")]
    pub loop_on_end: bool,
    #[serde(default = "default_format")]
    pub format: String,
    /// Frame-number offset applied to debug artifact names.
    #[serde(default)]
    pub index: u32,
    #[serde(default = "default_true")]
    pub drop: bool,
}

/// A model declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDecl {
    pub model_path: String,
    #[serde(default)]
    pub labels_path: Option<String>,
    /// Overrides the task type reported by the model artifact.
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default = "default_alpha")]
    pub alpha: f32,
    #[serde(default = "default_viz_threshold")]
    pub viz_threshold: f32,
    #[serde(rename = "topN", default = "default_top_n")]
    pub top_n: usize,
}

/// A render sink declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDecl {
    pub sink: String,
    pub width: i64,
    pub height: i64,
    #[serde(default = "default_true")]
    pub mosaic: bool,
    #[serde(default)]
    pub title: Option<String>,
    /// Pixel format of the shared background frame (`RGB`, `NV12`, `UYVY`).
    #[serde(default = "default_output_format")]
    pub format: String,
}

/// The optional `debug` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugDecl {
    /// Required when the section is present. Bits: 0x1 pre, 0x2 inference, 0x4 post.
    #[serde(default)]
    pub enable_mask: Option<u32>,
    #[serde(default = "default_out_dir")]
    pub out_dir: String,
    #[serde(default = "default_start_frame")]
    pub start_frame: u32,
    #[serde(default = "default_end_frame")]
    pub end_frame: u32,
}

/// The optional `runtime` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeDecl {
    /// Alias pre-processed capture memory as the model input instead of copying.
    #[serde(default)]
    pub zero_copy: bool,
    /// Inference cores handed out round-robin as models are loaded.
    #[serde(default = "default_core_ids")]
    pub inferer_core_ids: Vec<u32>,
    #[serde(default = "default_pull_timeout_ms")]
    pub pull_timeout_ms: u64,
}

impl Default for RuntimeDecl {
    fn default() -> Self {
        Self {
            zero_copy: false,
            inferer_core_ids: default_core_ids(),
            pull_timeout_ms: default_pull_timeout_ms(),
        }
    }
}

/// Root of a flow configuration document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlowConfigFile {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default, deserialize_with = "ordered::deserialize")]
    pub inputs: Vec<(String, InputDecl)>,

    #[serde(default, deserialize_with = "ordered::deserialize")]
    pub models: Vec<(String, ModelDecl)>,

    #[serde(default, deserialize_with = "ordered::deserialize")]
    pub outputs: Vec<(String, OutputDecl)>,

    /// Flow table in document order.
    #[serde(default, deserialize_with = "ordered::deserialize")]
    pub flows: Vec<(String, FlowEntry)>,

    #[serde(default)]
    pub debug: Option<DebugDecl>,

    #[serde(default)]
    pub runtime: RuntimeDecl,
}

impl FlowConfigFile {
    /// Parse a configuration document from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.check_sections()?;
        Ok(config)
    }

    /// Load a configuration document from disk.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read {}: {}", path.display(), e)))?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::Parse(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.check_sections()?;

        tracing::info!("Loaded flow config '{}' from {}", config.title, path.display());
        Ok(config)
    }

    fn check_sections(&self) -> Result<(), ConfigError> {
        if self.flows.is_empty() {
            return Err(ConfigError::MissingSection("flows".to_string()));
        }
        Ok(())
    }

    pub fn input(&self, name: &str) -> Option<&InputDecl> {
        lookup(&self.inputs, name)
    }

    pub fn model(&self, name: &str) -> Option<&ModelDecl> {
        lookup(&self.models, name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputDecl> {
        lookup(&self.outputs, name)
    }
}

fn lookup<'a, T>(table: &'a [(String, T)], name: &str) -> Option<&'a T> {
    table.iter().find(|(n, _)| n == name).map(|(_, decl)| decl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
title: "Two cameras"
inputs:
    input0:
        source: /dev/video2
        width: 1280
        height: 720
        framerate: 30
    input1:
        source: ./clip.mp4
        width: 1920
        height: 1080
        framerate: 0.5
        loop: false
        index: 10
models:
    model0:
        model_path: /opt/models/mobilenet/
        topN: 3
    model1:
        model_path: /opt/models/ssd
        viz_threshold: 0.6
outputs:
    output0:
        sink: kmssink
        width: 1920
        height: 1080
flows:
    flow0: [input1, model1, output0, [0, 0, 960, 540]]
    flow1: [input0, model0, output0, [960, 0, 640, 360]]
debug:
    enable_mask: 5
    out_dir: dumps
"#;

    #[test]
    fn test_parse_preserves_declaration_order() {
        let config = FlowConfigFile::from_yaml_str(SAMPLE).unwrap();
        let inputs: Vec<_> = config.inputs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(inputs, vec!["input0", "input1"]);
        let flows: Vec<_> = config.flows.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(flows, vec!["flow0", "flow1"]);
        assert_eq!(config.flows[0].1.input, "input1");
    }

    #[test]
    fn test_defaults_applied() {
        let config = FlowConfigFile::from_yaml_str(SAMPLE).unwrap();
        let input0 = config.input("input0").unwrap();
        assert!(input0.loop_on_end);
        assert_eq!(input0.format, "auto");
        assert_eq!(input0.index, 0);

        let model1 = config.model("model1").unwrap();
        assert_eq!(model1.top_n, 5);
        assert!((model1.alpha - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.model("model0").unwrap().top_n, 3);

        let output0 = config.output("output0").unwrap();
        assert!(output0.mosaic);
        assert_eq!(output0.format, "RGB");

        let debug = config.debug.as_ref().unwrap();
        assert_eq!(debug.enable_mask, Some(5));
        assert_eq!(debug.start_frame, 1);
        assert_eq!(debug.end_frame, i32::MAX as u32);

        assert_eq!(config.runtime, RuntimeDecl::default());
    }

    #[test]
    fn test_framerate_normalized() {
        let config = FlowConfigFile::from_yaml_str(SAMPLE).unwrap();
        let rate = |name: &str| {
            config
                .input(name)
                .and_then(|i| i.framerate.as_ref())
                .map(|f| f.as_fraction())
        };
        assert_eq!(rate("input0"), Some(Ok("30/1".to_string())));
        assert_eq!(rate("input1"), Some(Ok("5/10".to_string())));
    }

    #[test]
    fn test_missing_flows_section() {
        let err = FlowConfigFile::from_yaml_str("title: empty\n").unwrap_err();
        assert_eq!(err, ConfigError::MissingSection("flows".to_string()));
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let text = "flows:\n  f0: [a, b, c]\n  f0: [a, b, d]\n";
        assert!(matches!(
            FlowConfigFile::from_yaml_str(text),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = FlowConfigFile::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.title, "Two cameras");
        assert_eq!(config.models.len(), 2);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.yaml");
        match FlowConfigFile::from_yaml_file(&path) {
            Err(ConfigError::Parse(msg)) => assert!(msg.contains("nope.yaml")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
