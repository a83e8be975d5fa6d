// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use super::input_spec::positive_dimension;
use super::OutputId;
use crate::core::config::OutputDecl;
use crate::core::error::ConfigError;
use crate::core::graph::DisplaySlot;

/// Byte length of a background frame in `format`, or `None` for formats the
/// compositor does not pre-fill.
pub fn background_frame_len(format: &str, width: u32, height: u32) -> Option<usize> {
    let pixels = width as usize * height as usize;
    match format.to_ascii_uppercase().as_str() {
        "RGB" => Some(pixels * 3),
        "NV12" => Some(pixels * 3 / 2),
        "UYVY" => Some(pixels * 2),
        _ => None,
    }
}

/// A render sink, shared by every subflow that names it.
///
/// Each subflow that renders here registers one display slot. Slots are
/// appended in registration order and never renumbered.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
    pub id: OutputId,
    pub name: String,
    pub sink: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub title: Option<String>,
    pub(crate) mosaic_enabled: bool,
    pub(crate) slots: Vec<DisplaySlot>,
}

impl OutputSpec {
    pub(crate) fn from_decl(id: OutputId, name: &str, decl: &OutputDecl) -> Result<Self, ConfigError> {
        let context = format!("output {}", name);
        let width = positive_dimension(&context, "width", decl.width)?;
        let height = positive_dimension(&context, "height", decl.height)?;

        Ok(Self {
            id,
            name: name.to_string(),
            sink: decl.sink.clone(),
            width,
            height,
            format: decl.format.clone(),
            title: decl.title.clone(),
            mosaic_enabled: decl.mosaic,
            slots: Vec::new(),
        })
    }

    /// Whether several subflows may composite into this output. Turns false
    /// when the first registered subflow takes the whole frame.
    pub fn mosaic_enabled(&self) -> bool {
        self.mosaic_enabled
    }

    pub fn slots(&self) -> &[DisplaySlot] {
        &self.slots
    }

    /// Subflow titles in slot order.
    pub fn titles(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.title.as_str()).collect()
    }

    /// Size of the shared background frame, when one is needed.
    pub fn background_len(&self) -> Option<usize> {
        if !self.mosaic_enabled {
            return None;
        }
        background_frame_len(&self.format, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_sizes() {
        assert_eq!(background_frame_len("RGB", 4, 2), Some(24));
        assert_eq!(background_frame_len("nv12", 4, 2), Some(12));
        assert_eq!(background_frame_len("UYVY", 4, 2), Some(16));
        assert_eq!(background_frame_len("GRAY8", 4, 2), None);
    }

    #[test]
    fn test_non_positive_dimensions_rejected() {
        let decl = OutputDecl {
            sink: "kmssink".into(),
            width: 0,
            height: 720,
            mosaic: true,
            title: None,
            format: "RGB".into(),
        };
        let err = OutputSpec::from_decl(OutputId(0), "out", &decl).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedField { ref field, .. } if field == "width"));
    }
}
