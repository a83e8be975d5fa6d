// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Screen-space regions inside shared outputs.

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::core::registry::{InputSpec, OutputSpec};

/// Rectangle in output pixels. Signed so that bad declarations survive
/// parsing and can be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x, self.y, self.width, self.height)
    }
}

/// Where a subflow renders inside one output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MosaicRegion {
    pub rect: Rect,
    /// A disabled region covers the whole output.
    pub enabled: bool,
}

impl MosaicRegion {
    pub fn mosaic(rect: Rect) -> Self {
        Self {
            rect,
            enabled: true,
        }
    }

    /// A region that takes the full output frame.
    pub fn full_frame(output: &OutputSpec) -> Self {
        Self {
            rect: Rect::new(0, 0, output.width as i64, output.height as i64),
            enabled: false,
        }
    }

    /// Region for a flow-table entry rendering into `output`.
    pub fn for_entry(region: Option<[i64; 4]>, output: &OutputSpec) -> Self {
        match region {
            Some([x, y, w, h]) => Self::mosaic(Rect::new(x, y, w, h)),
            None => Self::full_frame(output),
        }
    }
}

/// Stable handle of a registered display slot within one output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub u32);

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

/// One subflow's registration against an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySlot {
    pub slot: SlotId,
    pub region: MosaicRegion,
    pub label: String,
    pub title: String,
}

/// Bounds checks and slot assignment for shared outputs.
///
/// Overlap between sibling regions is allowed; only the bounds below are
/// enforced.
pub struct MosaicLayoutValidator;

impl MosaicLayoutValidator {
    /// Check a region against the output it renders into and the input it
    /// was captured from.
    pub fn validate_region(
        flow: &str,
        region: &MosaicRegion,
        output: &OutputSpec,
        input: &InputSpec,
    ) -> Result<(), ConfigError> {
        let rect = region.rect;
        if rect.width <= 0 {
            return Err(ConfigError::invalid_mosaic(
                flow,
                format!("width {} must be positive", rect.width),
            ));
        }
        if rect.height <= 0 {
            return Err(ConfigError::invalid_mosaic(
                flow,
                format!("height {} must be positive", rect.height),
            ));
        }
        if rect.width > input.width as i64 || rect.height > input.height as i64 {
            return Err(ConfigError::invalid_mosaic(
                flow,
                format!(
                    "region {}x{} exceeds input '{}' resolution {}x{}",
                    rect.width, rect.height, input.name, input.width, input.height
                ),
            ));
        }
        if region.enabled {
            if rect.x < 0 || rect.y < 0 {
                return Err(ConfigError::invalid_mosaic(
                    flow,
                    format!("position ({}, {}) is outside output '{}'", rect.x, rect.y, output.name),
                ));
            }
            if rect.x + rect.width > output.width as i64 {
                return Err(ConfigError::invalid_mosaic(
                    flow,
                    format!(
                        "x + width ({} + {}) exceeds output '{}' width {}",
                        rect.x, rect.width, output.name, output.width
                    ),
                ));
            }
            if rect.y + rect.height > output.height as i64 {
                return Err(ConfigError::invalid_mosaic(
                    flow,
                    format!(
                        "y + height ({} + {}) exceeds output '{}' height {}",
                        rect.y, rect.height, output.name, output.height
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Append a slot to the output and return its id.
    ///
    /// A full-frame registration is only accepted as the first slot of an
    /// output, and it turns the output's mosaic off for good; likewise
    /// nothing may register after it.
    pub fn register_region(
        output: &mut OutputSpec,
        region: MosaicRegion,
        label: &str,
        title: &str,
    ) -> Result<SlotId, ConfigError> {
        if !region.enabled || !output.mosaic_enabled {
            if output.slots.is_empty() {
                output.mosaic_enabled = false;
            } else {
                tracing::error!(
                    "[{}] Output '{}' needs mosaic to support multiple subflows",
                    label,
                    output.name
                );
                return Err(ConfigError::AmbiguousMosaic {
                    output: output.name.clone(),
                    label: label.to_string(),
                });
            }
        }

        let slot = SlotId(output.slots.len() as u32);
        output.slots.push(DisplaySlot {
            slot,
            region,
            label: label.to_string(),
            title: title.to_string(),
        });
        tracing::debug!("[{}] Registered {} on output '{}'", label, slot, output.name);
        Ok(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{InputDecl, OutputDecl};
    use crate::core::registry::{InputId, OutputId};

    fn output(mosaic: bool) -> OutputSpec {
        let decl = OutputDecl {
            sink: "kmssink".into(),
            width: 1280,
            height: 720,
            mosaic,
            title: None,
            format: "RGB".into(),
        };
        OutputSpec::from_decl(OutputId(0), "screen", &decl).unwrap()
    }

    fn input() -> InputSpec {
        let decl = InputDecl {
            source: "/dev/video0".into(),
            width: 1920,
            height: 1080,
            framerate: None,
            loop_on_end: true,
            format: "auto".into(),
            index: 0,
            drop: true,
        };
        InputSpec::from_decl(InputId(0), "cam", &decl).unwrap()
    }

    #[test]
    fn test_region_past_right_edge_rejected() {
        let region = MosaicRegion::mosaic(Rect::new(1000, 0, 400, 300));
        let err = MosaicLayoutValidator::validate_region("flow0", &region, &output(true), &input())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMosaic { ref flow, .. } if flow == "flow0"));
    }

    #[test]
    fn test_region_inside_bounds_accepted() {
        let region = MosaicRegion::mosaic(Rect::new(640, 360, 640, 360));
        MosaicLayoutValidator::validate_region("flow0", &region, &output(true), &input()).unwrap();
    }

    #[test]
    fn test_non_positive_size_rejected() {
        for rect in [Rect::new(0, 0, 0, 100), Rect::new(0, 0, 100, -1)] {
            let region = MosaicRegion::mosaic(rect);
            assert!(
                MosaicLayoutValidator::validate_region("f", &region, &output(true), &input())
                    .is_err()
            );
        }
    }

    #[test]
    fn test_region_larger_than_capture_rejected() {
        let mut small = input();
        small.width = 320;
        small.height = 240;
        let region = MosaicRegion::mosaic(Rect::new(0, 0, 640, 360));
        assert!(
            MosaicLayoutValidator::validate_region("f", &region, &output(true), &small).is_err()
        );
    }

    #[test]
    fn test_slot_ids_are_sequential_and_stable() {
        let mut out = output(true);
        let a = MosaicRegion::mosaic(Rect::new(0, 0, 640, 360));
        let b = MosaicRegion::mosaic(Rect::new(640, 0, 640, 360));
        assert_eq!(
            MosaicLayoutValidator::register_region(&mut out, a, "flow0", "Model: a").unwrap(),
            SlotId(0)
        );
        assert_eq!(
            MosaicLayoutValidator::register_region(&mut out, b, "flow1", "Model: b").unwrap(),
            SlotId(1)
        );
        assert_eq!(out.slots()[0].label, "flow0");
        assert_eq!(out.titles(), vec!["Model: a", "Model: b"]);
        assert!(out.mosaic_enabled());
    }

    #[test]
    fn test_second_subflow_on_non_mosaic_output_rejected() {
        let mut out = output(false);
        let region = MosaicRegion::full_frame(&out);
        MosaicLayoutValidator::register_region(&mut out, region, "flow0", "t").unwrap();
        let err =
            MosaicLayoutValidator::register_region(&mut out, region, "flow1", "t").unwrap_err();
        assert_eq!(
            err,
            ConfigError::AmbiguousMosaic {
                output: "screen".into(),
                label: "flow1".into()
            }
        );
    }

    #[test]
    fn test_full_frame_first_disables_mosaic() {
        let mut out = output(true);
        let region = MosaicRegion::full_frame(&out);
        MosaicLayoutValidator::register_region(&mut out, region, "flow0", "t").unwrap();
        assert!(!out.mosaic_enabled());

        let tile = MosaicRegion::mosaic(Rect::new(0, 0, 10, 10));
        assert!(MosaicLayoutValidator::register_region(&mut out, tile, "flow1", "t").is_err());
    }
}
