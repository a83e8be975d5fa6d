// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use super::InputId;
use crate::core::config::InputDecl;
use crate::core::error::ConfigError;

/// A capture source, shared by every flow that names it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    pub id: InputId,
    pub name: String,
    pub source: String,
    pub width: u32,
    pub height: u32,
    /// `num/den`, when declared.
    pub framerate: Option<String>,
    pub loop_on_end: bool,
    pub format: String,
    pub index: u32,
    pub drop: bool,
}

impl InputSpec {
    pub(crate) fn from_decl(id: InputId, name: &str, decl: &InputDecl) -> Result<Self, ConfigError> {
        let context = format!("input {}", name);
        let width = positive_dimension(&context, "width", decl.width)?;
        let height = positive_dimension(&context, "height", decl.height)?;
        let framerate = decl
            .framerate
            .as_ref()
            .map(|rate| rate.as_fraction())
            .transpose()
            .map_err(|reason| ConfigError::malformed(&context, "framerate", reason))?;

        Ok(Self {
            id,
            name: name.to_string(),
            source: decl.source.clone(),
            width,
            height,
            framerate,
            loop_on_end: decl.loop_on_end,
            format: decl.format.clone(),
            index: decl.index,
            drop: decl.drop,
        })
    }
}

pub(crate) fn positive_dimension(context: &str, field: &str, value: i64) -> Result<u32, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::malformed(
            context,
            field,
            format!("must be positive, got {}", value),
        ));
    }
    u32::try_from(value)
        .map_err(|_| ConfigError::malformed(context, field, format!("{} is too large", value)))
}
