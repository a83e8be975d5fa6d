// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use thiserror::Error;

/// Startup-time configuration failures.
///
/// Always fatal: they are reported before any executor thread starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("[{flow}] Undefined {kind} '{name}'")]
    UndefinedReference {
        flow: String,
        kind: ResourceKind,
        name: String,
    },

    #[error("[{flow}] Invalid mosaic: {reason}")]
    InvalidMosaic { flow: String, reason: String },

    #[error("Output '{output}' is shared by more than one subflow ('{label}') but mosaic is disabled")]
    AmbiguousMosaic { output: String, label: String },

    #[error("[{context}] Malformed field '{field}': {reason}")]
    MalformedField {
        context: String,
        field: String,
        reason: String,
    },

    #[error("Missing configuration section '{0}'")]
    MissingSection(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl ConfigError {
    pub(crate) fn malformed(
        context: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedField {
            context: context.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_mosaic(flow: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMosaic {
            flow: flow.into(),
            reason: reason.into(),
        }
    }
}

/// Which declaration section a flow reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Input,
    Model,
    Output,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Model => write!(f, "model"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// Statistics table invariant violations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsError {
    #[error("An entry for the key [{0}] already exists")]
    DuplicateKey(u32),

    #[error("Key [{0}] not found")]
    UnknownKey(u32),
}

#[derive(Error, Debug)]
pub enum EdgeFlowError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error("Runtime I/O error: {0}")]
    RuntimeIo(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EdgeFlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages_name_the_flow() {
        let err = ConfigError::UndefinedReference {
            flow: "flow0".into(),
            kind: ResourceKind::Model,
            name: "mobilenet".into(),
        };
        assert_eq!(err.to_string(), "[flow0] Undefined model 'mobilenet'");

        let err = ConfigError::invalid_mosaic("flow1", "width must be positive");
        assert_eq!(err.to_string(), "[flow1] Invalid mosaic: width must be positive");
    }

    #[test]
    fn test_config_error_converts_into_crate_error() {
        let err: EdgeFlowError = ConfigError::MissingSection("flows".into()).into();
        assert!(matches!(err, EdgeFlowError::Config(ConfigError::MissingSection(_))));
    }
}
