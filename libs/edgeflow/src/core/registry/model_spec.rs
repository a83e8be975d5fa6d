// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;

use parking_lot::Mutex;

use super::{ModelId, TargetAllocator};
use crate::core::config::ModelDecl;
use crate::core::error::{ConfigError, EdgeFlowError, Result};
use crate::core::processing::{ModelTunables, TaskKind, TaskType};
use crate::core::traits::{LoadedModel, ModelLoadRequest, ModelLoader};

/// Final path component of a model path, ignoring a trailing `/`.
pub fn model_name_from_path(model_path: &str) -> String {
    let trimmed = model_path.strip_suffix('/').unwrap_or(model_path);
    trimmed
        .rsplit('/')
        .next()
        .unwrap_or(trimmed)
        .to_string()
}

/// A model artifact, shared by every subflow that names it.
///
/// The engine handle is created on first use and reused afterwards.
#[derive(Debug)]
pub struct ModelSpec {
    pub id: ModelId,
    pub name: String,
    pub model_path: String,
    pub labels_path: Option<String>,
    pub task_override: Option<TaskType>,
    pub tunables: ModelTunables,
    loaded: Mutex<Option<Arc<LoadedModel>>>,
}

impl ModelSpec {
    pub(crate) fn from_decl(id: ModelId, name: &str, decl: &ModelDecl) -> std::result::Result<Self, ConfigError> {
        let context = format!("model {}", name);
        if decl.model_path.trim().is_empty() {
            return Err(ConfigError::malformed(&context, "model_path", "must not be empty"));
        }
        let task_override = decl
            .task_type
            .as_deref()
            .map(str::parse::<TaskType>)
            .transpose()
            .map_err(|reason| ConfigError::malformed(&context, "task_type", reason))?;
        if decl.top_n == 0 {
            return Err(ConfigError::malformed(&context, "topN", "must be at least 1"));
        }

        Ok(Self {
            id,
            name: name.to_string(),
            model_path: decl.model_path.clone(),
            labels_path: decl.labels_path.clone(),
            task_override,
            tunables: ModelTunables {
                alpha: decl.alpha,
                viz_threshold: decl.viz_threshold,
                top_n: decl.top_n,
            },
            loaded: Mutex::new(None),
        })
    }

    /// Name used for statistics and debug paths.
    pub fn model_name(&self) -> String {
        model_name_from_path(&self.model_path)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.lock().is_some()
    }

    /// The loaded engine, loading it on the first call.
    pub fn handle(
        &self,
        loader: &dyn ModelLoader,
        targets: &TargetAllocator,
    ) -> Result<Arc<LoadedModel>> {
        let mut slot = self.loaded.lock();
        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }

        let request = ModelLoadRequest {
            model_path: self.model_path.clone(),
            labels_path: self.labels_path.clone(),
            core_id: targets.next_core(),
        };
        let model = loader.load(&request).map_err(|e| match e {
            EdgeFlowError::ModelLoad(msg) => EdgeFlowError::ModelLoad(msg),
            other => EdgeFlowError::ModelLoad(format!("{}: {}", self.model_path, other)),
        })?;

        tracing::info!(
            "[{}] Loaded '{}' ({}) on core {}",
            self.id,
            self.model_name(),
            model.task_type,
            request.core_id
        );

        let model = Arc::new(model);
        *slot = Some(Arc::clone(&model));
        Ok(model)
    }

    /// Task kind after applying the configured override and tunables.
    pub fn task_kind(&self, loaded: &LoadedModel) -> TaskKind {
        let task_type = self.task_override.unwrap_or(loaded.task_type);
        TaskKind::new(task_type, &self.tunables)
    }
}
