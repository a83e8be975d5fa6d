// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Per-stage, per-frame text dumps for offline inspection.

use std::path::PathBuf;

use crate::core::error::Result;
use crate::core::graph::DebugWindow;

pub const DUMP_PRE_PROCESS: u32 = 0x1;
pub const DUMP_INFERENCE: u32 = 0x2;
pub const DUMP_POST_PROCESS: u32 = 0x4;
pub const DUMP_MASK_ALL: u32 = DUMP_PRE_PROCESS | DUMP_INFERENCE | DUMP_POST_PROCESS;

/// Pipeline stage a dump belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugStage {
    Pre,
    Inference,
    Post,
}

impl DebugStage {
    pub fn file_stem(self) -> &'static str {
        match self {
            DebugStage::Pre => "pre",
            DebugStage::Inference => "infer",
            DebugStage::Post => "post",
        }
    }

    pub fn mask_bit(self) -> u32 {
        match self {
            DebugStage::Pre => DUMP_PRE_PROCESS,
            DebugStage::Inference => DUMP_INFERENCE,
            DebugStage::Post => DUMP_POST_PROCESS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugDumpConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub stage: DebugStage,
    pub start_frame: u32,
    pub end_frame: u32,
    /// Added to the frame number in file names.
    pub start_frame_index: u32,
}

impl DebugDumpConfig {
    pub fn disabled(stage: DebugStage) -> Self {
        Self {
            enabled: false,
            dir: PathBuf::new(),
            stage,
            start_frame: 1,
            end_frame: i32::MAX as u32,
            start_frame_index: 0,
        }
    }

    /// Dump settings for one stage of one subflow. Files land in
    /// `{out_dir}/{input}/{model}`.
    pub fn for_stage(
        window: &DebugWindow,
        stage: DebugStage,
        input_name: &str,
        model_name: &str,
        start_frame_index: u32,
    ) -> Self {
        Self {
            enabled: window.mask & stage.mask_bit() != 0,
            dir: PathBuf::from(&window.out_dir)
                .join(input_name)
                .join(model_name),
            stage,
            start_frame: window.start_frame,
            end_frame: window.end_frame,
            start_frame_index,
        }
    }
}

/// Frame-numbered dump writer for one stage.
///
/// The frame counter starts at 1 and advances on every cycle, dumped or not.
#[derive(Debug)]
pub struct DebugDump {
    config: DebugDumpConfig,
    cur_frame: u32,
}

impl DebugDump {
    pub fn new(config: DebugDumpConfig) -> Result<Self> {
        if config.enabled {
            std::fs::create_dir_all(&config.dir)?;
        }
        Ok(Self {
            config,
            cur_frame: 1,
        })
    }

    pub fn disabled(stage: DebugStage) -> Self {
        Self {
            config: DebugDumpConfig::disabled(stage),
            cur_frame: 1,
        }
    }

    pub fn config(&self) -> &DebugDumpConfig {
        &self.config
    }

    pub fn current_frame(&self) -> u32 {
        self.cur_frame
    }

    /// Whether the current frame falls in the dump window.
    pub fn is_active(&self) -> bool {
        self.config.enabled
            && self.cur_frame >= self.config.start_frame
            && self.cur_frame <= self.config.end_frame
    }

    pub fn path_for_frame(&self, frame: u32) -> PathBuf {
        let number = frame.saturating_add(self.config.start_frame_index);
        self.config.dir.join(format!(
            "{}_{}.txt",
            self.config.stage.file_stem(),
            number
        ))
    }

    /// Write the current frame's dump if active, then advance the counter.
    /// `render` runs only when a file will be written.
    pub fn log_and_advance<F>(&mut self, render: F) -> Result<()>
    where
        F: FnOnce() -> String,
    {
        let result = if self.is_active() {
            let path = self.path_for_frame(self.cur_frame);
            std::fs::write(&path, render()).map_err(Into::into)
        } else {
            Ok(())
        };
        self.cur_frame = self.cur_frame.saturating_add(1);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(dir: &std::path::Path, mask: u32, start: u32, end: u32) -> DebugWindow {
        DebugWindow {
            mask,
            out_dir: dir.to_string_lossy().into_owned(),
            start_frame: start,
            end_frame: end,
        }
    }

    #[test]
    fn test_stage_enabled_by_mask_bit() {
        let w = window(std::path::Path::new("/tmp"), DUMP_PRE_PROCESS | DUMP_POST_PROCESS, 1, 10);
        assert!(DebugDumpConfig::for_stage(&w, DebugStage::Pre, "in", "m", 0).enabled);
        assert!(!DebugDumpConfig::for_stage(&w, DebugStage::Inference, "in", "m", 0).enabled);
        assert!(DebugDumpConfig::for_stage(&w, DebugStage::Post, "in", "m", 0).enabled);
    }

    #[test]
    fn test_dumps_only_inside_window() {
        let tmp = tempfile::tempdir().unwrap();
        let w = window(tmp.path(), DUMP_INFERENCE, 2, 3);
        let config = DebugDumpConfig::for_stage(&w, DebugStage::Inference, "cam", "ssd", 100);
        let dir = config.dir.clone();
        let mut dump = DebugDump::new(config).unwrap();

        for _ in 0..4 {
            dump.log_and_advance(|| "payload".to_string()).unwrap();
        }

        assert_eq!(dump.current_frame(), 5);
        assert!(!dir.join("infer_101.txt").exists());
        assert!(dir.join("infer_102.txt").exists());
        assert!(dir.join("infer_103.txt").exists());
        assert!(!dir.join("infer_104.txt").exists());
    }

    #[test]
    fn test_disabled_still_advances() {
        let mut dump = DebugDump::disabled(DebugStage::Post);
        dump.log_and_advance(|| unreachable!()).unwrap();
        assert_eq!(dump.current_frame(), 2);
    }
}
