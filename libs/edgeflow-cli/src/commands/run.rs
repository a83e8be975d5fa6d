// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::RecvTimeoutError;
use edgeflow::synthetic::{
    RecordingPainter, SyntheticModelLoader, SyntheticPipeline, SyntheticPipelineConfig,
};
use edgeflow::{format_rows, FlowRuntime, StatsReporter};

pub struct RunOptions {
    pub frames: Option<u64>,
    pub fps: f64,
    pub model_size: u32,
    pub stats_interval: u64,
    pub json: bool,
}

/// Run the graph until every input ends or Ctrl+C.
pub fn run(config: &Path, options: RunOptions) -> Result<()> {
    let graph = super::load_graph(config)?;

    let mut loader = SyntheticModelLoader::new(options.model_size, options.model_size);
    for model in graph.registry().models() {
        if let Some(task) = model.task_override {
            loader = loader.with_task(model.model_path.clone(), task);
        }
    }

    let frame_interval = if options.fps > 0.0 {
        Duration::from_secs_f64(1.0 / options.fps)
    } else {
        Duration::ZERO
    };
    let pipeline = Arc::new(SyntheticPipeline::from_graph(
        &graph,
        SyntheticPipelineConfig {
            frames_per_input: options.frames,
            pre_proc_len: loader.input_len(),
            frame_interval,
            ..Default::default()
        },
    ));

    let mut runtime = FlowRuntime::build(
        graph,
        pipeline.clone(),
        &loader,
        Arc::new(RecordingPainter::new()),
    )
    .context("Failed to build runtime")?;

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .context("Failed to install Ctrl+C handler")?;

    let reporter = StatsReporter::spawn(
        runtime.statistics(),
        Duration::from_secs(options.stats_interval.max(1)),
    )?;

    runtime.start().context("Failed to start runtime")?;
    println!(
        "Running {} subflow(s) from {} (Ctrl+C to stop)",
        runtime.graph().subflow_count(),
        config.display()
    );

    loop {
        match stop_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                tracing::info!("Stop requested");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                if runtime.is_finished() {
                    tracing::info!("All subflows finished");
                    break;
                }
            }
        }
    }

    runtime.send_exit_signal();
    let exit = runtime.wait_for_exit();
    reporter.stop();

    let rows = runtime.statistics().snapshot();
    if options.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", format_rows(&rows));
    }
    for sub in runtime.graph().subflows() {
        tracing::debug!(
            "[subflow {}] {} frames pushed to {}",
            sub.instance_id,
            pipeline.pushed(&sub.route.endpoint),
            sub.route.endpoint
        );
    }

    exit.context("Runtime did not shut down cleanly")
}
