// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Looping inputs read by several subflows at once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::{Duration, Instant};

use edgeflow::synthetic::{
    RecordingPainter, SyntheticModelLoader, SyntheticPipeline, SyntheticPipelineConfig,
};
use edgeflow::{FlowConfigFile, FlowGraph, FlowRuntime, SharedInputCoordinator};

const LOOPING: &str = r#"
inputs:
  cam: { source: /opt/videos/street.mp4, width: 16, height: 12, loop: true }
models:
  a: { model_path: /opt/models/a }
  b: { model_path: /opt/models/b }
  c: { model_path: /opt/models/c }
  d: { model_path: /opt/models/d }
outputs:
  display: { sink: kmssink, width: 32, height: 24 }
flows:
  fa: [cam, a, display, [0, 0, 16, 12]]
  fb: [cam, b, display, [16, 0, 16, 12]]
  fc: [cam, c, display, [0, 12, 16, 12]]
  fd: [cam, d, display, [16, 12, 16, 12]]
"#;

#[test]
fn test_one_seek_in_flight_per_input() {
    let config = FlowConfigFile::from_yaml_str(LOOPING).unwrap();
    let graph = FlowGraph::from_config(&config).unwrap();
    assert_eq!(graph.subflow_count(), 4);

    let loader = SyntheticModelLoader::new(4, 4);
    let pipeline = Arc::new(SyntheticPipeline::from_graph(
        &graph,
        SyntheticPipelineConfig {
            frames_per_input: Some(3),
            pre_proc_len: loader.input_len(),
            seek_delay: Duration::from_millis(2),
            ..Default::default()
        },
    ));
    let mut runtime = FlowRuntime::build(
        graph,
        pipeline.clone(),
        &loader,
        Arc::new(RecordingPainter::new()),
    )
    .unwrap();

    runtime.start().unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    while pipeline.seek_count("cam") < 5 {
        assert!(Instant::now() < deadline, "input never looped");
        std::thread::sleep(Duration::from_millis(5));
    }
    runtime.send_exit_signal();
    runtime.wait_for_exit().unwrap();

    assert_eq!(pipeline.max_concurrent_seeks(), 1);
    for n in 0..4 {
        let endpoint = format!("flow0_post_proc{}", n);
        assert!(pipeline.pushed(&endpoint) > 0, "{} starved", endpoint);
        assert!(pipeline.eos_received(&endpoint));
    }
}

#[test]
fn test_simultaneous_end_of_stream_seeks_once() {
    let coordinator = Arc::new(SharedInputCoordinator::new("cam"));
    let seeks = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(6));

    // Every subflow saw end-of-stream at the same generation.
    let observed = coordinator.generation();
    let workers: Vec<_> = (0..6)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            let seeks = Arc::clone(&seeks);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                coordinator
                    .reset_once(observed, || {
                        seeks.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(1));
                        Ok(())
                    })
                    .unwrap()
            })
        })
        .collect();

    let rewound: usize = workers
        .into_iter()
        .map(|w| usize::from(w.join().unwrap()))
        .sum();
    assert_eq!(rewound, 1);
    assert_eq!(seeks.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.generation(), observed + 1);
}
