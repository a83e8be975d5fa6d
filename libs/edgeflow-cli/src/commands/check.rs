// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::Path;

use anyhow::Result;
use edgeflow::FlowGraph;
use serde_json::{json, Value};

/// Validate a configuration and print the resolved graph.
pub fn run(config: &Path, as_json: bool) -> Result<()> {
    let graph = super::load_graph(config)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&graph_json(&graph))?);
    } else {
        print!("{}", graph.describe());
        println!(
            "OK: {} flow(s), {} subflow(s)",
            graph.flows().len(),
            graph.subflow_count()
        );
    }
    Ok(())
}

fn graph_json(graph: &FlowGraph) -> Value {
    let registry = graph.registry();
    let outputs: Vec<Value> = registry
        .outputs()
        .iter()
        .map(|output| {
            json!({
                "name": output.name,
                "sink": output.sink,
                "width": output.width,
                "height": output.height,
                "mosaic": output.mosaic_enabled(),
                "slots": output.slots(),
            })
        })
        .collect();
    let subflows: Vec<Value> = graph
        .subflows()
        .map(|sub| {
            json!({
                "instance_id": sub.instance_id,
                "input": registry.input(sub.input).name,
                "model": registry.model(sub.model).name,
                "title": sub.title,
                "sensor": sub.sensor,
                "pre_proc": sub.pre_proc_endpoint,
                "sensor_endpoint": sub.sensor_endpoint,
                "route": sub.route,
            })
        })
        .collect();

    json!({
        "title": graph.title(),
        "outputs": outputs,
        "subflows": subflows,
        "debug": graph.debug_window(),
    })
}
