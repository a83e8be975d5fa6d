// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Point-in-time statistics rows for reporting front-ends.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    /// Stage timing in milliseconds.
    ProcTime,
    /// Derived metric with its own unit.
    Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatSample {
    pub kind: StatKind,
    pub tag: String,
    pub unit: String,
    /// Running average.
    pub value: f64,
    pub samples: u64,
}

/// One subflow's statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRow {
    pub instance_id: u32,
    pub input: String,
    pub model_type: String,
    pub model_name: String,
    pub samples: Vec<StatSample>,
}

impl StatsRow {
    pub fn sample(&self, tag: &str) -> Option<&StatSample> {
        self.samples.iter().find(|s| s.tag == tag)
    }
}

/// Plain-text table, one block per subflow.
pub fn format_rows(rows: &[StatsRow]) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&format!(
            "[subflow {}] {} | {} | {}\n",
            row.instance_id, row.input, row.model_type, row.model_name
        ));
        for sample in &row.samples {
            out.push_str(&format!(
                "    {:<14} {:>10.2} {:<4} ({} samples)\n",
                sample.tag, sample.value, sample.unit, sample.samples
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_and_json() {
        let row = StatsRow {
            instance_id: 0,
            input: "cam".into(),
            model_type: "detection".into(),
            model_name: "ssd".into(),
            samples: vec![StatSample {
                kind: StatKind::Metric,
                tag: "framerate".into(),
                unit: "fps".into(),
                value: 29.5,
                samples: 10,
            }],
        };
        let text = format_rows(std::slice::from_ref(&row));
        assert!(text.contains("[subflow 0] cam | detection | ssd"));
        assert!(text.contains("framerate"));

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["samples"][0]["kind"], "metric");
        assert_eq!(row.sample("framerate").map(|s| s.samples), Some(10));
    }
}
