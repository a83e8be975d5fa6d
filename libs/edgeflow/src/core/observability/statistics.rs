// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Per-subflow running averages of timings and metrics.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::snapshots::{StatKind, StatSample, StatsRow};
use crate::core::error::StatsError;

/// Mean of every sample seen so far.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunningAverage {
    pub value: f64,
    pub samples: u64,
}

impl RunningAverage {
    pub fn push(&mut self, sample: f64) {
        let n = self.samples as f64;
        self.value = (self.value * n + sample) / (n + 1.0);
        self.samples += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricValue {
    pub unit: String,
    pub average: RunningAverage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatEntry {
    pub instance_id: u32,
    pub input_name: String,
    pub model_type: String,
    pub model_name: String,
    pub proc_times: BTreeMap<String, RunningAverage>,
    pub metrics: BTreeMap<String, MetricValue>,
}

/// Table of statistics keyed by subflow instance id.
///
/// Each entry has exactly one writer (its executor). The table itself takes
/// concurrent inserts at startup and concurrent reads from a reporter.
#[derive(Debug, Default)]
pub struct StatisticsAggregator {
    entries: RwLock<BTreeMap<u32, Arc<Mutex<StatEntry>>>>,
}

impl StatisticsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(
        &self,
        id: u32,
        input_name: &str,
        model_type: &str,
        model_name: &str,
    ) -> Result<(), StatsError> {
        let mut entries = self.entries.write();
        if entries.contains_key(&id) {
            return Err(StatsError::DuplicateKey(id));
        }
        entries.insert(
            id,
            Arc::new(Mutex::new(StatEntry {
                instance_id: id,
                input_name: input_name.to_string(),
                model_type: model_type.to_string(),
                model_name: model_name.to_string(),
                proc_times: BTreeMap::new(),
                metrics: BTreeMap::new(),
            })),
        );
        Ok(())
    }

    fn entry(&self, id: u32) -> Result<Arc<Mutex<StatEntry>>, StatsError> {
        self.entries
            .read()
            .get(&id)
            .cloned()
            .ok_or(StatsError::UnknownKey(id))
    }

    /// Fold a timing sample (milliseconds) into the entry's average for `tag`.
    pub fn report_proc_time(&self, id: u32, tag: &str, value: f64) -> Result<(), StatsError> {
        let entry = self.entry(id)?;
        let mut entry = entry.lock();
        let avg = entry.proc_times.entry(tag.to_string()).or_default();
        avg.push(value);
        tracing::trace!("[subflow {}] {} = {:.3} ms (avg {:.3})", id, tag, value, avg.value);
        Ok(())
    }

    /// Fold a metric sample into the entry's average for `tag`.
    pub fn report_metric(
        &self,
        id: u32,
        tag: &str,
        unit: &str,
        value: f64,
    ) -> Result<(), StatsError> {
        let entry = self.entry(id)?;
        let mut entry = entry.lock();
        let metric = entry
            .metrics
            .entry(tag.to_string())
            .or_insert_with(|| MetricValue {
                unit: unit.to_string(),
                average: RunningAverage::default(),
            });
        metric.average.push(value);
        tracing::trace!(
            "[subflow {}] {} = {:.3} {} (avg {:.3})",
            id,
            tag,
            value,
            unit,
            metric.average.value
        );
        Ok(())
    }

    pub fn proc_time(&self, id: u32, tag: &str) -> Option<RunningAverage> {
        let entry = self.entry(id).ok()?;
        let entry = entry.lock();
        entry.proc_times.get(tag).copied()
    }

    pub fn metric(&self, id: u32, tag: &str) -> Option<MetricValue> {
        let entry = self.entry(id).ok()?;
        let entry = entry.lock();
        entry.metrics.get(tag).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of every entry, ordered by instance id.
    pub fn snapshot(&self) -> Vec<StatsRow> {
        let entries: Vec<Arc<Mutex<StatEntry>>> = self.entries.read().values().cloned().collect();
        entries
            .iter()
            .map(|entry| {
                let entry = entry.lock();
                let mut samples: Vec<StatSample> = entry
                    .proc_times
                    .iter()
                    .map(|(tag, avg)| StatSample {
                        kind: StatKind::ProcTime,
                        tag: tag.clone(),
                        unit: "ms".to_string(),
                        value: avg.value,
                        samples: avg.samples,
                    })
                    .collect();
                samples.extend(entry.metrics.iter().map(|(tag, metric)| StatSample {
                    kind: StatKind::Metric,
                    tag: tag.clone(),
                    unit: metric.unit.clone(),
                    value: metric.average.value,
                    samples: metric.average.samples,
                }));
                StatsRow {
                    instance_id: entry.instance_id,
                    input: entry.input_name.clone(),
                    model_type: entry.model_type.clone(),
                    model_name: entry.model_name.clone(),
                    samples,
                }
            })
            .collect()
    }
}
