// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod reporter;
mod snapshots;
mod statistics;

pub use reporter::StatsReporter;
pub use snapshots::{format_rows, StatKind, StatSample, StatsRow};
pub use statistics::{MetricValue, RunningAverage, StatEntry, StatisticsAggregator};
