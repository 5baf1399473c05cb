// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use nsdb_cluster::NodeId;
use serde::{Deserialize, Serialize};

/// One half-open time bin of one metric on one node (spec.md §3
/// "Shard / Location"). Invariant within a (db, namespace, metric): the
/// intervals of `Location`s partition the timeline into half-open bins
/// of width `shard_interval`, each placed on exactly one `node_id`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Location {
	pub metric: String,
	pub node_id: NodeId,
	pub lower_ts: i64,
	pub upper_ts: i64,
	pub bin_index: i64,
}

impl Location {
	/// Whether `ts` falls in `[lower_ts, upper_ts)` — the upper bound
	/// belongs to the next bin (spec.md §8 "timestamp equal to a bin
	/// boundary belongs to the upper bin").
	pub fn contains(&self, ts: i64) -> bool {
		ts >= self.lower_ts && ts < self.upper_ts
	}

	/// Whether `[lo, hi]` (inclusive) overlaps this bin's half-open
	/// range.
	pub fn overlaps(&self, lo: i64, hi: i64) -> bool {
		lo <= hi && lo < self.upper_ts && hi >= self.lower_ts
	}
}

/// `(metric, shard_interval_millis)` — mutation is append-only per
/// metric; once set, shard boundaries are frozen (spec.md §3
/// "MetricInfo").
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MetricInfo {
	pub metric: String,
	pub shard_interval_millis: u64,
}
