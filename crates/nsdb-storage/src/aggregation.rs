// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use nsdb_type::Scalar;
use serde::{Deserialize, Serialize};

/// The aggregators a grouped query may request (spec.md §4.3
/// "groupedAggregation"). Aggregations only apply to the `value` field.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Aggregator {
	Sum,
	Count,
	Min,
	Max,
	Avg,
}

impl Aggregator {
	pub fn parse(name: &str) -> Option<Self> {
		Some(match name.to_ascii_lowercase().as_str() {
			"sum" => Aggregator::Sum,
			"count" => Aggregator::Count,
			"min" => Aggregator::Min,
			"max" => Aggregator::Max,
			"avg" => Aggregator::Avg,
			_ => return None,
		})
	}
}

/// One shard's partial aggregate for one group key (spec.md §4.3
/// "one synthetic record per group"). Always carries `sum`/`count`/
/// `min`/`max` regardless of which aggregator the caller asked for, so
/// the read coordinator's cross-shard merge (spec.md §4.6.1) has the
/// count channel `avg` needs to reduce correctly — this is the "shards
/// also return count" branch spec.md §4.6.1 allows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupAggregate {
	pub key: Scalar,
	pub sum: f64,
	pub count: u64,
	pub min: f64,
	pub max: f64,
}

impl GroupAggregate {
	pub fn new(key: Scalar, first: f64) -> Self {
		Self { key, sum: first, count: 1, min: first, max: first }
	}

	pub fn accumulate(&mut self, v: f64) {
		self.sum += v;
		self.count += 1;
		self.min = self.min.min(v);
		self.max = self.max.max(v);
	}

	/// Merges another shard's partial for the same group key.
	pub fn merge(&mut self, other: &GroupAggregate) {
		self.sum += other.sum;
		self.count += other.count;
		self.min = self.min.min(other.min);
		self.max = self.max.max(other.max);
	}

	/// Finalises this (possibly cross-shard-merged) partial into the
	/// scalar value requested by `aggregator`.
	pub fn finalize(&self, aggregator: Aggregator) -> Scalar {
		match aggregator {
			Aggregator::Sum => Scalar::Decimal(self.sum),
			Aggregator::Count => Scalar::I64(self.count as i64),
			Aggregator::Min => Scalar::Decimal(self.min),
			Aggregator::Max => Scalar::Decimal(self.max),
			Aggregator::Avg => Scalar::Decimal(self.sum / self.count as f64),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accumulate_tracks_sum_count_min_max() {
		let mut agg = GroupAggregate::new(Scalar::Str("John".into()), 2.0);
		agg.accumulate(5.0);
		agg.accumulate(1.0);
		assert_eq!(agg.sum, 8.0);
		assert_eq!(agg.count, 3);
		assert_eq!(agg.min, 1.0);
		assert_eq!(agg.max, 5.0);
	}

	#[test]
	fn merge_combines_two_shard_partials_for_avg() {
		let mut a = GroupAggregate::new(Scalar::Str("John".into()), 2.0);
		a.accumulate(4.0);
		let mut b = GroupAggregate::new(Scalar::Str("John".into()), 6.0);
		a.merge(&b);
		b.accumulate(0.0);
		assert_eq!(a.count, 3);
		assert_eq!(a.sum, 12.0);
		assert_eq!(a.finalize(Aggregator::Avg), Scalar::Decimal(4.0));
	}
}
