// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use nsdb_cluster::ClusterView;
use nsdb_core::Result;

use crate::location::{Location, MetricInfo};
use crate::placement::place;

/// Per-(db, namespace) location/metric-info metadata (spec.md §4.4). The
/// authoritative store is a small replicated map keyed by
/// `(metric, bin_index)`; here it is a `DashMap` flushed to a postcard
/// file on every mutation and loaded on actor start, matching the "tiny
/// per-node replicated map" language of the spec.
pub struct MetadataStore {
	locations: DashMap<(String, i64), Location>,
	metric_info: DashMap<String, MetricInfo>,
	cluster: Arc<dyn ClusterView>,
	default_interval_millis: u64,
	locations_path: PathBuf,
	metric_info_path: PathBuf,
}

impl MetadataStore {
	pub fn open(base_path: &Path, cluster: Arc<dyn ClusterView>, default_interval_millis: u64) -> Result<Self> {
		let dir = base_path.join("metadata");
		std::fs::create_dir_all(&dir)?;
		let locations_path = dir.join("locations.postcard");
		let metric_info_path = dir.join("metric_info.postcard");

		let locations = DashMap::new();
		if let Ok(bytes) = std::fs::read(&locations_path) {
			if let Ok(restored) = postcard::from_bytes::<Vec<Location>>(&bytes) {
				for loc in restored {
					locations.insert((loc.metric.clone(), loc.bin_index), loc);
				}
			}
		}

		let metric_info = DashMap::new();
		if let Ok(bytes) = std::fs::read(&metric_info_path) {
			if let Ok(restored) = postcard::from_bytes::<Vec<MetricInfo>>(&bytes) {
				for info in restored {
					metric_info.insert(info.metric.clone(), info);
				}
			}
		}

		Ok(Self { locations, metric_info, cluster, default_interval_millis, locations_path, metric_info_path })
	}

	/// Sets the shard interval for a metric the first time it is seen;
	/// further calls are idempotent no-ops — boundaries are frozen once
	/// set (spec.md §3 "MetricInfo").
	pub fn put_metric_info(&self, metric: &str, interval_millis: u64) -> Result<MetricInfo> {
		if let Some(existing) = self.metric_info.get(metric) {
			return Ok(existing.clone());
		}
		let info = MetricInfo { metric: metric.to_string(), shard_interval_millis: interval_millis };
		self.metric_info.insert(metric.to_string(), info.clone());
		self.flush_metric_info()?;
		Ok(info)
	}

	pub fn shard_interval(&self, metric: &str) -> u64 {
		self.metric_info.get(metric).map(|i| i.shard_interval_millis).unwrap_or(self.default_interval_millis)
	}

	/// Returns the `Location` owning `ts`, creating it if absent
	/// (spec.md §4.4 "locate"). The bin index is `floor(ts / interval)`.
	pub fn locate(&self, metric: &str, ts: i64) -> Result<Location> {
		let interval = self.shard_interval(metric) as i64;
		let interval = interval.max(1);
		let bin_index = ts.div_euclid(interval);
		let key = (metric.to_string(), bin_index);

		if let Some(existing) = self.locations.get(&key) {
			return Ok(existing.clone());
		}

		let lower_ts = bin_index * interval;
		let upper_ts = lower_ts + interval;
		let members = self.cluster.members();
		let node_id = place(metric, bin_index, &members).unwrap_or_else(|| self.cluster.self_id());
		let location = Location { metric: metric.to_string(), node_id, lower_ts, upper_ts, bin_index };

		self.locations.insert(key, location.clone());
		self.flush_locations()?;
		Ok(location)
	}

	/// The set of bins overlapping `[lo, hi]` that already exist
	/// (spec.md §4.4 "locationsOverlapping") — a read never creates a
	/// bin, only a write does.
	pub fn locations_overlapping(&self, metric: &str, lo: i64, hi: i64) -> Vec<Location> {
		let mut found: Vec<Location> = self
			.locations
			.iter()
			.filter(|entry| entry.key().0 == metric && entry.value().overlaps(lo, hi))
			.map(|entry| entry.value().clone())
			.collect();
		found.sort_by_key(|loc| loc.bin_index);
		found
	}

	pub fn locations_for(&self, metric: &str) -> Vec<Location> {
		let mut found: Vec<Location> =
			self.locations.iter().filter(|e| e.key().0 == metric).map(|e| e.value().clone()).collect();
		found.sort_by_key(|loc| loc.bin_index);
		found
	}

	pub fn drop_metric(&self, metric: &str) -> Result<()> {
		self.locations.retain(|key, _| key.0 != metric);
		self.metric_info.remove(metric);
		self.flush_locations()?;
		self.flush_metric_info()?;
		Ok(())
	}

	fn flush_locations(&self) -> Result<()> {
		let all: Vec<Location> = self.locations.iter().map(|e| e.value().clone()).collect();
		let bytes = postcard::to_allocvec(&all).map_err(|e| nsdb_core::error::io_error(e))?;
		std::fs::write(&self.locations_path, bytes)?;
		Ok(())
	}

	fn flush_metric_info(&self) -> Result<()> {
		let all: Vec<MetricInfo> = self.metric_info.iter().map(|e| e.value().clone()).collect();
		let bytes = postcard::to_allocvec(&all).map_err(|e| nsdb_core::error::io_error(e))?;
		std::fs::write(&self.metric_info_path, bytes)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use nsdb_cluster::StaticClusterView;

	fn store(dir: &Path) -> MetadataStore {
		MetadataStore::open(dir, Arc::new(StaticClusterView::single_node("node-a")), 1000).unwrap()
	}

	#[test]
	fn locate_bins_by_floor_division() {
		let dir = tempfile::tempdir().unwrap();
		let store = store(dir.path());
		let loc = store.locate("cpu", 2500).unwrap();
		assert_eq!(loc.lower_ts, 2000);
		assert_eq!(loc.upper_ts, 3000);
	}

	#[test]
	fn boundary_timestamp_belongs_to_upper_bin() {
		let dir = tempfile::tempdir().unwrap();
		let store = store(dir.path());
		let loc = store.locate("cpu", 3000).unwrap();
		assert_eq!(loc.lower_ts, 3000);
		assert!(loc.contains(3000));
		assert!(!loc.contains(2999));
	}

	#[test]
	fn locate_is_idempotent_for_the_same_bin() {
		let dir = tempfile::tempdir().unwrap();
		let store = store(dir.path());
		let a = store.locate("cpu", 100).unwrap();
		let b = store.locate("cpu", 900).unwrap();
		assert_eq!(a, b);
	}

	#[test]
	fn overlapping_only_returns_existing_bins() {
		let dir = tempfile::tempdir().unwrap();
		let store = store(dir.path());
		store.locate("cpu", 500).unwrap();
		store.locate("cpu", 2500).unwrap();
		let overlap = store.locations_overlapping("cpu", 0, 10_000);
		assert_eq!(overlap.len(), 2);
		let none = store.locations_overlapping("other", 0, 10_000);
		assert!(none.is_empty());
	}

	#[test]
	fn put_metric_info_is_append_only() {
		let dir = tempfile::tempdir().unwrap();
		let store = store(dir.path());
		let first = store.put_metric_info("cpu", 500).unwrap();
		assert_eq!(first.shard_interval_millis, 500);
		let second = store.put_metric_info("cpu", 999).unwrap();
		assert_eq!(second.shard_interval_millis, 500, "interval must stay frozen");
	}

	#[test]
	fn drop_metric_clears_its_locations() {
		let dir = tempfile::tempdir().unwrap();
		let store = store(dir.path());
		store.locate("cpu", 500).unwrap();
		store.drop_metric("cpu").unwrap();
		assert!(store.locations_for("cpu").is_empty());
	}
}
