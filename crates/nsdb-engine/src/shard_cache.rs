// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use nsdb_core::Result;
use nsdb_metadata::Location;
use nsdb_storage::ShardIndex;
use nsdb_type::Schema;
use tokio::sync::Mutex;

/// Shared cache of opened `ShardIndex` instances, one per `Location`
/// (spec.md §3 "Shard indices: one per Location; opened on demand,
/// cached; closed when idle or on drop."). Both the write and read
/// coordinators hold a handle to the same cache, since a shard's writer
/// token and reader snapshot live on the same `ShardIndex` (spec.md
/// §4.3).
pub struct ShardCache {
	base_path: PathBuf,
	entries: DashMap<(String, i64), Entry>,
	open_lock: Mutex<()>,
}

struct Entry {
	shard: Arc<ShardIndex>,
	last_used: Instant,
}

impl ShardCache {
	pub fn new(base_path: impl Into<PathBuf>) -> Self {
		Self { base_path: base_path.into(), entries: DashMap::new(), open_lock: Mutex::new(()) }
	}

	pub fn shard_path(&self, metric: &str, bin_index: i64) -> PathBuf {
		self.base_path.join("shards").join(metric).join(bin_index.to_string())
	}

	/// Opens (or returns the cached) `ShardIndex` for `location`, built
	/// against `schema` as it stands right now (spec.md §4.3 "built...
	/// from the metric schema then in effect").
	pub async fn open(&self, metric: &str, location: &Location, schema: &Schema) -> Result<Arc<ShardIndex>> {
		let key = (metric.to_string(), location.bin_index);
		if let Some(mut entry) = self.entries.get_mut(&key) {
			entry.last_used = Instant::now();
			return Ok(entry.shard.clone());
		}

		// Serialises concurrent opens of the same (and different)
		// shards so two callers racing on a fresh bin don't both pay
		// `ShardIndex::open`'s directory creation; the fast path above
		// still avoids the lock entirely once cached.
		let _guard = self.open_lock.lock().await;
		if let Some(mut entry) = self.entries.get_mut(&key) {
			entry.last_used = Instant::now();
			return Ok(entry.shard.clone());
		}
		let path = self.shard_path(metric, location.bin_index);
		let shard = Arc::new(ShardIndex::open(&path, schema)?);
		self.entries.insert(key, Entry { shard: shard.clone(), last_used: Instant::now() });
		Ok(shard)
	}

	/// Drops every cached shard for `metric` and removes its directory
	/// tree (spec.md §3 "destroyed with their shard on drop").
	pub fn drop_metric(&self, metric: &str) -> Result<()> {
		self.entries.retain(|key, _| key.0 != metric);
		let dir = self.base_path.join("shards").join(metric);
		if dir.exists() {
			std::fs::remove_dir_all(dir)?;
		}
		Ok(())
	}

	/// Evicts cache entries untouched for longer than `ttl` and not
	/// otherwise referenced (spec.md §3 "closed when idle"). Intended
	/// to be driven by a periodic background tick, not called from the
	/// write/read hot path.
	pub fn evict_idle(&self, ttl: Duration) {
		let now = Instant::now();
		self.entries.retain(|_, entry| {
			Arc::strong_count(&entry.shard) > 1 || now.duration_since(entry.last_used) < ttl
		});
	}

	pub fn cached_count(&self) -> usize {
		self.entries.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use nsdb_cluster::NodeId;
	use nsdb_type::{DataType, FieldClass, SchemaField};

	fn schema() -> Schema {
		Schema::new(
			"cpu",
			vec![
				SchemaField::new("timestamp", FieldClass::Timestamp, DataType::BigInt),
				SchemaField::new("value", FieldClass::Value, DataType::BigInt),
			],
		)
		.unwrap()
	}

	fn location(bin_index: i64) -> Location {
		Location {
			metric: "cpu".into(),
			node_id: NodeId::from("node-a"),
			lower_ts: bin_index * 1000,
			upper_ts: bin_index * 1000 + 1000,
			bin_index,
		}
	}

	#[tokio::test]
	async fn reopening_the_same_location_returns_the_cached_instance() {
		let dir = tempfile::tempdir().unwrap();
		let cache = ShardCache::new(dir.path());
		let schema = schema();
		let a = cache.open("cpu", &location(0), &schema).await.unwrap();
		let b = cache.open("cpu", &location(0), &schema).await.unwrap();
		assert!(Arc::ptr_eq(&a, &b));
		assert_eq!(cache.cached_count(), 1);
	}

	#[tokio::test]
	async fn drop_metric_clears_cache_and_directory() {
		let dir = tempfile::tempdir().unwrap();
		let cache = ShardCache::new(dir.path());
		let schema = schema();
		cache.open("cpu", &location(0), &schema).await.unwrap();
		let path = cache.shard_path("cpu", 0);
		assert!(path.exists());
		cache.drop_metric("cpu").unwrap();
		assert_eq!(cache.cached_count(), 0);
		assert!(!path.exists());
	}
}
