// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

//! Shared test fixtures (spec.md's own literal scenarios, §8), grounded
//! on the `create_test_engine`/`create_namespace`/`create_table`
//! helpers of the teacher's `crates/engine/tests/bulk_insert` and its
//! `test_identity` convention. Every fixture here returns a
//! `tempfile::TempDir` alongside the thing it built so the directory
//! stays alive for the caller's test.

use std::sync::Arc;

use clap::Parser;
use nsdb_cluster::{ClusterView, StaticClusterView};
use nsdb_core::Config;
use nsdb_server::Guardian;
use nsdb_type::Record;

/// A single-node cluster view named `node-a`, sufficient for any test
/// that never exercises cross-node forwarding (spec.md §4.4).
pub fn test_cluster() -> Arc<dyn ClusterView> {
	Arc::new(StaticClusterView::single_node("node-a"))
}

/// A `Config` rooted at `base_path`, with every other field at its
/// built-in default (spec.md §6 "Configuration").
pub fn test_config(base_path: &std::path::Path) -> Config {
	let mut config = Config::parse_from(["nsdb-server"]);
	config.index_base_path = base_path.to_path_buf();
	config
}

/// A freshly opened [`Guardian`] backed by a temp directory, single-node
/// clustered, commit log enabled, with no remote dispatch configured
/// (every `Location` therefore resolves to `self`). Mirrors the
/// teacher's `create_test_engine()` convention.
pub fn create_test_guardian() -> (tempfile::TempDir, Arc<Guardian>) {
	let dir = tempfile::tempdir().expect("tempdir");
	let config = test_config(dir.path());
	let guardian = Arc::new(Guardian::new(&config, test_cluster(), None));
	(dir, guardian)
}

/// `InitMetric(db, namespace, metric, shard_interval)` (spec.md §6),
/// awaited through a freshly opened namespace — the fixture equivalent
/// of the teacher's `create_namespace`/`create_table` pair, collapsed
/// into one call since NSDB has no separate DDL for namespaces.
pub async fn init_metric(guardian: &Guardian, db: &str, namespace: &str, metric: &str, shard_interval_millis: u64) {
	let actor = guardian.open_namespace(db, namespace).await.expect("open namespace");
	actor.metadata.put_metric_info(metric, shard_interval_millis).expect("put metric info");
}

/// Seeds the literal `people` scenario of spec.md §8: five records at
/// timestamps `{2,4,6,8,10}`, all `value=1`, `surname="Doe"`, names
/// `{John,John,Bill,Frank,Frank}`.
pub async fn seed_people(guardian: &Guardian, db: &str, namespace: &str) {
	let actor = guardian.open_namespace(db, namespace).await.expect("open namespace");
	let names = ["John", "John", "Bill", "Frank", "Frank"];
	for (i, ts) in [2, 4, 6, 8, 10].into_iter().enumerate() {
		let record = Record::new(ts, 1i64).with_dimension("name", names[i]).with_tag("surname", "Doe");
		actor.write.map_input("people", record).await.expect("map_input");
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn seeded_people_is_queryable_through_sql() {
		let (_dir, guardian) = create_test_guardian();
		seed_people(&guardian, "db", "ns").await;
		let rows = guardian.execute_sql("db", "ns", "SELECT * FROM people LIMIT 5").await.unwrap();
		assert_eq!(rows.len(), 5);
	}
}
