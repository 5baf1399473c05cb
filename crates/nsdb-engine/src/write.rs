// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::path::Path;
use std::sync::Arc;

use nsdb_catalog::SchemaRegistry;
use nsdb_cluster::ClusterView;
use nsdb_commitlog::CommitLog;
use nsdb_core::{Error, Result};
use nsdb_metadata::MetadataStore;
use nsdb_storage::Predicate;
use nsdb_type::Record;

use crate::ast::{Condition, DeleteStatement};
use crate::dispatch::RemoteDispatch;
use crate::read::extract_range;
use crate::shard_cache::ShardCache;

/// Reply to [`WriteCoordinator::map_input`] (spec.md §4.5 `MapInput`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InputMapped {
	Mapped,
}

/// One per-(db, namespace) write coordinator (spec.md §4.5, C5). Shaped
/// as a plain async struct rather than a literal actor — the same split
/// `crates/engine` keeps between its inner engine and its message-passing
/// wrapper (`nsdb-network`/`nsdb-server` drive this from an `mpsc` loop;
/// this type stays directly unit-testable without one).
pub struct WriteCoordinator {
	namespace: String,
	cluster: Arc<dyn ClusterView>,
	schema: Arc<SchemaRegistry>,
	metadata: Arc<MetadataStore>,
	shards: Arc<ShardCache>,
	commit_log: Option<Arc<CommitLog>>,
	dispatch: Option<Arc<dyn RemoteDispatch>>,
}

impl WriteCoordinator {
	pub fn new(
		namespace: impl Into<String>,
		cluster: Arc<dyn ClusterView>,
		schema: Arc<SchemaRegistry>,
		metadata: Arc<MetadataStore>,
		shards: Arc<ShardCache>,
		commit_log: Option<Arc<CommitLog>>,
		dispatch: Option<Arc<dyn RemoteDispatch>>,
	) -> Self {
		Self { namespace: namespace.into(), cluster, schema, metadata, shards, commit_log, dispatch }
	}

	/// `MapInput(timestamp, db, namespace, metric, record)` (spec.md
	/// §4.5). The algorithm is implemented verbatim:
	/// 1. derive the candidate schema from `record`;
	/// 2. evolve the registry, rejecting atomically on conflict;
	/// 3. resolve the owning shard `Location`;
	/// 4. write locally or forward to the owner;
	/// 5. append to the commit log if enabled;
	/// 6. reply `InputMapped`.
	///
	/// A later shard-append failure does *not* roll back step 2 — the
	/// schema evolution is additive and harmless (spec.md §4.5 "Failure
	/// handling").
	#[tracing::instrument(skip(self, record), fields(namespace = %self.namespace, metric), level = "trace")]
	pub async fn map_input(&self, metric: &str, record: Record) -> Result<InputMapped> {
		let candidate = record.candidate_schema(metric);
		let schema = self.schema.update(metric, candidate)?;

		let loc = self.metadata.locate(metric, record.timestamp)?;

		if loc.node_id != self.cluster.self_id() {
			let Some(dispatch) = &self.dispatch else {
				return Err(Error::Unavailable(loc.node_id));
			};
			dispatch.forward_write(&loc.node_id, &self.namespace, metric, record.clone()).await?;
		} else {
			let shard = self.shards.open(metric, &loc, &schema).await?;
			let mut writer = shard.acquire_writer().await;
			writer.write(&schema, &record).map_err(|err| {
				tracing::warn!(metric, error = %err, "shard append failed after schema evolution");
				err
			})?;
		}

		if let Some(log) = &self.commit_log {
			log.append(metric, &record).await?;
		}

		Ok(InputMapped::Mapped)
	}

	/// `ExecuteDeleteStatement(namespace, statement)` (spec.md §4.5):
	/// translates the residual predicate (spec.md §4.3) and deletes
	/// matches from every shard whose time range could hold them.
	#[tracing::instrument(skip(self, statement), fields(namespace = %self.namespace), level = "trace")]
	pub async fn execute_delete(&self, statement: &DeleteStatement) -> Result<()> {
		let metric = &statement.metric;
		let Some(schema) = self.schema.get(metric) else {
			return Err(Error::MetricNotFound(metric.clone()));
		};

		let predicate = statement.condition.as_ref().map(Condition::to_predicate).unwrap_or(Predicate::All);
		let (lo, hi) = statement.condition.as_ref().map(extract_range).unwrap_or((i64::MIN, i64::MAX));
		let locations = self.metadata.locations_overlapping(metric, lo, hi);

		for loc in locations {
			if loc.node_id != self.cluster.self_id() {
				let Some(dispatch) = &self.dispatch else {
					return Err(Error::Unavailable(loc.node_id));
				};
				dispatch
					.forward_delete(&loc.node_id, &self.namespace, metric, loc.bin_index, predicate.clone())
					.await?;
				continue;
			}
			let shard = self.shards.open(metric, &loc, &schema).await?;
			let mut writer = shard.acquire_writer().await;
			writer.delete_by_query(&schema, &predicate)?;
		}
		Ok(())
	}

	/// `DropMetric(namespace, metric)` (spec.md §4.5): deletes the
	/// schema, every shard directory, and the metric's location
	/// metadata. Idempotent — a second call finds nothing left to
	/// remove and succeeds the same way (spec.md §8 "Idempotent drop");
	/// a subsequent write recreates the schema via `map_input`.
	#[tracing::instrument(skip(self), fields(namespace = %self.namespace), level = "trace")]
	pub async fn drop_metric(&self, metric: &str) -> Result<()> {
		self.schema.delete(metric)?;
		self.shards.drop_metric(metric)?;
		self.metadata.drop_metric(metric)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use nsdb_cluster::StaticClusterView;
	use nsdb_storage::CmpOp;

	async fn fixture() -> (tempfile::TempDir, WriteCoordinator) {
		let dir = tempfile::tempdir().unwrap();
		let cluster: Arc<dyn ClusterView> = Arc::new(StaticClusterView::single_node("node-a"));
		let schema = Arc::new(SchemaRegistry::open(dir.path()).unwrap());
		let metadata = Arc::new(MetadataStore::open(dir.path(), cluster.clone(), 1_000_000).unwrap());
		let shards = Arc::new(ShardCache::new(dir.path()));
		let coordinator = WriteCoordinator::new("ns", cluster, schema, metadata, shards, None, None);
		(dir, coordinator)
	}

	#[tokio::test]
	async fn map_input_accepts_a_fresh_metric() {
		let (_dir, coordinator) = fixture().await;
		let record = Record::new(2, 1i64).with_dimension("name", "John").with_tag("surname", "Doe");
		let reply = coordinator.map_input("people", record).await.unwrap();
		assert_eq!(reply, InputMapped::Mapped);
	}

	#[tokio::test]
	async fn map_input_rejects_a_conflicting_schema() {
		let (_dir, coordinator) = fixture().await;
		coordinator.map_input("people", Record::new(2, 1i64).with_dimension("name", "John")).await.unwrap();
		let err = coordinator
			.map_input("people", Record::new(4, 1i64).with_dimension("name", 7i64))
			.await
			.unwrap_err();
		assert!(matches!(err, Error::SchemaConflict(_)));
	}

	#[tokio::test]
	async fn written_record_is_visible_through_the_shard_cache() {
		let (_dir, coordinator) = fixture().await;
		let record = Record::new(2, 1i64).with_dimension("name", "John");
		coordinator.map_input("people", record.clone()).await.unwrap();

		let schema = coordinator.schema.get("people").unwrap();
		let loc = coordinator.metadata.locate("people", 2).unwrap();
		let shard = coordinator.shards.open("people", &loc, &schema).await.unwrap();
		let reader = shard.snapshot();
		assert_eq!(reader.count().unwrap(), 1);
	}

	#[tokio::test]
	async fn drop_metric_is_idempotent_and_allows_recreation() {
		let (_dir, coordinator) = fixture().await;
		coordinator.map_input("people", Record::new(2, 1i64)).await.unwrap();
		coordinator.drop_metric("people").await.unwrap();
		coordinator.drop_metric("people").await.unwrap();
		assert!(coordinator.schema.get("people").is_none());

		coordinator.map_input("people", Record::new(2, 1i64)).await.unwrap();
		assert!(coordinator.schema.get("people").is_some());
	}

	#[tokio::test]
	async fn execute_delete_removes_matching_rows() {
		let (_dir, coordinator) = fixture().await;
		for ts in [2, 4, 6] {
			coordinator.map_input("people", Record::new(ts, 1i64)).await.unwrap();
		}
		let statement = DeleteStatement {
			namespace: "ns".into(),
			metric: "people".into(),
			condition: Some(Condition::Cmp("timestamp".into(), crate::ast::Op::Gte, nsdb_type::Scalar::I64(4))),
		};
		coordinator.execute_delete(&statement).await.unwrap();

		let schema = coordinator.schema.get("people").unwrap();
		let loc = coordinator.metadata.locate("people", 2).unwrap();
		let shard = coordinator.shards.open("people", &loc, &schema).await.unwrap();
		let reader = shard.snapshot();
		reader.reload().unwrap();
		assert_eq!(reader.count().unwrap(), 1);
		let _ = CmpOp::Gte;
	}
}
