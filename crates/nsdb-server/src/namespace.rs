// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::path::{Path, PathBuf};
use std::sync::Arc;

use nsdb_catalog::SchemaRegistry;
use nsdb_cluster::ClusterView;
use nsdb_commitlog::CommitLog;
use nsdb_core::Result;
use nsdb_engine::{ReadCoordinator, RemoteDispatch, ShardCache, WriteCoordinator};
use nsdb_metadata::MetadataStore;
use nsdb_storage::ShardIndex;

/// The schema/shard/metadata actors and the write/read coordinators for
/// one (db, namespace) pair (spec.md §4.7 C7 "per-(db,namespace) schema
/// and shard-directory actors"). Opened lazily on first use by the
/// [`crate::Guardian`] and cached for the lifetime of the process.
pub struct NamespaceActor {
	pub db: String,
	pub namespace: String,
	pub schema: Arc<SchemaRegistry>,
	pub metadata: Arc<MetadataStore>,
	pub shards: Arc<ShardCache>,
	pub commit_log: Option<Arc<CommitLog>>,
	pub write: WriteCoordinator,
	pub read: ReadCoordinator,
}

impl NamespaceActor {
	#[allow(clippy::too_many_arguments)]
	pub async fn open(
		base_path: &Path,
		db: &str,
		namespace: &str,
		cluster: Arc<dyn ClusterView>,
		default_interval_millis: u64,
		commit_log_enabled: bool,
		dispatch: Option<Arc<dyn RemoteDispatch>>,
	) -> Result<Self> {
		let root: PathBuf = base_path.join(db).join(namespace);
		std::fs::create_dir_all(&root)?;

		let schema = Arc::new(SchemaRegistry::open(&root)?);
		let metadata = Arc::new(MetadataStore::open(&root, cluster.clone(), default_interval_millis)?);
		let shards = Arc::new(ShardCache::new(&root));
		let commit_log =
			if commit_log_enabled { Some(Arc::new(CommitLog::open(&root.join("commitlog")).await?)) } else { None };

		let write = WriteCoordinator::new(
			namespace.to_string(),
			cluster.clone(),
			schema.clone(),
			metadata.clone(),
			shards.clone(),
			commit_log.clone(),
			dispatch.clone(),
		);
		let read = ReadCoordinator::new(namespace.to_string(), cluster, schema.clone(), metadata.clone(), shards.clone(), dispatch);

		Ok(Self { db: db.to_string(), namespace: namespace.to_string(), schema, metadata, shards, commit_log, write, read })
	}

	/// Opens (or returns the cached) shard for the exact bin `bin_index`
	/// belongs to — used by the guardian's `forward_*` handlers, which
	/// address a shard directly rather than re-deriving it from a
	/// timestamp (spec.md §4.5 step 4, §4.6 step 4).
	pub async fn shard_for_bin(&self, metric: &str, bin_index: i64) -> Result<Arc<ShardIndex>> {
		let interval = self.metadata.shard_interval(metric).max(1) as i64;
		let ts = bin_index * interval;
		let loc = self.metadata.locate(metric, ts)?;
		let schema = self
			.schema
			.get(metric)
			.ok_or_else(|| nsdb_core::Error::MetricNotFound(metric.to_string()))?;
		self.shards.open(metric, &loc, &schema).await
	}
}
