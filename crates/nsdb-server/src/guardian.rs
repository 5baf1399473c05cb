// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use nsdb_cluster::ClusterView;
use nsdb_core::{Config, Deadline, Error, Result};
use nsdb_engine::ast::{self, Statement};
use nsdb_engine::RemoteDispatch;
use nsdb_network::NsdbBackend;
use nsdb_storage::{GroupAggregate, Predicate, Projection, Sort};
use nsdb_type::{FieldClass, Record};

use crate::namespace::NamespaceActor;

/// The per-node guardian (spec.md §4.7, C7): owns one write coordinator,
/// one read coordinator, one metadata actor and per-(db, namespace)
/// schema/shard-directory actors for every namespace it has opened,
/// lazily constructing them on first use and caching them for the
/// lifetime of the process (spec.md §3 "Shard indices: ... opened on
/// demand, cached").
pub struct Guardian {
	base_path: PathBuf,
	default_interval_millis: u64,
	commit_log_enabled: bool,
	read_timeout: std::time::Duration,
	cluster: Arc<dyn ClusterView>,
	dispatch: Option<Arc<dyn RemoteDispatch>>,
	namespaces: DashMap<(String, String), Arc<NamespaceActor>>,
}

impl Guardian {
	pub fn new(config: &Config, cluster: Arc<dyn ClusterView>, dispatch: Option<Arc<dyn RemoteDispatch>>) -> Self {
		Self {
			base_path: config.index_base_path.clone(),
			default_interval_millis: config.sharding_interval_millis,
			commit_log_enabled: config.commit_log_enabled,
			read_timeout: config.read_coordinator_timeout,
			cluster,
			dispatch,
			namespaces: DashMap::new(),
		}
	}

	/// Lazily opens (or returns the cached) [`NamespaceActor`] for
	/// `(db, namespace)` (spec.md §4.7 "per-(db,namespace)... actors").
	pub async fn open_namespace(&self, db: &str, namespace: &str) -> Result<Arc<NamespaceActor>> {
		let key = (db.to_string(), namespace.to_string());
		if let Some(actor) = self.namespaces.get(&key) {
			return Ok(actor.clone());
		}
		let actor = Arc::new(
			NamespaceActor::open(
				&self.base_path,
				db,
				namespace,
				self.cluster.clone(),
				self.default_interval_millis,
				self.commit_log_enabled,
				self.dispatch.clone(),
			)
			.await?,
		);
		self.namespaces.insert(key, actor.clone());
		Ok(actor)
	}

	/// Resolves a bare namespace name for `forward_*` calls (spec.md
	/// §4.5 step 4, §4.6 step 4), which — per the external RPC surface
	/// of spec.md §6 — address a namespace without a `db` qualifier.
	/// This guardian therefore requires namespace names to be unique
	/// across every `db` it has opened for forwarding to resolve
	/// unambiguously; see `DESIGN.md` for the tradeoff.
	fn namespace_actor(&self, namespace: &str) -> Result<Arc<NamespaceActor>> {
		let mut matches = self.namespaces.iter().filter(|entry| entry.key().1 == namespace);
		let Some(first) = matches.next() else {
			return Err(Error::MetricNotFound(format!("namespace `{namespace}` is not open on this node")));
		};
		if matches.next().is_some() {
			return Err(Error::Unavailable(format!(
				"namespace `{namespace}` is ambiguous across multiple databases on this node"
			)));
		}
		Ok(first.value().clone())
	}

	/// `ExecuteSQL(db, namespace, statement_text)` (spec.md §6):
	/// parses, then dispatches to the matching coordinator method
	/// (spec.md §4.7 "The endpoint adapts external RPC messages to
	/// internal commands").
	#[tracing::instrument(skip(self, statement_text), fields(db, namespace), level = "trace")]
	pub async fn execute_sql(&self, db: &str, namespace: &str, statement_text: &str) -> Result<Vec<Record>> {
		let statement =
			ast::parse::statement(namespace, statement_text).map_err(Error::InvalidStatement)?;
		let actor = self.open_namespace(db, namespace).await?;

		match statement {
			Statement::Select(select) => actor.read.execute_statement(&select, Deadline::after(self.read_timeout)).await,
			Statement::Insert(insert) => {
				let record = record_from_insert(&actor, &insert)?;
				actor.write.map_input(&insert.metric, record).await?;
				Ok(Vec::new())
			}
			Statement::Delete(delete) => {
				actor.write.execute_delete(&delete).await?;
				Ok(Vec::new())
			}
			Statement::Drop(drop) => {
				actor.write.drop_metric(&drop.metric).await?;
				Ok(Vec::new())
			}
		}
	}
}

/// Builds the [`Record`] an `InsertSQLStatement` describes (spec.md §6),
/// a translation the distilled spec leaves implicit. Columns named
/// `timestamp`/`value` map to those reserved roles; every other column
/// is looked up in the metric's current schema to preserve its declared
/// `Dimension`/`Tag` class, or defaults to `Dimension` for a metric seen
/// for the first time (spec.md §4.1 "Unknown-field policy: unknown
/// fields are allowed").
fn record_from_insert(actor: &NamespaceActor, insert: &ast::InsertStatement) -> Result<Record> {
	let existing_schema = actor.schema.get(&insert.metric);

	let mut timestamp = None;
	let mut value = None;
	let mut dimensions = Vec::new();
	let mut tags = Vec::new();

	for (column, scalar) in insert.columns.iter().zip(insert.values.iter()) {
		match column.as_str() {
			"timestamp" => timestamp = scalar.as_i64(),
			"value" => value = Some(scalar.clone()),
			name => {
				let class = existing_schema.as_ref().and_then(|s| s.field(name)).map(|f| f.class);
				match class {
					Some(FieldClass::Tag) => tags.push((name.to_string(), scalar.clone())),
					_ => dimensions.push((name.to_string(), scalar.clone())),
				}
			}
		}
	}

	let timestamp = timestamp
		.ok_or_else(|| Error::InvalidStatement("INSERT requires a `timestamp` column".to_string()))?;
	let value = value.ok_or_else(|| Error::InvalidStatement("INSERT requires a `value` column".to_string()))?;

	let mut record = Record::new(timestamp, value);
	for (name, scalar) in dimensions {
		record = record.with_dimension(name, scalar);
	}
	for (name, scalar) in tags {
		record = record.with_tag(name, scalar);
	}
	Ok(record)
}

#[async_trait]
impl NsdbBackend for Guardian {
	async fn write(&self, db: &str, namespace: &str, metric: &str, record: Record) -> Result<()> {
		let actor = self.open_namespace(db, namespace).await?;
		actor.write.map_input(metric, record).await?;
		Ok(())
	}

	async fn init_metric(&self, db: &str, namespace: &str, metric: &str, shard_interval_millis: u64) -> Result<()> {
		let actor = self.open_namespace(db, namespace).await?;
		actor.metadata.put_metric_info(metric, shard_interval_millis)?;
		Ok(())
	}

	async fn execute_sql(&self, db: &str, namespace: &str, statement_text: &str) -> Result<Vec<Record>> {
		Guardian::execute_sql(self, db, namespace, statement_text).await
	}

	async fn check(&self) -> bool {
		true
	}

	async fn forward_write(&self, namespace: &str, metric: &str, record: Record) -> Result<()> {
		let actor = self.namespace_actor(namespace)?;
		actor.write.map_input(metric, record).await?;
		Ok(())
	}

	async fn forward_query(
		&self,
		namespace: &str,
		metric: &str,
		bin_index: i64,
		predicate: Predicate,
		projection: Projection,
		limit: usize,
		sort: Option<Sort>,
	) -> Result<Vec<Record>> {
		let actor = self.namespace_actor(namespace)?;
		let schema = actor.schema.get(metric).ok_or_else(|| Error::MetricNotFound(metric.to_string()))?;
		let shard = actor.shard_for_bin(metric, bin_index).await?;
		let reader = shard.snapshot();
		reader.query(&schema, &predicate, &projection, limit, sort.as_ref())
	}

	async fn forward_grouped(
		&self,
		namespace: &str,
		metric: &str,
		bin_index: i64,
		predicate: Predicate,
		group_by_field: String,
	) -> Result<Vec<GroupAggregate>> {
		let actor = self.namespace_actor(namespace)?;
		let schema = actor.schema.get(metric).ok_or_else(|| Error::MetricNotFound(metric.to_string()))?;
		let shard = actor.shard_for_bin(metric, bin_index).await?;
		let reader = shard.snapshot();
		reader.grouped_aggregation(&schema, &predicate, &group_by_field)
	}

	async fn forward_delete(&self, namespace: &str, metric: &str, bin_index: i64, predicate: Predicate) -> Result<()> {
		let actor = self.namespace_actor(namespace)?;
		let schema = actor.schema.get(metric).ok_or_else(|| Error::MetricNotFound(metric.to_string()))?;
		let shard = actor.shard_for_bin(metric, bin_index).await?;
		let mut writer = shard.acquire_writer().await;
		writer.delete_by_query(&schema, &predicate)
	}
}
