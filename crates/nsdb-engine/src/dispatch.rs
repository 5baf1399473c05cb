// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use nsdb_cluster::NodeId;
use nsdb_core::Result;
use nsdb_storage::{GroupAggregate, Predicate, Projection, Sort};
use nsdb_type::Record;

/// The RPC hook the write/read coordinators call when a `Location`'s
/// `node_id` is not `self` (spec.md §4.5 step 4 "forward the command to
/// the owning node and await"; §4.6 step 4 "local call if self, RPC
/// otherwise"). Passed in as an opaque handle at construction, per
/// spec.md §9 "Cyclic references" — the coordinators never hold a
/// back-pointer to the transport, only this trait object. `nsdb-network`
/// provides the real `tonic`-backed implementation; tests use an
/// in-process fake or simply run single-node (where every `Location`
/// resolves to `self` and this is never consulted).
#[async_trait::async_trait]
pub trait RemoteDispatch: Send + Sync {
	async fn forward_write(&self, node: &NodeId, namespace: &str, metric: &str, record: Record) -> Result<()>;

	async fn forward_query(
		&self,
		node: &NodeId,
		namespace: &str,
		metric: &str,
		bin_index: i64,
		predicate: Predicate,
		projection: Projection,
		limit: usize,
		sort: Option<Sort>,
	) -> Result<Vec<Record>>;

	async fn forward_grouped(
		&self,
		node: &NodeId,
		namespace: &str,
		metric: &str,
		bin_index: i64,
		predicate: Predicate,
		group_by_field: String,
	) -> Result<Vec<GroupAggregate>>;

	async fn forward_delete(
		&self,
		node: &NodeId,
		namespace: &str,
		metric: &str,
		bin_index: i64,
		predicate: Predicate,
	) -> Result<()>;
}
