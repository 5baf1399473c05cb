// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use nsdb_storage::{GroupAggregate, Predicate, Projection, Sort};
use nsdb_type::Record;
use tonic::{Request, Response, Status};

use crate::pb;
use crate::pb::nsdb_transport_server::{NsdbTransport, NsdbTransportServer};
use crate::{decode, encode, error_message};

/// The gRPC listen configuration (spec.md §6), shaped like the
/// teacher's `GrpcConfig { socket: Option<SocketAddr> }` (`bin/server`).
#[derive(Clone, Debug, Default)]
pub struct GrpcConfig {
	pub socket: Option<SocketAddr>,
}

/// The boundary between this transport and the guardian (spec.md §4.7,
/// C7): `nsdb-server`'s `Guardian` implements this against its
/// per-(db, namespace) write/read coordinators. Kept as a plain
/// `async_trait` rather than the coordinators' own concrete types so
/// this crate never depends on `nsdb-server` (spec.md §9 "Cyclic
/// references... pass opaque handles downward").
#[async_trait]
pub trait NsdbBackend: Send + Sync + 'static {
	async fn write(&self, db: &str, namespace: &str, metric: &str, record: Record) -> nsdb_core::Result<()>;

	async fn init_metric(
		&self,
		db: &str,
		namespace: &str,
		metric: &str,
		shard_interval_millis: u64,
	) -> nsdb_core::Result<()>;

	async fn execute_sql(&self, db: &str, namespace: &str, statement_text: &str) -> nsdb_core::Result<Vec<Record>>;

	async fn check(&self) -> bool;

	async fn forward_write(&self, namespace: &str, metric: &str, record: Record) -> nsdb_core::Result<()>;

	#[allow(clippy::too_many_arguments)]
	async fn forward_query(
		&self,
		namespace: &str,
		metric: &str,
		bin_index: i64,
		predicate: Predicate,
		projection: Projection,
		limit: usize,
		sort: Option<Sort>,
	) -> nsdb_core::Result<Vec<Record>>;

	async fn forward_grouped(
		&self,
		namespace: &str,
		metric: &str,
		bin_index: i64,
		predicate: Predicate,
		group_by_field: String,
	) -> nsdb_core::Result<Vec<GroupAggregate>>;

	async fn forward_delete(
		&self,
		namespace: &str,
		metric: &str,
		bin_index: i64,
		predicate: Predicate,
	) -> nsdb_core::Result<()>;
}

/// Adapts wire messages to/from an [`NsdbBackend`] (spec.md §4.7 "The
/// endpoint adapts external RPC messages to internal commands and pipes
/// responses").
pub struct NsdbGrpcService<B: NsdbBackend> {
	backend: Arc<B>,
}

impl<B: NsdbBackend> NsdbGrpcService<B> {
	pub fn new(backend: Arc<B>) -> Self {
		Self { backend }
	}

	pub fn into_server(self) -> NsdbTransportServer<Self> {
		NsdbTransportServer::new(self)
	}
}

#[async_trait]
impl<B: NsdbBackend> NsdbTransport for NsdbGrpcService<B> {
	async fn write(&self, request: Request<pb::WriteRequest>) -> Result<Response<pb::WriteReply>, Status> {
		let req = request.into_inner();
		let record: Record = decode(&req.record)?;
		let reply = match self.backend.write(&req.db, &req.namespace, &req.metric, record).await {
			Ok(()) => pb::WriteReply { ok: true, error: String::new() },
			Err(err) => pb::WriteReply { ok: false, error: error_message(&err) },
		};
		Ok(Response::new(reply))
	}

	async fn init_metric(
		&self,
		request: Request<pb::InitMetricRequest>,
	) -> Result<Response<pb::InitMetricReply>, Status> {
		let req = request.into_inner();
		let reply =
			match self.backend.init_metric(&req.db, &req.namespace, &req.metric, req.shard_interval_millis).await {
				Ok(()) => pb::InitMetricReply { ok: true, error: String::new() },
				Err(err) => pb::InitMetricReply { ok: false, error: error_message(&err) },
			};
		Ok(Response::new(reply))
	}

	async fn execute_sql(
		&self,
		request: Request<pb::ExecuteSqlRequest>,
	) -> Result<Response<pb::ExecuteSqlReply>, Status> {
		let req = request.into_inner();
		let reply = match self.backend.execute_sql(&req.db, &req.namespace, &req.statement_text).await {
			Ok(records) => pb::ExecuteSqlReply { records: encode(&records), error: String::new() },
			Err(err) => pb::ExecuteSqlReply { records: Vec::new(), error: error_message(&err) },
		};
		Ok(Response::new(reply))
	}

	async fn check(&self, _request: Request<pb::CheckRequest>) -> Result<Response<pb::CheckReply>, Status> {
		Ok(Response::new(pb::CheckReply { healthy: self.backend.check().await }))
	}

	async fn forward_write(
		&self,
		request: Request<pb::ForwardWriteRequest>,
	) -> Result<Response<pb::ForwardWriteReply>, Status> {
		let req = request.into_inner();
		let record: Record = decode(&req.record)?;
		let reply = match self.backend.forward_write(&req.namespace, &req.metric, record).await {
			Ok(()) => pb::ForwardWriteReply { ok: true, error: String::new() },
			Err(err) => pb::ForwardWriteReply { ok: false, error: error_message(&err) },
		};
		Ok(Response::new(reply))
	}

	async fn forward_query(
		&self,
		request: Request<pb::ForwardQueryRequest>,
	) -> Result<Response<pb::ForwardQueryReply>, Status> {
		let req = request.into_inner();
		let predicate: Predicate = decode(&req.predicate)?;
		let projection: Projection = decode(&req.projection)?;
		let sort: Option<Sort> = decode(&req.sort)?;
		let reply = match self
			.backend
			.forward_query(&req.namespace, &req.metric, req.bin_index, predicate, projection, req.limit as usize, sort)
			.await
		{
			Ok(records) => pb::ForwardQueryReply { records: encode(&records), error: String::new() },
			Err(err) => pb::ForwardQueryReply { records: Vec::new(), error: error_message(&err) },
		};
		Ok(Response::new(reply))
	}

	async fn forward_grouped(
		&self,
		request: Request<pb::ForwardGroupedRequest>,
	) -> Result<Response<pb::ForwardGroupedReply>, Status> {
		let req = request.into_inner();
		let predicate: Predicate = decode(&req.predicate)?;
		let reply = match self
			.backend
			.forward_grouped(&req.namespace, &req.metric, req.bin_index, predicate, req.group_by_field)
			.await
		{
			Ok(groups) => pb::ForwardGroupedReply { groups: encode(&groups), error: String::new() },
			Err(err) => pb::ForwardGroupedReply { groups: Vec::new(), error: error_message(&err) },
		};
		Ok(Response::new(reply))
	}

	async fn forward_delete(
		&self,
		request: Request<pb::ForwardDeleteRequest>,
	) -> Result<Response<pb::ForwardDeleteReply>, Status> {
		let req = request.into_inner();
		let predicate: Predicate = decode(&req.predicate)?;
		let reply = match self.backend.forward_delete(&req.namespace, &req.metric, req.bin_index, predicate).await {
			Ok(()) => pb::ForwardDeleteReply { ok: true, error: String::new() },
			Err(err) => pb::ForwardDeleteReply { ok: false, error: error_message(&err) },
		};
		Ok(Response::new(reply))
	}
}
