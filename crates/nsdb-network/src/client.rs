// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use nsdb_type::Record;
use thiserror::Error;
use tonic::transport::Channel;

use crate::pb::nsdb_transport_client::NsdbTransportClient;
use crate::{decode, encode};

/// A thin client over the external RPC surface (spec.md §6), the
/// counterpart `pkg/rust/nsdb-client` wraps in a fluent builder. Kept
/// here rather than only in the pkg crate so the testsuite and other
/// in-tree consumers can dial a running guardian directly, the way the
/// teacher's own integration tests reach for `GrpcClient` alongside the
/// fluent `reifydb::client`.
#[derive(Clone)]
pub struct GrpcClient {
	inner: NsdbTransportClient<Channel>,
}

#[derive(Debug, Error)]
pub enum GrpcClientError {
	#[error("could not connect to {endpoint}: {source}")]
	Connect { endpoint: String, #[source] source: tonic::transport::Error },

	#[error("rpc failed: {0}")]
	Rpc(#[from] tonic::Status),

	#[error("malformed reply payload: {0}")]
	Decode(String),

	#[error("{0}")]
	Remote(String),
}

impl GrpcClient {
	pub async fn connect(endpoint: impl Into<String>) -> Result<Self, GrpcClientError> {
		let endpoint = endpoint.into();
		let channel = Channel::from_shared(endpoint.clone())
			.map_err(|e| GrpcClientError::Connect { endpoint: endpoint.clone(), source: e.into() })?
			.connect()
			.await
			.map_err(|e| GrpcClientError::Connect { endpoint, source: e })?;
		Ok(Self { inner: NsdbTransportClient::new(channel) })
	}

	pub async fn write(
		&mut self,
		db: &str,
		namespace: &str,
		metric: &str,
		record: Record,
	) -> Result<(), GrpcClientError> {
		let request = crate::pb::WriteRequest {
			db: db.to_string(),
			namespace: namespace.to_string(),
			metric: metric.to_string(),
			record: encode(&record),
		};
		let reply = self.inner.write(request).await?.into_inner();
		if reply.ok { Ok(()) } else { Err(GrpcClientError::Remote(reply.error)) }
	}

	pub async fn init_metric(
		&mut self,
		db: &str,
		namespace: &str,
		metric: &str,
		shard_interval_millis: u64,
	) -> Result<(), GrpcClientError> {
		let request = crate::pb::InitMetricRequest {
			db: db.to_string(),
			namespace: namespace.to_string(),
			metric: metric.to_string(),
			shard_interval_millis,
		};
		let reply = self.inner.init_metric(request).await?.into_inner();
		if reply.ok { Ok(()) } else { Err(GrpcClientError::Remote(reply.error)) }
	}

	pub async fn execute_sql(
		&mut self,
		db: &str,
		namespace: &str,
		statement_text: &str,
	) -> Result<Vec<Record>, GrpcClientError> {
		let request = crate::pb::ExecuteSqlRequest {
			db: db.to_string(),
			namespace: namespace.to_string(),
			statement_text: statement_text.to_string(),
		};
		let reply = self.inner.execute_sql(request).await?.into_inner();
		if !reply.error.is_empty() {
			return Err(GrpcClientError::Remote(reply.error));
		}
		decode(&reply.records).map_err(|status| GrpcClientError::Decode(status.to_string()))
	}

	pub async fn check(&mut self) -> Result<bool, GrpcClientError> {
		let reply = self.inner.check(crate::pb::CheckRequest {}).await?.into_inner();
		Ok(reply.healthy)
	}
}
