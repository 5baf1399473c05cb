// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use dashmap::DashMap;
use nsdb_cluster::NodeId;
use nsdb_core::{Error, Result};
use nsdb_engine::RemoteDispatch;
use nsdb_storage::{GroupAggregate, Predicate, Projection, Sort};
use nsdb_type::Record;
use tonic::transport::Channel;

use crate::pb::nsdb_transport_client::NsdbTransportClient;
use crate::{decode, encode};

/// Resolves a [`NodeId`] to the gRPC endpoint the write/read coordinators
/// forward a shard's command to (spec.md §4.4 "a node id alone carries
/// no addressing information; the cluster view substrate supplies that
/// separately"). Channels are lazily connected and cached per node.
pub struct GrpcDispatch {
	endpoints: DashMap<NodeId, String>,
	channels: DashMap<NodeId, Channel>,
}

impl GrpcDispatch {
	pub fn new(endpoints: impl IntoIterator<Item = (NodeId, String)>) -> Self {
		Self { endpoints: endpoints.into_iter().collect(), channels: DashMap::new() }
	}

	pub fn register(&self, node: NodeId, endpoint: String) {
		self.channels.remove(&node);
		self.endpoints.insert(node, endpoint);
	}

	async fn client(&self, node: &NodeId) -> Result<NsdbTransportClient<Channel>> {
		if let Some(channel) = self.channels.get(node) {
			return Ok(NsdbTransportClient::new(channel.clone()));
		}
		let endpoint = self
			.endpoints
			.get(node)
			.ok_or_else(|| Error::Unavailable(format!("no endpoint registered for node {node}")))?
			.clone();
		let channel = Channel::from_shared(endpoint)
			.map_err(|e| Error::Unavailable(format!("invalid endpoint for node {node}: {e}")))?
			.connect()
			.await
			.map_err(|e| Error::Unavailable(format!("could not connect to node {node}: {e}")))?;
		self.channels.insert(node.clone(), channel.clone());
		Ok(NsdbTransportClient::new(channel))
	}
}

fn rpc_failed(node: &NodeId, status: tonic::Status) -> Error {
	Error::Unavailable(format!("rpc to node {node} failed: {status}"))
}

#[async_trait::async_trait]
impl RemoteDispatch for GrpcDispatch {
	async fn forward_write(&self, node: &NodeId, namespace: &str, metric: &str, record: Record) -> Result<()> {
		let mut client = self.client(node).await?;
		let request = crate::pb::ForwardWriteRequest {
			namespace: namespace.to_string(),
			metric: metric.to_string(),
			record: encode(&record),
		};
		let reply = client.forward_write(request).await.map_err(|e| rpc_failed(node, e))?.into_inner();
		if reply.ok {
			Ok(())
		} else {
			Err(Error::Unavailable(reply.error))
		}
	}

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
	) -> Result<Vec<Record>> {
		let mut client = self.client(node).await?;
		let request = crate::pb::ForwardQueryRequest {
			namespace: namespace.to_string(),
			metric: metric.to_string(),
			bin_index,
			predicate: encode(&predicate),
			projection: encode(&projection),
			limit: limit as u64,
			sort: encode(&sort),
		};
		let reply = client.forward_query(request).await.map_err(|e| rpc_failed(node, e))?.into_inner();
		if reply.error.is_empty() {
			decode(&reply.records).map_err(|status| Error::Unavailable(status.to_string()))
		} else {
			Err(Error::Unavailable(reply.error))
		}
	}

	async fn forward_grouped(
		&self,
		node: &NodeId,
		namespace: &str,
		metric: &str,
		bin_index: i64,
		predicate: Predicate,
		group_by_field: String,
	) -> Result<Vec<GroupAggregate>> {
		let mut client = self.client(node).await?;
		let request = crate::pb::ForwardGroupedRequest {
			namespace: namespace.to_string(),
			metric: metric.to_string(),
			bin_index,
			predicate: encode(&predicate),
			group_by_field,
		};
		let reply = client.forward_grouped(request).await.map_err(|e| rpc_failed(node, e))?.into_inner();
		if reply.error.is_empty() {
			decode(&reply.groups).map_err(|status| Error::Unavailable(status.to_string()))
		} else {
			Err(Error::Unavailable(reply.error))
		}
	}

	async fn forward_delete(
		&self,
		node: &NodeId,
		namespace: &str,
		metric: &str,
		bin_index: i64,
		predicate: Predicate,
	) -> Result<()> {
		let mut client = self.client(node).await?;
		let request = crate::pb::ForwardDeleteRequest {
			namespace: namespace.to_string(),
			metric: metric.to_string(),
			bin_index,
			predicate: encode(&predicate),
		};
		let reply = client.forward_delete(request).await.map_err(|e| rpc_failed(node, e))?.into_inner();
		if reply.ok {
			Ok(())
		} else {
			Err(Error::Unavailable(reply.error))
		}
	}
}
