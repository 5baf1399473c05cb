// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

//! Official Rust client library for NSDB: a fluent builder over the
//! `nsdb-network` gRPC transport (spec.md §6 "RPC surface"), the way
//! the teacher's `reifydb-client` wraps its own wire clients for
//! application code that does not want to hold a raw transport client.

use nsdb_network::{GrpcClient, GrpcClientError};
use nsdb_type::Record;

/// A connection to one NSDB node, scoped to a `db`.
///
/// ```no_run
/// # async fn run() -> Result<(), nsdb_client::ClientError> {
/// let mut client = nsdb_client::connect("http://127.0.0.1:54321", "prod").await?;
/// client.write("metrics", "cpu", nsdb_type::Record::new(1, 0.7)).await?;
/// let rows = client.query("metrics", "SELECT * FROM cpu LIMIT 10").await?;
/// # Ok(()) }
/// ```
pub struct Client {
	inner: GrpcClient,
	db: String,
}

pub type ClientError = GrpcClientError;

/// Dials `endpoint` (e.g. `http://127.0.0.1:54321`) and scopes every
/// subsequent call to `db`.
pub async fn connect(endpoint: impl Into<String>, db: impl Into<String>) -> Result<Client, ClientError> {
	let inner = GrpcClient::connect(endpoint).await?;
	Ok(Client { inner, db: db.into() })
}

impl Client {
	/// The `db` this client is scoped to.
	pub fn db(&self) -> &str {
		&self.db
	}

	/// `Write(db, namespace, metric, record)` (spec.md §6).
	pub async fn write(&mut self, namespace: &str, metric: &str, record: Record) -> Result<(), ClientError> {
		self.inner.write(&self.db, namespace, metric, record).await
	}

	/// `InitMetric(db, namespace, metric, shard_interval_millis)`
	/// (spec.md §6) — declares a metric's shard bin width ahead of its
	/// first write, rather than relying on the node's configured
	/// default.
	pub async fn init_metric(
		&mut self,
		namespace: &str,
		metric: &str,
		shard_interval_millis: u64,
	) -> Result<(), ClientError> {
		self.inner.init_metric(&self.db, namespace, metric, shard_interval_millis).await
	}

	/// `ExecuteSQL(db, namespace, statement_text)` (spec.md §6): runs a
	/// `SELECT`, `INSERT`, `DELETE` or `DROP METRIC` statement and
	/// returns whatever rows it produced (empty for non-`SELECT`
	/// statements).
	pub async fn query(&mut self, namespace: &str, statement_text: &str) -> Result<Vec<Record>, ClientError> {
		self.inner.execute_sql(&self.db, namespace, statement_text).await
	}

	/// `Check()` (spec.md §6): whether the node considers itself
	/// healthy.
	pub async fn check(&mut self) -> Result<bool, ClientError> {
		self.inner.check().await
	}
}

#[cfg(test)]
mod tests {
	use nsdb_network::GrpcConfig;
	use nsdb_testing::{create_test_guardian, init_metric};

	use super::*;

	#[tokio::test]
	async fn write_and_query_round_trip_through_a_live_endpoint() {
		let (_dir, guardian) = create_test_guardian();
		init_metric(&guardian, "prod", "metrics", "cpu", 1000).await;

		let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
		let socket = listener.local_addr().unwrap();
		drop(listener);

		let serve_guardian = guardian.clone();
		tokio::spawn(async move {
			nsdb_server::serve(serve_guardian, GrpcConfig { socket: Some(socket) }).await.unwrap();
		});
		tokio::time::sleep(std::time::Duration::from_millis(100)).await;

		let mut client = connect(format!("http://{socket}"), "prod").await.unwrap();
		assert!(client.check().await.unwrap());
		client.write("metrics", "cpu", Record::new(1, 0.5)).await.unwrap();
		let rows = client.query("metrics", "SELECT * FROM cpu LIMIT 10").await.unwrap();
		assert_eq!(rows.len(), 1);
	}
}
