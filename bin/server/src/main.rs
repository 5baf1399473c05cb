// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::sync::Arc;

use nsdb_cluster::StaticClusterView;
use nsdb_core::Config;
use nsdb_network::{GrpcConfig, GrpcDispatch};
use nsdb_server::{serve, Guardian};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	nsdb_core::init_tracing();

	let config = Config::load(Some(std::path::Path::new("nsdb.toml")))?;
	let socket = config.grpc_bind.parse().ok();

	let cluster = Arc::new(StaticClusterView::single_node(config.grpc_bind.clone()));
	let dispatch = Arc::new(GrpcDispatch::new(std::iter::empty()));

	let guardian = Arc::new(Guardian::new(&config, cluster, Some(dispatch)));

	tracing::info!(bind = %config.grpc_bind, "starting nsdb node");
	serve(guardian, GrpcConfig { socket }).await?;
	Ok(())
}
