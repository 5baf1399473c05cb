// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::sync::Arc;

use nsdb_network::{GrpcConfig, NsdbGrpcService};

use crate::guardian::Guardian;

/// Starts the gRPC endpoint against `guardian`, the way the teacher's
/// `bin/server` starts its own transport off a built engine (spec.md §6
/// "RPC surface"). Runs until the socket closes or the process is
/// killed; callers typically `tokio::spawn` this alongside other node
/// responsibilities.
pub async fn serve(guardian: Arc<Guardian>, config: GrpcConfig) -> Result<(), tonic::transport::Error> {
	let Some(socket) = config.socket else {
		tracing::info!("no gRPC socket configured; endpoint disabled");
		return Ok(());
	};
	tracing::info!(%socket, "starting nsdb gRPC endpoint");
	let service = NsdbGrpcService::new(guardian).into_server();
	tonic::transport::Server::builder().add_service(service).serve(socket).await
}
