// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

//! The RPC transport (spec.md §6): a `tonic`-backed implementation of
//! the external RPC surface plus the inter-node shard-forwarding calls
//! the write/read coordinators reach for when a `Location`'s `node_id`
//! is not `self` (spec.md §4.5 step 4, §4.6 step 4). Spec.md §1 names
//! the RPC transport an external collaborator, not core — this crate
//! only adapts wire messages to/from the coordinators behind the
//! [`NsdbBackend`] trait; the guardian (`nsdb-server`) supplies the
//! implementation.

pub mod client;
pub mod dispatch;
pub mod server;

pub mod pb {
	tonic::include_proto!("nsdb");
}

pub use client::{GrpcClient, GrpcClientError};
pub use dispatch::GrpcDispatch;
pub use server::{GrpcConfig, NsdbBackend, NsdbGrpcService};

use nsdb_core::Error;

/// Encodes a [`nsdb_core::Error`] onto the wire as a plain string —
/// every reply message carries an `error: String` field that is empty
/// on success (spec.md §7 "All errors are surfaced as negative reply
/// messages; nothing is thrown across actor boundaries").
pub(crate) fn error_message(err: &Error) -> String {
	err.to_string()
}

pub(crate) fn encode<T: serde::Serialize>(value: &T) -> Vec<u8> {
	postcard::to_allocvec(value).expect("postcard encoding of an in-process value never fails")
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, tonic::Status> {
	postcard::from_bytes(bytes).map_err(|e| tonic::Status::invalid_argument(format!("malformed payload: {e}")))
}
