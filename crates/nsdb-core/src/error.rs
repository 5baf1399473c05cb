// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::fmt;

/// Caller-visible error kinds (spec §7). Every actor boundary in the
/// system replies with one of these instead of unwinding a panic across
/// a message send.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("schema conflict: {}", .0.join("; "))]
	SchemaConflict(Vec<String>),

	#[error("metric not found: {0}")]
	MetricNotFound(String),

	#[error("invalid statement: {0}")]
	InvalidStatement(String),

	#[error("timeout")]
	Timeout,

	#[error("unsupported distributed aggregation: {0}")]
	UnsupportedDistributedAggregation(String),

	#[error("io error: {0}")]
	IoError(String),

	#[error("shard owner unreachable: {0}")]
	Unavailable(String),
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Error::IoError(err.to_string())
	}
}

impl From<tantivy::TantivyError> for Error {
	fn from(err: tantivy::TantivyError) -> Self {
		Error::IoError(err.to_string())
	}
}

pub type Result<T> = core::result::Result<T, Error>;

/// Wraps a reason-producing closure so call sites read like `error!(...)`
/// without pulling in the teacher's full diagnostic/fragment machinery.
pub fn io_error(detail: impl fmt::Display) -> Error {
	Error::IoError(detail.to_string())
}
