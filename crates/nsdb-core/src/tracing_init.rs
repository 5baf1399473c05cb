// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use tracing_subscriber::EnvFilter;

/// Installs the process-wide tracing subscriber. Idempotent under test
/// harnesses that call it more than once.
pub fn init_tracing() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
