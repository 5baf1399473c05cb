// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

/// Process configuration (spec §6 "Configuration").
///
/// Values can come from the command line, the environment, or a TOML
/// overlay loaded with [`Config::from_file`]; CLI flags win over the file,
/// which wins over the built-in defaults below.
#[derive(Parser, Clone, Debug)]
#[command(name = "nsdb-server")]
#[command(about = "NSDB per-node guardian process")]
pub struct Config {
	/// Filesystem root under which every (db, namespace) stores its
	/// schema/, metadata/ and shards/ directories.
	#[arg(long = "index.base-path", env = "NSDB_INDEX_BASE_PATH", default_value = "./data")]
	pub index_base_path: PathBuf,

	/// Default shard bin width in milliseconds, used when a metric has
	/// not been initialised with `InitMetric`.
	#[arg(long = "sharding.interval", env = "NSDB_SHARDING_INTERVAL", default_value = "3600000")]
	pub sharding_interval_millis: u64,

	#[arg(long = "write-coordinator.timeout", env = "NSDB_WRITE_TIMEOUT", value_parser = parse_duration, default_value = "10s")]
	pub write_coordinator_timeout: Duration,

	#[arg(long = "read-coordinator.timeout", env = "NSDB_READ_TIMEOUT", value_parser = parse_duration, default_value = "10s")]
	pub read_coordinator_timeout: Duration,

	#[arg(long = "metadata-coordinator.timeout", env = "NSDB_METADATA_TIMEOUT", value_parser = parse_duration, default_value = "5s")]
	pub metadata_coordinator_timeout: Duration,

	#[arg(long = "commit-log.enabled", env = "NSDB_COMMIT_LOG_ENABLED", default_value = "true")]
	pub commit_log_enabled: bool,

	#[arg(long = "read.parallelism.initial", env = "NSDB_READ_PARALLELISM_INITIAL", default_value = "4")]
	pub read_parallelism_initial: usize,

	#[arg(long = "read.parallelism.lower", env = "NSDB_READ_PARALLELISM_LOWER", default_value = "1")]
	pub read_parallelism_lower: usize,

	#[arg(long = "read.parallelism.upper", env = "NSDB_READ_PARALLELISM_UPPER", default_value = "32")]
	pub read_parallelism_upper: usize,

	/// gRPC listen address.
	#[arg(long = "grpc.bind", env = "NSDB_GRPC_BIND", default_value = "127.0.0.1:54321")]
	pub grpc_bind: String,
}

/// Mirrors the subset of [`Config`] that can be overlaid from a TOML file,
/// matching the layered config style used across the teacher's `bin/*`
/// crates (CLI flags always win).
#[derive(Deserialize, Default)]
struct ConfigFile {
	index: Option<IndexSection>,
	sharding: Option<ShardingSection>,
	commit_log: Option<CommitLogSection>,
}

#[derive(Deserialize)]
struct IndexSection {
	base_path: Option<PathBuf>,
}

#[derive(Deserialize)]
struct ShardingSection {
	interval: Option<u64>,
}

#[derive(Deserialize)]
struct CommitLogSection {
	enabled: Option<bool>,
}

impl Config {
	/// Parses CLI args, then overlays a TOML file at `path` if present.
	pub fn load(path: Option<&std::path::Path>) -> crate::Result<Self> {
		let mut config = Config::parse();
		if let Some(path) = path {
			if path.exists() {
				let text = std::fs::read_to_string(path)?;
				let file: ConfigFile =
					toml::from_str(&text).map_err(|e| crate::error::io_error(e))?;
				if let Some(index) = file.index {
					if let Some(base_path) = index.base_path {
						config.index_base_path = base_path;
					}
				}
				if let Some(sharding) = file.sharding {
					if let Some(interval) = sharding.interval {
						config.sharding_interval_millis = interval;
					}
				}
				if let Some(commit_log) = file.commit_log {
					if let Some(enabled) = commit_log.enabled {
						config.commit_log_enabled = enabled;
					}
				}
			}
		}
		Ok(config)
	}
}

fn parse_duration(s: &str) -> Result<Duration, String> {
	let s = s.trim();
	if s.is_empty() {
		return Err("duration cannot be empty".to_string());
	}

	let (num_str, unit) = if s.ends_with("ms") {
		(&s[..s.len() - 2], "ms")
	} else if s.ends_with('s') {
		(&s[..s.len() - 1], "s")
	} else if s.ends_with('m') {
		(&s[..s.len() - 1], "m")
	} else {
		(s, "s")
	};

	let num: u64 = num_str.parse().map_err(|_| format!("invalid duration number: {}", num_str))?;

	Ok(match unit {
		"ms" => Duration::from_millis(num),
		"s" => Duration::from_secs(num),
		"m" => Duration::from_secs(num * 60),
		_ => return Err(format!("unknown duration unit: {}", unit)),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_duration() {
		assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
		assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
		assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
		assert_eq!(parse_duration("7").unwrap(), Duration::from_secs(7));
	}

	#[test]
	fn test_load_without_file_uses_defaults() {
		let config = Config::parse_from(["nsdb-server"]);
		assert_eq!(config.sharding_interval_millis, 3_600_000);
		assert!(config.commit_log_enabled);
	}
}
