// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::path::{Path, PathBuf};

use nsdb_core::Result;
use nsdb_type::Record;
use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

/// One write-ahead entry: the metric a record was mapped to plus the
/// record itself (spec.md §4.5 step 5 "Append to the commit log, if
/// enabled, before replying").
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CommitLogEntry {
	pub metric: String,
	pub record: Record,
}

/// A minimal append-only, per-(db, namespace) write-ahead log —
/// spec.md §1 names the commit log as an external collaborator but the
/// ambient-stack rule still requires *something* to write ahead of the
/// reply. Grounded on the append-only domain-event-log shape of the
/// teacher's `crates/cdc`. Frames are length-prefixed postcard records
/// in a single append-mode file.
pub struct CommitLog {
	file: Mutex<tokio::fs::File>,
	path: PathBuf,
}

impl CommitLog {
	pub async fn open(base_path: &Path) -> Result<Self> {
		std::fs::create_dir_all(base_path)?;
		let path = base_path.join("commit.log");
		let file = OpenOptions::new().create(true).append(true).open(&path).await?;
		Ok(Self { file: Mutex::new(file), path })
	}

	#[tracing::instrument(skip(self, record), level = "trace")]
	pub async fn append(&self, metric: &str, record: &Record) -> Result<()> {
		let entry = CommitLogEntry { metric: metric.to_string(), record: record.clone() };
		let bytes = postcard::to_allocvec(&entry).map_err(|e| nsdb_core::error::io_error(e))?;
		let len = (bytes.len() as u32).to_le_bytes();

		let mut file = self.file.lock().await;
		file.write_all(&len).await?;
		file.write_all(&bytes).await?;
		file.flush().await?;
		Ok(())
	}

	/// Replays every entry written so far, oldest first — used on
	/// recovery or by tests asserting write-ahead order.
	pub async fn replay(&self) -> Result<Vec<CommitLogEntry>> {
		let mut file = tokio::fs::File::open(&self.path).await?;
		let mut buf = Vec::new();
		file.read_to_end(&mut buf).await?;

		let mut entries = Vec::new();
		let mut offset = 0;
		while offset + 4 <= buf.len() {
			let len = u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap()) as usize;
			offset += 4;
			if offset + len > buf.len() {
				break;
			}
			if let Ok(entry) = postcard::from_bytes::<CommitLogEntry>(&buf[offset..offset + len]) {
				entries.push(entry);
			}
			offset += len;
		}
		Ok(entries)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn append_then_replay_preserves_order() {
		let dir = tempfile::tempdir().unwrap();
		let log = CommitLog::open(dir.path()).await.unwrap();
		log.append("cpu", &Record::new(1, 1i64)).await.unwrap();
		log.append("cpu", &Record::new(2, 2i64)).await.unwrap();

		let entries = log.replay().await.unwrap();
		assert_eq!(entries.len(), 2);
		assert_eq!(entries[0].record.timestamp, 1);
		assert_eq!(entries[1].record.timestamp, 2);
	}
}
