// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use serde::{Deserialize, Serialize};

/// Which fields a non-grouped query returns (spec.md §4.3 "Record
/// reconstruction"). `All` reconstructs every declared dimension, tag,
/// `value` and `timestamp`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Projection {
	All,
	Fields(Vec<String>),
}

impl Projection {
	pub fn includes(&self, name: &str) -> bool {
		match self {
			Projection::All => true,
			Projection::Fields(fields) => fields.iter().any(|f| f == name),
		}
	}
}

/// A single-key sort applied inside a shard, and again by the read
/// coordinator's k-way merge across shards (spec.md §4.6.1).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sort {
	pub field: String,
	pub descending: bool,
}
