// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Closed enumeration of declarable field types (spec.md §3 "Typed
/// scalar"). Persisted as the short stable tag returned by
/// [`DataType::tag`], replacing the source's class-name round trip
/// (spec.md §9 "Class-name round-trip for schema types").
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum DataType {
	Int,
	BigInt,
	Decimal,
	Varchar,
}

impl DataType {
	pub fn tag(&self) -> &'static str {
		match self {
			DataType::Int => "INT",
			DataType::BigInt => "BIGINT",
			DataType::Decimal => "DECIMAL",
			DataType::Varchar => "VARCHAR",
		}
	}

	pub fn from_tag(tag: &str) -> Option<Self> {
		match tag {
			"INT" => Some(DataType::Int),
			"BIGINT" => Some(DataType::BigInt),
			"DECIMAL" => Some(DataType::Decimal),
			"VARCHAR" => Some(DataType::Varchar),
			_ => None,
		}
	}

	/// Whether this type is textual — used to decide whether a dimension
	/// or tag produces a tokenised term field in addition to its point
	/// field (spec.md §4.1).
	pub fn is_text(&self) -> bool {
		matches!(self, DataType::Varchar)
	}
}

impl Display for DataType {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.tag())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tag_round_trips() {
		for dt in [DataType::Int, DataType::BigInt, DataType::Decimal, DataType::Varchar] {
			assert_eq!(DataType::from_tag(dt.tag()), Some(dt));
		}
	}

	#[test]
	fn unknown_tag_is_none() {
		assert_eq!(DataType::from_tag("FLOAT"), None);
	}
}
