// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::fmt::{Display, Formatter};

use nsdb_type::DataType;

/// One field whose declared type changed between the stored schema and
/// a proposed one (spec.md §4.2 "compatibility rule"). Replaces the
/// source's `invalidNel("")` empty reason (spec.md §9 Open Question 2).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldConflict {
	pub field: String,
	pub old: DataType,
	pub new: DataType,
}

/// Returned by [`SchemaRegistry::update`](crate::SchemaRegistry::update)
/// when one or more shared fields disagree on type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Incompatible(pub Vec<FieldConflict>);

impl Display for Incompatible {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let reasons: Vec<String> = self
			.0
			.iter()
			.map(|c| format!("field `{}`: {} -> {}", c.field, c.old, c.new))
			.collect();
		write!(f, "{}", reasons.join("; "))
	}
}

impl std::error::Error for Incompatible {}

impl From<Incompatible> for nsdb_core::Error {
	fn from(value: Incompatible) -> Self {
		nsdb_core::Error::SchemaConflict(
			value.0.iter().map(|c| format!("field `{}`: {} -> {}", c.field, c.old, c.new)).collect(),
		)
	}
}
