// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::{FieldClass, Schema, SchemaField};
use crate::violation::SchemaViolation;
use crate::Scalar;

/// One time-stamped "bit" — the atomic unit of the system (spec.md §3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
	pub timestamp: i64,
	pub value: Scalar,
	pub dimensions: BTreeMap<String, Scalar>,
	pub tags: BTreeMap<String, Scalar>,
}

impl Record {
	pub fn new(timestamp: i64, value: impl Into<Scalar>) -> Self {
		Self { timestamp, value: value.into(), dimensions: BTreeMap::new(), tags: BTreeMap::new() }
	}

	pub fn with_dimension(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
		self.dimensions.insert(name.into(), value.into());
		self
	}

	pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
		self.tags.insert(name.into(), value.into());
		self
	}

	/// Derives the candidate schema this record implies (spec.md §4.5
	/// step 1): `timestamp`/`value` plus one field per declared
	/// dimension/tag, typed from the runtime scalar each carries.
	pub fn candidate_schema(&self, metric: impl Into<String>) -> Schema {
		let mut fields = vec![
			SchemaField::new("timestamp", FieldClass::Timestamp, crate::DataType::BigInt),
			SchemaField::new("value", FieldClass::Value, self.value.type_tag()),
		];
		for (name, value) in &self.dimensions {
			fields.push(SchemaField::new(name.clone(), FieldClass::Dimension, value.type_tag()));
		}
		for (name, value) in &self.tags {
			fields.push(SchemaField::new(name.clone(), FieldClass::Tag, value.type_tag()));
		}
		Schema::new(metric, fields).expect("candidate schema always has exactly one value/timestamp field")
	}

	/// Validates every field this record carries against `schema`
	/// (spec.md §4.1). Unknown fields are permitted — they are the
	/// caller's signal to attempt schema evolution, not a validation
	/// failure here. Missing non-timestamp/non-value fields are
	/// permitted (sparse rows).
	pub fn validate(&self, schema: &Schema) -> Result<(), SchemaViolation> {
		check_field(schema, "value", &self.value)?;
		for (name, value) in self.dimensions.iter().chain(self.tags.iter()) {
			check_field(schema, name, value)?;
		}
		Ok(())
	}
}

fn check_field(schema: &Schema, name: &str, value: &Scalar) -> Result<(), SchemaViolation> {
	if let Some(field) = schema.field(name) {
		if !value.matches(field.data_type) {
			return Err(SchemaViolation::new(name, field.data_type, value.type_tag()));
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::DataType;

	#[test]
	fn candidate_schema_has_timestamp_and_value() {
		let record = Record::new(10, 1i64).with_dimension("name", "John").with_tag("surname", "Doe");
		let schema = record.candidate_schema("people");
		assert_eq!(schema.timestamp_field().data_type, DataType::BigInt);
		assert_eq!(schema.value_field().data_type, DataType::BigInt);
		assert_eq!(schema.field("name").unwrap().class, FieldClass::Dimension);
		assert_eq!(schema.field("surname").unwrap().class, FieldClass::Tag);
	}

	#[test]
	fn validate_rejects_type_mismatch() {
		let record = Record::new(1, 1i64).with_dimension("name", "John");
		let schema = record.candidate_schema("people");
		let bad = Record::new(2, 1i64).with_dimension("name", 7i64);
		let err = bad.validate(&schema).unwrap_err();
		assert_eq!(err.field, "name");
	}

	#[test]
	fn validate_allows_sparse_and_unknown_fields() {
		let record = Record::new(1, 1i64).with_dimension("name", "John");
		let schema = record.candidate_schema("people");
		let sparse = Record::new(2, 1i64);
		assert!(sparse.validate(&schema).is_ok());
		let unknown = Record::new(3, 1i64).with_dimension("extra", "x");
		assert!(unknown.validate(&schema).is_ok());
	}
}
