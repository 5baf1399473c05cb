// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::DataType;

/// The role a field plays in a record (spec.md §3 "SchemaField").
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FieldClass {
	Dimension,
	Tag,
	Value,
	Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
	pub name: String,
	pub class: FieldClass,
	pub data_type: DataType,
}

impl SchemaField {
	pub fn new(name: impl Into<String>, class: FieldClass, data_type: DataType) -> Self {
		Self { name: name.into(), class, data_type }
	}
}

/// The declared set of typed fields of a metric (spec.md §3 "Schema").
/// Invariant: field names unique; exactly one field has class `Value`;
/// exactly one has class `Timestamp`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Schema {
	pub metric: String,
	fields: BTreeMap<String, SchemaField>,
}

impl Schema {
	/// Builds a schema, enforcing the class-uniqueness invariants.
	/// Returns `None` if the field set doesn't have exactly one
	/// `Value` field and exactly one `Timestamp` field.
	pub fn new(metric: impl Into<String>, fields: Vec<SchemaField>) -> Option<Self> {
		let value_count = fields.iter().filter(|f| f.class == FieldClass::Value).count();
		let timestamp_count = fields.iter().filter(|f| f.class == FieldClass::Timestamp).count();
		if value_count != 1 || timestamp_count != 1 {
			return None;
		}
		let fields = fields.into_iter().map(|f| (f.name.clone(), f)).collect();
		Some(Self { metric: metric.into(), fields })
	}

	pub fn field(&self, name: &str) -> Option<&SchemaField> {
		self.fields.get(name)
	}

	pub fn fields(&self) -> impl Iterator<Item = &SchemaField> {
		self.fields.values()
	}

	pub fn value_field(&self) -> &SchemaField {
		self.fields.values().find(|f| f.class == FieldClass::Value).expect("schema invariant: one value field")
	}

	pub fn timestamp_field(&self) -> &SchemaField {
		self.fields
			.values()
			.find(|f| f.class == FieldClass::Timestamp)
			.expect("schema invariant: one timestamp field")
	}

	pub fn dimension_and_tag_fields(&self) -> impl Iterator<Item = &SchemaField> {
		self.fields.values().filter(|f| matches!(f.class, FieldClass::Dimension | FieldClass::Tag))
	}

	pub fn tag_fields(&self) -> impl Iterator<Item = &SchemaField> {
		self.fields.values().filter(|f| f.class == FieldClass::Tag)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn field(name: &str, class: FieldClass, dt: DataType) -> SchemaField {
		SchemaField::new(name, class, dt)
	}

	#[test]
	fn requires_exactly_one_value_and_timestamp_field() {
		let fields = vec![
			field("timestamp", FieldClass::Timestamp, DataType::BigInt),
			field("value", FieldClass::Value, DataType::BigInt),
			field("name", FieldClass::Dimension, DataType::Varchar),
		];
		assert!(Schema::new("people", fields).is_some());
	}

	#[test]
	fn rejects_missing_value_field() {
		let fields = vec![field("timestamp", FieldClass::Timestamp, DataType::BigInt)];
		assert!(Schema::new("people", fields).is_none());
	}

	#[test]
	fn rejects_two_fields_with_value_class() {
		let fields = vec![
			field("timestamp", FieldClass::Timestamp, DataType::BigInt),
			field("value", FieldClass::Value, DataType::BigInt),
			field("reading", FieldClass::Value, DataType::Decimal),
		];
		assert!(Schema::new("people", fields).is_none());
	}
}
