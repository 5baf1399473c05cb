// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use crate::schema::{FieldClass, Schema};
use crate::violation::SchemaViolation;
use crate::{Record, Scalar};

/// One logical field a record materialises into, independent of any
/// particular index implementation (spec.md §4.1). `nsdb-storage` maps
/// each of these onto a single concrete `tantivy` field that is both
/// indexed (point-range or term, depending on [`PointValue`] vs text)
/// and stored, so no separate "stored-only" variant is needed here —
/// the physical field's options (FAST | INDEXED | STORED) are a storage
/// concern, not a concern of what logical fields a record has.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexField {
	/// A range-queryable, retrievable numeric field.
	Point { name: String, value: PointValue },
	/// A term-queryable, retrievable text field.
	Text { name: String, value: String },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointValue {
	I64(i64),
	F64(f64),
}

/// Materialises `record` into the index fields implied by `schema`
/// (spec.md §4.1 "Rules"): the timestamp becomes a point field named
/// `timestamp`; the value becomes a point field named `value`; each
/// dimension/tag becomes one point or text field per its declared type.
pub fn materialize(schema: &Schema, record: &Record) -> Result<Vec<IndexField>, SchemaViolation> {
	record.validate(schema)?;

	let mut fields = vec![IndexField::Point { name: "timestamp".into(), value: PointValue::I64(record.timestamp) }];
	fields.push(scalar_field("value", &record.value));

	for (name, value) in record.dimensions.iter().chain(record.tags.iter()) {
		fields.push(scalar_field(name, value));
	}

	Ok(fields)
}

fn scalar_field(name: &str, value: &Scalar) -> IndexField {
	match value {
		Scalar::I64(v) => IndexField::Point { name: name.to_string(), value: PointValue::I64(*v) },
		Scalar::F64(v) | Scalar::Decimal(v) => {
			IndexField::Point { name: name.to_string(), value: PointValue::F64(*v) }
		}
		Scalar::Str(s) => IndexField::Text { name: name.to_string(), value: s.clone() },
	}
}

/// Whether `name` is a dimension-or-tag field of `schema` — used by the
/// shard index when deciding what a projection may select.
pub fn is_dimension_or_tag(schema: &Schema, name: &str) -> bool {
	schema.field(name).map(|f| matches!(f.class, FieldClass::Dimension | FieldClass::Tag)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn varchar_dimension_produces_a_text_field() {
		let record = Record::new(1, 1i64).with_dimension("name", "John");
		let schema = record.candidate_schema("people");
		let fields = materialize(&schema, &record).unwrap();
		assert!(fields.iter().any(|f| matches!(f, IndexField::Text { name, value } if name == "name" && value == "John")));
	}

	#[test]
	fn numeric_dimension_produces_a_point_field() {
		let record = Record::new(1, 1i64).with_dimension("age", 42i64);
		let schema = record.candidate_schema("people");
		let fields = materialize(&schema, &record).unwrap();
		assert!(fields
			.iter()
			.any(|f| matches!(f, IndexField::Point { name, value } if name == "age" && *value == PointValue::I64(42))));
	}

	#[test]
	fn rejects_materialising_an_invalid_record() {
		let record = Record::new(1, 1i64).with_dimension("name", "John");
		let schema = record.candidate_schema("people");
		let bad = Record::new(2, 1i64).with_dimension("name", 7i64);
		assert!(materialize(&schema, &bad).is_err());
	}
}
