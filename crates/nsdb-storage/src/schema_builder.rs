// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::collections::HashMap;

use nsdb_type::{DataType, Schema as NsdbSchema};
use tantivy::schema::{Field, Schema as TantivySchema, FAST, INDEXED, STORED, STRING, TEXT};

/// The concrete `tantivy::Schema` one shard index builds for a given
/// metric schema (spec.md §4.3 "concrete field mapping"): `timestamp`
/// is a fast+indexed+stored i64; `value` is one fast+stored i64/f64
/// field per runtime tag; every declared dimension/tag becomes either a
/// text field (`VARCHAR`) or a numeric field (`INT`/`BIGINT`/`DECIMAL`),
/// all fast+indexed+stored so the same physical field serves both
/// querying and record reconstruction; `_count` backs grouped
/// aggregation's synthetic documents.
///
/// Built once, at shard-open time, from the metric schema then in
/// effect. Because `tantivy`'s on-disk schema is immutable, a field
/// added to the metric schema *after* a shard already exists is not
/// retrofitted into that shard's schema — its value is still captured,
/// via `extra_json`, but is not filterable/groupable until the shard
/// rolls over to a new bin with the field already known.
pub struct ShardSchema {
	pub tantivy_schema: TantivySchema,
	pub timestamp: Field,
	pub value_int: Field,
	pub value_float: Field,
	pub count: Field,
	pub extra_json: Field,
	/// Name -> (field, is_text). Covers every dimension/tag known when
	/// this shard schema was built.
	pub known: HashMap<String, (Field, bool)>,
}

impl ShardSchema {
	pub fn build(schema: &NsdbSchema) -> Self {
		let mut builder = TantivySchema::builder();
		let timestamp = builder.add_i64_field("timestamp", FAST | INDEXED | STORED);
		let value_int = builder.add_i64_field("value_int", FAST | STORED);
		let value_float = builder.add_f64_field("value_float", FAST | STORED);
		let count = builder.add_u64_field("_count", FAST | STORED);
		let extra_json = builder.add_text_field("extra_json", TEXT | STORED);

		let mut known = HashMap::new();
		for field in schema.dimension_and_tag_fields() {
			let (tantivy_field, is_text) = match field.data_type {
				DataType::Varchar => (builder.add_text_field(&field.name, STRING | TEXT | STORED), true),
				DataType::Int | DataType::BigInt => {
					(builder.add_i64_field(&field.name, FAST | INDEXED | STORED), false)
				}
				DataType::Decimal => (builder.add_f64_field(&field.name, FAST | INDEXED | STORED), false),
			};
			known.insert(field.name.clone(), (tantivy_field, is_text));
		}

		let tantivy_schema = builder.build();
		Self { tantivy_schema, timestamp, value_int, value_float, count, extra_json, known }
	}

	pub fn group_field(&self, name: &str) -> Option<(Field, bool)> {
		self.known.get(name).copied()
	}
}

