// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

pub mod aggregation;
pub mod predicate;
pub mod projection;
pub mod schema_builder;
pub mod shard;

pub use aggregation::{Aggregator, GroupAggregate};
pub use predicate::{CmpOp, Predicate};
pub use projection::{Projection, Sort};
pub use schema_builder::ShardSchema;
pub use shard::{ShardIndex, ShardReader, ShardWriterToken};

#[cfg(test)]
mod tests {
	use nsdb_type::{DataType, FieldClass, Record, Schema, SchemaField};

	use crate::predicate::{CmpOp, Predicate};
	use crate::projection::Projection;
	use crate::shard::ShardIndex;

	fn people_schema() -> Schema {
		Schema::new(
			"people",
			vec![
				SchemaField::new("timestamp", FieldClass::Timestamp, DataType::BigInt),
				SchemaField::new("value", FieldClass::Value, DataType::BigInt),
				SchemaField::new("name", FieldClass::Dimension, DataType::Varchar),
				SchemaField::new("surname", FieldClass::Tag, DataType::Varchar),
			],
		)
		.unwrap()
	}

	async fn seeded_shard() -> (tempfile::TempDir, ShardIndex) {
		let dir = tempfile::tempdir().unwrap();
		let schema = people_schema();
		let shard = ShardIndex::open(dir.path(), &schema).unwrap();
		{
			let mut writer = shard.acquire_writer().await;
			let names = ["John", "John", "Bill", "Frank", "Frank"];
			for (i, ts) in [2, 4, 6, 8, 10].into_iter().enumerate() {
				let record =
					Record::new(ts, 1i64).with_dimension("name", names[i]).with_tag("surname", "Doe");
				writer.write(&schema, &record).unwrap();
			}
		}
		(dir, shard)
	}

	#[tokio::test]
	async fn select_star_returns_every_row() {
		let (_dir, shard) = seeded_shard().await;
		let schema = people_schema();
		let reader = shard.snapshot();
		let records = reader.query(&schema, &Predicate::All, &Projection::All, 5, None).unwrap();
		assert_eq!(records.len(), 5);
	}

	#[tokio::test]
	async fn range_predicate_narrows_results() {
		let (_dir, shard) = seeded_shard().await;
		let schema = people_schema();
		let reader = shard.snapshot();
		let predicate = Predicate::And(vec![
			Predicate::Cmp("timestamp".into(), CmpOp::Gte, 2i64.into()),
			Predicate::Cmp("timestamp".into(), CmpOp::Lte, 4i64.into()),
		]);
		let records =
			reader.query(&schema, &predicate, &Projection::Fields(vec!["name".into()]), 5, None).unwrap();
		assert_eq!(records.len(), 2);
	}

	#[tokio::test]
	async fn grouped_sum_aggregates_by_name() {
		let (_dir, shard) = seeded_shard().await;
		let schema = people_schema();
		let reader = shard.snapshot();
		let predicate = Predicate::Cmp("timestamp".into(), CmpOp::Gte, 2i64.into());
		let groups = reader.grouped_aggregation(&schema, &predicate, "name").unwrap();
		assert_eq!(groups.len(), 3);
		let john = groups.iter().find(|g| g.key == nsdb_type::Scalar::Str("John".into())).unwrap();
		assert_eq!(john.sum, 2.0);
	}

	#[tokio::test]
	async fn delete_by_timestamp_removes_exact_row() {
		let (_dir, shard) = seeded_shard().await;
		let schema = people_schema();
		{
			let mut writer = shard.acquire_writer().await;
			writer.delete_by_timestamp(2).unwrap();
		}
		let reader = shard.snapshot();
		reader.reload().unwrap();
		assert_eq!(reader.count().unwrap(), 4);
	}
}
