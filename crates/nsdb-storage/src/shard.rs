// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use nsdb_core::Result;
use nsdb_type::index_field::{self, IndexField, PointValue};
use nsdb_type::{DataType, FieldClass, Record, Scalar, Schema as NsdbSchema};
use tantivy::collector::{Count, DocSetCollector, TopDocs};
use tantivy::directory::MmapDirectory;
use tantivy::query::Query;
use tantivy::schema::{TantivyDocument, Value};
use tantivy::{DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy};
use tokio::sync::{Mutex, MutexGuard};

use crate::aggregation::{Aggregator, GroupAggregate};
use crate::predicate::{translate, Predicate};
use crate::projection::{Projection, Sort};
use crate::schema_builder::ShardSchema;

/// One `tantivy`-backed index for a single shard `Location` (spec.md
/// §4.3). Opened on demand by the node owning the shard's `Location`
/// and cached by the caller (the write/read coordinators).
pub struct ShardIndex {
	#[allow(dead_code)]
	index: Index,
	writer: Mutex<IndexWriter>,
	reader: IndexReader,
	shard_schema: ShardSchema,
	sequence: AtomicU64,
}

impl ShardIndex {
	/// Opens (or creates) the shard directory under `path`, building
	/// its `tantivy` schema from `nsdb_schema` as it stands right now
	/// (spec.md §4.3, §9 "Inheritance of indexes" — two concrete
	/// structures, `SchemaStore` and `ShardIndex`, not a hierarchy).
	pub fn open(path: &Path, nsdb_schema: &NsdbSchema) -> Result<Self> {
		std::fs::create_dir_all(path)?;
		let shard_schema = ShardSchema::build(nsdb_schema);
		let directory = MmapDirectory::open(path)?;
		let index = Index::open_or_create(directory, shard_schema.tantivy_schema.clone())?;
		let writer: IndexWriter = index.writer(30_000_000)?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		Ok(Self { index, writer: Mutex::new(writer), reader, shard_schema, sequence: AtomicU64::new(0) })
	}

	/// Acquires the scoped writer token (spec.md §4.3 "Scoped writer
	/// contract"). Only one may be outstanding at a time per shard —
	/// the `tokio::sync::Mutex` enforces that; the returned guard
	/// releases the lock on every exit path via `Drop`, including
	/// error paths, since that release never depends on the write
	/// having succeeded.
	pub async fn acquire_writer(&self) -> ShardWriterToken<'_> {
		ShardWriterToken {
			inner: self.writer.lock().await,
			shard_schema: &self.shard_schema,
			reader: &self.reader,
		}
	}

	/// An independent read snapshot: later commits are invisible to it
	/// until the caller reloads (spec.md §4.3 "Reader snapshot").
	pub fn snapshot(&self) -> ShardReader<'_> {
		ShardReader { reader: &self.reader, shard_schema: &self.shard_schema }
	}

	pub fn next_sequence(&self) -> u64 {
		self.sequence.fetch_add(1, Ordering::SeqCst)
	}
}

/// The scoped writer token (spec.md §4.3, §5 "Per-shard writer"): at
/// most one in-flight writer per shard; writes to this shard are
/// serialised by holding this guard for the duration of a batch.
pub struct ShardWriterToken<'a> {
	inner: MutexGuard<'a, IndexWriter>,
	shard_schema: &'a ShardSchema,
	reader: &'a IndexReader,
}

impl<'a> ShardWriterToken<'a> {
	/// Appends one record's materialised index fields and commits
	/// (spec.md §4.3 "write"). Reloads the reader afterwards so a
	/// snapshot taken right after this call observes the write
	/// (spec.md §8 "Write-read visibility") — the same explicit
	/// reload-after-commit `nsdb_catalog::SchemaStore` uses.
	#[tracing::instrument(skip(self, nsdb_schema, record), level = "trace")]
	pub fn write(&mut self, nsdb_schema: &NsdbSchema, record: &Record) -> Result<()> {
		let fields = index_field::materialize(nsdb_schema, record)
			.map_err(|v| nsdb_core::Error::SchemaConflict(vec![v.to_string()]))?;
		let doc = self.build_document(nsdb_schema, &fields);
		self.inner.add_document(doc)?;
		self.inner.commit()?;
		self.reader.reload()?;
		Ok(())
	}

	/// Appends a batch without an intermediate commit, then commits
	/// once — the "held for the duration of a write batch" case.
	pub fn write_batch(&mut self, nsdb_schema: &NsdbSchema, records: &[Record]) -> Result<()> {
		for record in records {
			let fields = index_field::materialize(nsdb_schema, record)
				.map_err(|v| nsdb_core::Error::SchemaConflict(vec![v.to_string()]))?;
			let doc = self.build_document(nsdb_schema, &fields);
			self.inner.add_document(doc)?;
		}
		self.inner.commit()?;
		self.reader.reload()?;
		Ok(())
	}

	/// Deletes every document with the exact `ts`, then force-merges
	/// deletes (spec.md §4.3 "deleteByTimestamp").
	pub fn delete_by_timestamp(&mut self, ts: i64) -> Result<()> {
		let term = tantivy::Term::from_field_i64(self.shard_schema.timestamp, ts);
		self.inner.delete_term(term);
		self.inner.commit()?;
		self.reader.reload()?;
		Ok(())
	}

	/// Translates `predicate` and deletes matches with a single
	/// `delete_query` call — the spec-prescribed resolution of Open
	/// Question 1 (spec.md §9), not a per-hit loop.
	pub fn delete_by_query(&mut self, nsdb_schema: &NsdbSchema, predicate: &Predicate) -> Result<()> {
		let query = translate(nsdb_schema, self.shard_schema, predicate);
		self.inner.delete_query(query)?;
		self.inner.commit()?;
		self.reader.reload()?;
		Ok(())
	}

	fn build_document(&self, nsdb_schema: &NsdbSchema, fields: &[IndexField]) -> TantivyDocument {
		let mut doc = TantivyDocument::default();
		for field in fields {
			match field {
				IndexField::Point { name, value } if name == "timestamp" => {
					if let PointValue::I64(v) = value {
						doc.add_i64(self.shard_schema.timestamp, *v);
					}
				}
				IndexField::Point { name, value } if name == "value" => match value {
					PointValue::I64(v) => doc.add_i64(self.shard_schema.value_int, *v),
					PointValue::F64(v) => doc.add_f64(self.shard_schema.value_float, *v),
				},
				IndexField::Point { name, value } => {
					if let Some((tantivy_field, _)) = self.shard_schema.group_field(name) {
						match value {
							PointValue::I64(v) => doc.add_i64(tantivy_field, *v),
							PointValue::F64(v) => doc.add_f64(tantivy_field, *v),
						}
					} else {
						doc.add_text(self.shard_schema.extra_json, format!("{name}={value:?}"));
					}
				}
				IndexField::Text { name, value } => {
					if let Some((tantivy_field, _)) = self.shard_schema.group_field(name) {
						doc.add_text(tantivy_field, value);
					} else {
						doc.add_text(self.shard_schema.extra_json, format!("{name}={value}"));
					}
				}
			}
		}
		let _ = nsdb_schema;
		doc
	}
}

/// A point-in-time, snapshot-isolated read handle (spec.md §4.3 "Reader
/// snapshot", §5 "Readers never block writers").
pub struct ShardReader<'a> {
	reader: &'a IndexReader,
	shard_schema: &'a ShardSchema,
}

impl<'a> ShardReader<'a> {
	pub fn reload(&self) -> Result<()> {
		self.reader.reload()?;
		Ok(())
	}

	/// `query(schema, predicate, projection, limit, sort?)` (spec.md
	/// §4.3).
	pub fn query(
		&self,
		nsdb_schema: &NsdbSchema,
		predicate: &Predicate,
		projection: &Projection,
		limit: usize,
		sort: Option<&Sort>,
	) -> Result<Vec<Record>> {
		let searcher = self.reader.searcher();
		let query = translate(nsdb_schema, self.shard_schema, predicate);

		let addresses = self.matching_addresses(query.as_ref(), limit.max(1).saturating_mul(4).max(limit), &searcher)?;
		let mut records: Vec<Record> = addresses
			.into_iter()
			.map(|address| {
				let doc: TantivyDocument = searcher.doc(address)?;
				Ok(self.reconstruct(nsdb_schema, &doc, projection))
			})
			.collect::<Result<Vec<_>>>()?;

		if let Some(sort) = sort {
			sort_records(&mut records, sort);
		}
		records.truncate(limit);
		Ok(records)
	}

	fn matching_addresses(
		&self,
		query: &dyn Query,
		soft_limit: usize,
		searcher: &tantivy::Searcher,
	) -> Result<Vec<DocAddress>> {
		// Sorting and grouping both need every match, not just a
		// scored top-k, so an unbounded query pulls every address via
		// `DocSetCollector`; a bounded one still uses `TopDocs` for
		// the common unsorted/limited case to avoid materialising
		// documents the caller will immediately discard.
		if soft_limit >= searcher.num_docs() as usize {
			let set = searcher.search(query, &DocSetCollector)?;
			Ok(set.into_iter().collect())
		} else {
			let hits = searcher.search(query, &TopDocs::with_limit(soft_limit))?;
			Ok(hits.into_iter().map(|(_, address)| address).collect())
		}
	}

	/// `countQuery(schema, predicate, limit)` (spec.md §4.3).
	pub fn count_query(&self, nsdb_schema: &NsdbSchema, predicate: &Predicate, limit: Option<usize>) -> Result<i64> {
		let searcher = self.reader.searcher();
		let query = translate(nsdb_schema, self.shard_schema, predicate);
		let count = searcher.search(query.as_ref(), &Count)?;
		Ok(match limit {
			Some(limit) => count.min(limit) as i64,
			None => count as i64,
		})
	}

	/// `groupedAggregation(...)` (spec.md §4.3): returns one partial
	/// [`GroupAggregate`] per distinct value of `group_by_field`,
	/// always carrying sum/count/min/max so the read coordinator can
	/// reduce across shards regardless of which aggregator the caller
	/// asked for (spec.md §4.6.1).
	pub fn grouped_aggregation(
		&self,
		nsdb_schema: &NsdbSchema,
		predicate: &Predicate,
		group_by_field: &str,
	) -> Result<Vec<GroupAggregate>> {
		let searcher = self.reader.searcher();
		let query = translate(nsdb_schema, self.shard_schema, predicate);
		let set = searcher.search(query.as_ref(), &DocSetCollector)?;

		let mut groups: BTreeMap<String, GroupAggregate> = BTreeMap::new();
		for address in set {
			let doc: TantivyDocument = searcher.doc(address)?;
			let record = self.reconstruct(nsdb_schema, &doc, &Projection::All);
			let Some(key) = group_key(nsdb_schema, &record, group_by_field) else { continue };
			let Some(value) = numeric_value(&record.value) else { continue };
			groups
				.entry(key.to_string())
				.and_modify(|agg| agg.accumulate(value))
				.or_insert_with(|| GroupAggregate::new(key.clone(), value));
		}
		Ok(groups.into_values().collect())
	}

	/// `all(schema)` (spec.md §4.3).
	pub fn all(&self, nsdb_schema: &NsdbSchema) -> Result<Vec<Record>> {
		self.query(nsdb_schema, &Predicate::All, &Projection::All, usize::MAX, None)
	}

	/// `count()` (spec.md §4.3).
	pub fn count(&self) -> Result<i64> {
		let searcher = self.reader.searcher();
		Ok(searcher.search(&tantivy::query::AllQuery, &Count)? as i64)
	}

	fn reconstruct(&self, nsdb_schema: &NsdbSchema, doc: &TantivyDocument, projection: &Projection) -> Record {
		let timestamp = doc
			.get_first(self.shard_schema.timestamp)
			.and_then(|v| v.as_i64())
			.unwrap_or_default();

		let value = match nsdb_schema.value_field().data_type {
			DataType::Int | DataType::BigInt => {
				Scalar::I64(doc.get_first(self.shard_schema.value_int).and_then(|v| v.as_i64()).unwrap_or_default())
			}
			DataType::Decimal => Scalar::Decimal(
				doc.get_first(self.shard_schema.value_float).and_then(|v| v.as_f64()).unwrap_or_default(),
			),
			DataType::Varchar => Scalar::I64(0),
		};

		let mut dimensions = BTreeMap::new();
		let mut tags = BTreeMap::new();
		for field in nsdb_schema.dimension_and_tag_fields() {
			if !projection.includes(&field.name) && !matches!(projection, Projection::All) {
				continue;
			}
			let Some((tantivy_field, is_text)) = self.shard_schema.group_field(&field.name) else { continue };
			let scalar = if is_text {
				doc.get_first(tantivy_field).and_then(|v| v.as_str()).map(Scalar::from)
			} else {
				match field.data_type {
					DataType::Decimal => doc.get_first(tantivy_field).and_then(|v| v.as_f64()).map(Scalar::Decimal),
					_ => doc.get_first(tantivy_field).and_then(|v| v.as_i64()).map(Scalar::I64),
				}
			};
			if let Some(scalar) = scalar {
				match field.class {
					FieldClass::Tag => {
						tags.insert(field.name.clone(), scalar);
					}
					FieldClass::Dimension => {
						dimensions.insert(field.name.clone(), scalar);
					}
					_ => {}
				}
			}
		}

		Record { timestamp, value, dimensions, tags }
	}
}

fn group_key(nsdb_schema: &NsdbSchema, record: &Record, field: &str) -> Option<Scalar> {
	let _ = nsdb_schema;
	record.dimensions.get(field).or_else(|| record.tags.get(field)).cloned()
}

fn numeric_value(value: &Scalar) -> Option<f64> {
	match value {
		Scalar::I64(v) => Some(*v as f64),
		Scalar::F64(v) | Scalar::Decimal(v) => Some(*v),
		Scalar::Str(_) => None,
	}
}

fn sort_records(records: &mut [Record], sort: &Sort) {
	records.sort_by(|a, b| {
		let ord = sort_key(a, &sort.field).partial_cmp(&sort_key(b, &sort.field)).unwrap_or(std::cmp::Ordering::Equal);
		if sort.descending {
			ord.reverse()
		} else {
			ord
		}
	});
}

fn sort_key(record: &Record, field: &str) -> f64 {
	if field == "timestamp" {
		return record.timestamp as f64;
	}
	if field == "value" {
		return numeric_value(&record.value).unwrap_or(0.0);
	}
	record
		.dimensions
		.get(field)
		.or_else(|| record.tags.get(field))
		.and_then(numeric_value)
		.unwrap_or(0.0)
}

