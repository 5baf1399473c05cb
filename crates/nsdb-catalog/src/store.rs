// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::path::Path;
use std::sync::Mutex;

use nsdb_core::Result;
use nsdb_type::{DataType, FieldClass, Schema, SchemaField};
use serde::{Deserialize, Serialize};
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{AllQuery, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, TantivyDocument, Value};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Term};

/// Wire shape of a persisted [`SchemaField`] — a short stable tag
/// string for `indexType`, per spec.md §9 "Class-name round-trip for
/// schema types".
#[derive(Serialize, Deserialize)]
struct StoredField {
	name: String,
	class: String,
	data_type: String,
}

#[derive(Serialize, Deserialize)]
struct StoredSchema {
	metric: String,
	fields: Vec<StoredField>,
}

fn class_tag(class: FieldClass) -> &'static str {
	match class {
		FieldClass::Dimension => "DIMENSION",
		FieldClass::Tag => "TAG",
		FieldClass::Value => "VALUE",
		FieldClass::Timestamp => "TIMESTAMP",
	}
}

fn class_from_tag(tag: &str) -> Option<FieldClass> {
	Some(match tag {
		"DIMENSION" => FieldClass::Dimension,
		"TAG" => FieldClass::Tag,
		"VALUE" => FieldClass::Value,
		"TIMESTAMP" => FieldClass::Timestamp,
		_ => return None,
	})
}

/// The authoritative per-(db, namespace) persisted copy of every
/// metric's schema: one document per metric, key field `_metric`,
/// stored field `fields_json` (spec.md §4.2, §6 "Persisted state
/// layout").
pub struct SchemaStore {
	index: Index,
	writer: Mutex<IndexWriter>,
	reader: IndexReader,
	metric_field: Field,
	fields_field: Field,
}

impl SchemaStore {
	pub fn open(base_path: &Path) -> Result<Self> {
		std::fs::create_dir_all(base_path)?;

		let mut builder = tantivy::schema::Schema::builder();
		let metric_field = builder.add_text_field("_metric", tantivy::schema::STRING | tantivy::schema::STORED);
		let fields_field = builder.add_text_field("fields_json", tantivy::schema::STORED);
		let schema = builder.build();

		let directory = MmapDirectory::open(base_path)?;
		let index = Index::open_or_create(directory, schema)?;
		let writer: IndexWriter = index.writer(15_000_000)?;
		let reader =
			index.reader_builder().reload_policy(ReloadPolicy::OnCommitWithDelay).try_into()?;

		Ok(Self { index, writer: Mutex::new(writer), reader, metric_field, fields_field })
	}

	/// Single upsert: delete-by-term on `_metric` then one add, inside
	/// one `IndexWriter` commit, so the metric is never observably
	/// schemaless mid-update (spec.md §9 Open Question 3).
	#[tracing::instrument(skip(self, schema), level = "trace")]
	pub fn upsert(&self, schema: &Schema) -> Result<()> {
		let json = serialize(schema);
		let mut writer = self.writer.lock().expect("schema store writer poisoned");
		writer.delete_term(Term::from_field_text(self.metric_field, &schema.metric));
		let mut doc = TantivyDocument::default();
		doc.add_text(self.metric_field, &schema.metric);
		doc.add_text(self.fields_field, &json);
		writer.add_document(doc)?;
		writer.commit()?;
		self.reader.reload()?;
		Ok(())
	}

	pub fn delete(&self, metric: &str) -> Result<()> {
		let mut writer = self.writer.lock().expect("schema store writer poisoned");
		writer.delete_term(Term::from_field_text(self.metric_field, metric));
		writer.commit()?;
		self.reader.reload()?;
		Ok(())
	}

	pub fn delete_all(&self) -> Result<()> {
		let mut writer = self.writer.lock().expect("schema store writer poisoned");
		writer.delete_query(Box::new(AllQuery))?;
		writer.commit()?;
		self.reader.reload()?;
		Ok(())
	}

	/// Rebuilds the in-memory registry map via a full scan, run once on
	/// process start (spec.md §4.2).
	pub fn scan_all(&self) -> Result<Vec<Schema>> {
		let searcher = self.reader.searcher();
		if searcher.num_docs() == 0 {
			return Ok(Vec::new());
		}
		let hits = searcher.search(&AllQuery, &TopDocs::with_limit(searcher.num_docs() as usize))?;
		let mut schemas = Vec::with_capacity(hits.len());
		for (_, address) in hits {
			let doc: TantivyDocument = searcher.doc(address)?;
			if let Some(json) = doc.get_first(self.fields_field).and_then(|v| v.as_str()) {
				if let Some(schema) = deserialize(json) {
					schemas.push(schema);
				}
			}
		}
		Ok(schemas)
	}

	pub fn get(&self, metric: &str) -> Result<Option<Schema>> {
		let searcher = self.reader.searcher();
		let term = Term::from_field_text(self.metric_field, metric);
		let query = TermQuery::new(term, IndexRecordOption::Basic);
		let hits = searcher.search(&query, &TopDocs::with_limit(1))?;
		let Some((_, address)) = hits.into_iter().next() else { return Ok(None) };
		let doc: TantivyDocument = searcher.doc(address)?;
		let json = doc.get_first(self.fields_field).and_then(|v| v.as_str()).unwrap_or_default();
		Ok(deserialize(json))
	}
}

fn serialize(schema: &Schema) -> String {
	let fields: Vec<StoredField> = schema
		.fields()
		.map(|f| StoredField {
			name: f.name.clone(),
			class: class_tag(f.class).to_string(),
			data_type: f.data_type.tag().to_string(),
		})
		.collect();
	let stored = StoredSchema { metric: schema.metric.clone(), fields };
	serde_json::to_string(&stored).expect("schema is always serialisable")
}

fn deserialize(json: &str) -> Option<Schema> {
	let stored: StoredSchema = serde_json::from_str(json).ok()?;
	let fields: Vec<SchemaField> = stored
		.fields
		.into_iter()
		.filter_map(|s| {
			Some(SchemaField::new(s.name, class_from_tag(&s.class)?, DataType::from_tag(&s.data_type)?))
		})
		.collect();
	Schema::new(stored.metric, fields)
}
