// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::path::Path;

use dashmap::DashMap;
use nsdb_core::Result;
use nsdb_type::{Schema, SchemaField};

use crate::incompatible::{FieldConflict, Incompatible};
use crate::store::SchemaStore;

/// Per-(db, namespace) schema registry (spec.md §4.2). The `DashMap` is
/// the fast read path; `store` is the authoritative persisted copy.
/// Single-writer discipline: only the write coordinator calls `update`,
/// `delete`, `delete_all` for a given registry instance.
pub struct SchemaRegistry {
	cache: DashMap<String, Schema>,
	store: SchemaStore,
}

impl SchemaRegistry {
	/// Opens (or creates) the registry rooted at `base_path/schema`,
	/// rebuilding the in-memory map from a full scan of the persisted
	/// index (spec.md §4.2 "On process start").
	pub fn open(base_path: &Path) -> Result<Self> {
		let store = SchemaStore::open(&base_path.join("schema"))?;
		let cache = DashMap::new();
		for schema in store.scan_all()? {
			cache.insert(schema.metric.clone(), schema);
		}
		Ok(Self { cache, store })
	}

	pub fn get(&self, metric: &str) -> Option<Schema> {
		self.cache.get(metric).map(|entry| entry.value().clone())
	}

	/// Implements the compatibility rule of spec.md §4.2: shared fields
	/// must agree on `data_type`; the effective schema is the union,
	/// with `proposed`'s fields winning for shared names.
	#[tracing::instrument(skip(self, proposed), level = "trace")]
	pub fn update(&self, metric: &str, proposed: Schema) -> std::result::Result<Schema, Incompatible> {
		let Some(existing) = self.get(metric) else {
			self.persist(proposed.clone());
			return Ok(proposed);
		};

		let mut conflicts = Vec::new();
		for new_field in proposed.fields() {
			if let Some(old_field) = existing.field(&new_field.name) {
				if old_field.data_type != new_field.data_type {
					conflicts.push(FieldConflict {
						field: new_field.name.clone(),
						old: old_field.data_type,
						new: new_field.data_type,
					});
				}
			}
		}
		if !conflicts.is_empty() {
			return Err(Incompatible(conflicts));
		}

		let mut merged: Vec<SchemaField> = existing.fields().cloned().collect();
		for new_field in proposed.fields() {
			if let Some(slot) = merged.iter_mut().find(|f| f.name == new_field.name) {
				*slot = new_field.clone();
			} else {
				merged.push(new_field.clone());
			}
		}
		let effective = Schema::new(metric.to_string(), merged)
			.expect("union of two valid schemas keeps exactly one value/timestamp field");
		self.persist(effective.clone());
		Ok(effective)
	}

	fn persist(&self, schema: Schema) {
		if let Err(err) = self.store.upsert(&schema) {
			tracing::warn!(metric = %schema.metric, error = %err, "failed to persist schema update");
		}
		self.cache.insert(schema.metric.clone(), schema);
	}

	pub fn delete(&self, metric: &str) -> Result<()> {
		self.store.delete(metric)?;
		self.cache.remove(metric);
		Ok(())
	}

	pub fn delete_all(&self) -> Result<()> {
		self.store.delete_all()?;
		self.cache.clear();
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use nsdb_type::{DataType, FieldClass};

	fn field(name: &str, class: FieldClass, dt: DataType) -> SchemaField {
		SchemaField::new(name, class, dt)
	}

	fn base_schema(metric: &str) -> Schema {
		Schema::new(
			metric,
			vec![
				field("timestamp", FieldClass::Timestamp, DataType::BigInt),
				field("value", FieldClass::Value, DataType::BigInt),
			],
		)
		.unwrap()
	}

	#[test]
	fn first_update_is_accepted_verbatim() {
		let dir = tempfile::tempdir().unwrap();
		let registry = SchemaRegistry::open(dir.path()).unwrap();
		let schema = base_schema("people");
		let effective = registry.update("people", schema.clone()).unwrap();
		assert_eq!(effective, schema);
		assert_eq!(registry.get("people"), Some(schema));
	}

	#[test]
	fn additive_update_is_a_superset() {
		let dir = tempfile::tempdir().unwrap();
		let registry = SchemaRegistry::open(dir.path()).unwrap();
		registry.update("people", base_schema("people")).unwrap();

		let mut fields: Vec<SchemaField> = base_schema("people").fields().cloned().collect();
		fields.push(field("name", FieldClass::Dimension, DataType::Varchar));
		let proposed = Schema::new("people", fields).unwrap();

		let effective = registry.update("people", proposed).unwrap();
		assert!(effective.field("name").is_some());
		assert!(effective.field("value").is_some());
	}

	#[test]
	fn conflicting_type_is_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let registry = SchemaRegistry::open(dir.path()).unwrap();
		registry.update("people", base_schema("people")).unwrap();

		let mut fields: Vec<SchemaField> = base_schema("people").fields().cloned().collect();
		fields.push(field("name", FieldClass::Dimension, DataType::Varchar));
		registry.update("people", Schema::new("people", fields).unwrap()).unwrap();

		let mut conflicting: Vec<SchemaField> = base_schema("people").fields().cloned().collect();
		conflicting.push(field("name", FieldClass::Dimension, DataType::BigInt));
		let err = registry.update("people", Schema::new("people", conflicting).unwrap()).unwrap_err();
		assert_eq!(err.0.len(), 1);
		assert_eq!(err.0[0].field, "name");
	}

	#[test]
	fn delete_then_write_recreates_schema() {
		let dir = tempfile::tempdir().unwrap();
		let registry = SchemaRegistry::open(dir.path()).unwrap();
		registry.update("people", base_schema("people")).unwrap();
		registry.delete("people").unwrap();
		assert!(registry.get("people").is_none());
		let effective = registry.update("people", base_schema("people")).unwrap();
		assert_eq!(effective, base_schema("people"));
	}
}
