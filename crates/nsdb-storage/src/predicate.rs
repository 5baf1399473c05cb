// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::ops::Bound;

use nsdb_type::{DataType, Schema as NsdbSchema, Scalar};
use serde::{Deserialize, Serialize};
use tantivy::query::{AllQuery, BooleanQuery, BoostQuery, Occur, Query, RangeQuery, TermQuery};
use tantivy::schema::IndexRecordOption;
use tantivy::Term;

use crate::schema_builder::ShardSchema;

/// Comparison operator for a [`Predicate::Cmp`] leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
	Gt,
	Gte,
	Lt,
	Lte,
}

/// The residual predicate left after the read coordinator extracts the
/// time range (spec.md §4.6 "residual predicate"), and the shape the
/// write coordinator's `deleteByQuery`/`ExecuteDeleteStatement` also use
/// (spec.md §4.5). Translated to a concrete `tantivy::Query` by
/// [`translate`] using the metric's schema for field-type lookup.
/// Serialisable so it can cross the wire as an inter-node shard-forward
/// argument (spec.md §4.5 step 4, §4.6 step 4; see `nsdb-network`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
	All,
	Eq(String, Scalar),
	Cmp(String, CmpOp, Scalar),
	And(Vec<Predicate>),
	Or(Vec<Predicate>),
	Not(Box<Predicate>),
}

/// Predicate translation (spec.md §4.3 "Predicate translation"):
/// equality -> term/point-exact query; comparison -> half-open or open
/// point range; conjunction -> boolean AND; disjunction -> boolean OR;
/// negation -> boolean NOT wrapping a MatchAll subtraction.
pub fn translate(nsdb_schema: &NsdbSchema, shard_schema: &ShardSchema, predicate: &Predicate) -> Box<dyn Query> {
	match predicate {
		Predicate::All => Box::new(AllQuery),
		Predicate::Eq(field, value) => eq_query(nsdb_schema, shard_schema, field, value),
		Predicate::Cmp(field, op, value) => cmp_query(nsdb_schema, shard_schema, field, *op, value),
		Predicate::And(parts) => {
			let clauses = parts
				.iter()
				.map(|p| (Occur::Must, translate(nsdb_schema, shard_schema, p)))
				.collect::<Vec<_>>();
			Box::new(BooleanQuery::from(clauses))
		}
		Predicate::Or(parts) => {
			let clauses = parts
				.iter()
				.map(|p| (Occur::Should, translate(nsdb_schema, shard_schema, p)))
				.collect::<Vec<_>>();
			Box::new(BooleanQuery::from(clauses))
		}
		Predicate::Not(inner) => {
			let negated = translate(nsdb_schema, shard_schema, inner);
			Box::new(BooleanQuery::from(vec![
				(Occur::Must, Box::new(AllQuery) as Box<dyn Query>),
				(Occur::MustNot, negated),
			]))
		}
	}
}

fn eq_query(nsdb_schema: &NsdbSchema, shard_schema: &ShardSchema, field: &str, value: &Scalar) -> Box<dyn Query> {
	if field == "timestamp" {
		if let Some(ts) = value.as_i64() {
			return range_i64(shard_schema.timestamp, Bound::Included(ts), Bound::Included(ts));
		}
		return Box::new(BoostQuery::new(Box::new(AllQuery), 0.0));
	}

	let Some(decl) = nsdb_schema.field(field) else {
		return Box::new(BoostQuery::new(Box::new(AllQuery), 0.0));
	};
	let Some((tantivy_field, is_text)) = shard_schema.group_field(field) else {
		return Box::new(BoostQuery::new(Box::new(AllQuery), 0.0));
	};

	if is_text || decl.data_type == DataType::Varchar {
		let text = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
		let term = Term::from_field_text(tantivy_field, &text);
		Box::new(TermQuery::new(term, IndexRecordOption::Basic))
	} else if let Some(i) = value.as_i64() {
		range_i64(tantivy_field, Bound::Included(i), Bound::Included(i))
	} else if let Some(f) = value.as_f64() {
		range_f64(tantivy_field, Bound::Included(f), Bound::Included(f))
	} else {
		Box::new(BoostQuery::new(Box::new(AllQuery), 0.0))
	}
}

fn cmp_query(
	nsdb_schema: &NsdbSchema,
	shard_schema: &ShardSchema,
	field: &str,
	op: CmpOp,
	value: &Scalar,
) -> Box<dyn Query> {
	let tantivy_field = if field == "timestamp" {
		shard_schema.timestamp
	} else if let Some((f, _)) = shard_schema.group_field(field) {
		f
	} else {
		return Box::new(BoostQuery::new(Box::new(AllQuery), 0.0));
	};
	let _ = nsdb_schema;

	if let Some(i) = value.as_i64() {
		let (lower, upper) = match op {
			CmpOp::Gt => (Bound::Excluded(i), Bound::Unbounded),
			CmpOp::Gte => (Bound::Included(i), Bound::Unbounded),
			CmpOp::Lt => (Bound::Unbounded, Bound::Excluded(i)),
			CmpOp::Lte => (Bound::Unbounded, Bound::Included(i)),
		};
		range_i64(tantivy_field, lower, upper)
	} else if let Some(fv) = value.as_f64() {
		let (lower, upper) = match op {
			CmpOp::Gt => (Bound::Excluded(fv), Bound::Unbounded),
			CmpOp::Gte => (Bound::Included(fv), Bound::Unbounded),
			CmpOp::Lt => (Bound::Unbounded, Bound::Excluded(fv)),
			CmpOp::Lte => (Bound::Unbounded, Bound::Included(fv)),
		};
		range_f64(tantivy_field, lower, upper)
	} else {
		Box::new(BoostQuery::new(Box::new(AllQuery), 0.0))
	}
}

fn range_i64(field: tantivy::schema::Field, lower: Bound<i64>, upper: Bound<i64>) -> Box<dyn Query> {
	let to_term = |b: Bound<i64>| b.map(|v| Term::from_field_i64(field, v));
	Box::new(RangeQuery::new(to_term(lower), to_term(upper)))
}

fn range_f64(field: tantivy::schema::Field, lower: Bound<f64>, upper: Bound<f64>) -> Box<dyn Query> {
	let to_term = |b: Bound<f64>| b.map(|v| Term::from_field_f64(field, v));
	Box::new(RangeQuery::new(to_term(lower), to_term(upper)))
}
