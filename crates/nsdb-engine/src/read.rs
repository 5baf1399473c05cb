// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

//! The read coordinator (spec.md §4.6, C6): parses a statement, resolves
//! the schema, narrows a shard set from the condition's time range, fans
//! out per-shard queries or grouped aggregations, and merges the results.

use std::collections::BTreeMap;
use std::sync::Arc;

use nsdb_catalog::SchemaRegistry;
use nsdb_cluster::ClusterView;
use nsdb_core::{Deadline, Error, Result};
use nsdb_metadata::MetadataStore;
use nsdb_storage::{Aggregator, GroupAggregate, Predicate, Projection, Sort};
use nsdb_type::{Record, Scalar};
use tokio::task::JoinSet;

use crate::ast::{Condition, Fields, Op, SelectStatement};
use crate::dispatch::RemoteDispatch;
use crate::shard_cache::ShardCache;

/// One per-(db, namespace) read coordinator (spec.md §4.6). Shares the
/// same `ShardCache` and registries as the [`crate::write::WriteCoordinator`]
/// for the same namespace — a shard's writer token and reader snapshot
/// live on the same `ShardIndex` (spec.md §4.3).
pub struct ReadCoordinator {
	namespace: String,
	cluster: Arc<dyn ClusterView>,
	schema: Arc<SchemaRegistry>,
	metadata: Arc<MetadataStore>,
	shards: Arc<ShardCache>,
	dispatch: Option<Arc<dyn RemoteDispatch>>,
}

impl ReadCoordinator {
	pub fn new(
		namespace: impl Into<String>,
		cluster: Arc<dyn ClusterView>,
		schema: Arc<SchemaRegistry>,
		metadata: Arc<MetadataStore>,
		shards: Arc<ShardCache>,
		dispatch: Option<Arc<dyn RemoteDispatch>>,
	) -> Self {
		Self { namespace: namespace.into(), cluster, schema, metadata, shards, dispatch }
	}

	/// `ExecuteStatement(SelectSQLStatement)` (spec.md §4.6). `deadline`
	/// bounds the whole fan-out; outstanding shard subqueries are
	/// abandoned and partial results discarded once it elapses (spec.md
	/// §4.6 "Cancellation", §5 "Timeouts").
	#[tracing::instrument(skip(self, statement), fields(namespace = %self.namespace, metric = %statement.metric), level = "trace")]
	pub async fn execute_statement(&self, statement: &SelectStatement, deadline: Deadline) -> Result<Vec<Record>> {
		let schema = self.schema.get(&statement.metric).ok_or_else(|| Error::MetricNotFound(statement.metric.clone()))?;

		let aggregator = self.validate_projection(statement)?;

		let predicate = statement.condition.as_ref().map(Condition::to_predicate).unwrap_or(Predicate::All);
		let ranges = statement.condition.as_ref().map(extract_ranges).unwrap_or_else(|| vec![(i64::MIN, i64::MAX)]);

		let mut locations = Vec::new();
		let mut seen = std::collections::HashSet::new();
		for (lo, hi) in &ranges {
			for loc in self.metadata.locations_overlapping(&statement.metric, *lo, *hi) {
				if seen.insert(loc.bin_index) {
					locations.push(loc);
				}
			}
		}

		let remaining = deadline.remaining();
		let fanout = self.fan_out(statement, &schema, &predicate, locations);
		let results = match tokio::time::timeout(remaining, fanout).await {
			Ok(results) => results?,
			Err(_) => return Err(Error::Timeout),
		};

		if let Some((group_by, aggregator)) = statement.group_by.as_ref().zip(aggregator) {
			self.merge_grouped(group_by, aggregator, statement, results)
		} else {
			self.merge_rows(statement, results)
		}
	}

	/// spec.md §4.6 step 2: "a `groupBy` whose projection contains
	/// non-aggregated, non-group fields" fails; aggregations only apply
	/// to the `value` field. Returns the single aggregator the
	/// statement requests, if any.
	fn validate_projection(&self, statement: &SelectStatement) -> Result<Option<Aggregator>> {
		let Fields::List(fields) = &statement.fields else {
			if statement.group_by.is_some() {
				return Err(Error::InvalidStatement("group-by requires aggregation".to_string()));
			}
			return Ok(None);
		};

		let mut aggregator = None;
		for field in fields {
			match (&field.aggregation, &statement.group_by) {
				(Some(_), None) => {
					return Err(Error::InvalidStatement(
						"an aggregated field requires GROUP BY".to_string(),
					));
				}
				(Some(agg), Some(_)) => {
					if field.name != "value" {
						return Err(Error::InvalidStatement(format!(
							"aggregation `{:?}` only applies to the value field, found `{}`",
							agg.to_storage(),
							field.name
						)));
					}
					aggregator = Some(agg.to_storage());
				}
				(None, Some(group_by)) if &field.name != group_by => {
					return Err(Error::InvalidStatement("group-by requires aggregation".to_string()));
				}
				(None, _) => {}
			}
		}
		if statement.group_by.is_some() && aggregator.is_none() {
			return Err(Error::InvalidStatement("group-by requires aggregation".to_string()));
		}
		Ok(aggregator)
	}

	async fn fan_out(
		&self,
		statement: &SelectStatement,
		schema: &nsdb_type::Schema,
		predicate: &Predicate,
		locations: Vec<nsdb_metadata::Location>,
	) -> Result<Vec<ShardResult>> {
		let mut join_set: JoinSet<Result<ShardResult>> = JoinSet::new();
		for loc in locations {
			let schema = schema.clone();
			let predicate = predicate.clone();
			let namespace = self.namespace.clone();
			let metric = statement.metric.clone();
			let group_by = statement.group_by.clone();
			let projection = projection_of(statement);
			let sort = sort_of(statement);
			let limit = statement.limit.unwrap_or(usize::MAX);
			let self_id = self.cluster.self_id();
			let node_id = loc.node_id.clone();
			let bin_index = loc.bin_index;

			if node_id != self_id {
				let Some(dispatch) = self.dispatch.clone() else {
					return Err(Error::Unavailable(node_id));
				};
				join_set.spawn(async move {
					if let Some(group_by) = group_by {
						let groups = dispatch
							.forward_grouped(&node_id, &namespace, &metric, bin_index, predicate, group_by)
							.await?;
						Ok(ShardResult::Grouped(groups))
					} else {
						let rows = dispatch
							.forward_query(&node_id, &namespace, &metric, bin_index, predicate, projection, limit, sort)
							.await?;
						Ok(ShardResult::Rows(rows))
					}
				});
				continue;
			}

			let shards = self.shards.clone();
			join_set.spawn(async move {
				let shard = shards.open(&metric, &loc, &schema).await?;
				let reader = shard.snapshot();
				if let Some(group_by) = &group_by {
					let groups = reader.grouped_aggregation(&schema, &predicate, group_by)?;
					Ok(ShardResult::Grouped(groups))
				} else {
					let rows = reader.query(&schema, &predicate, &projection, limit, sort.as_ref())?;
					Ok(ShardResult::Rows(rows))
				}
			});
		}

		let mut results = Vec::new();
		while let Some(joined) = join_set.join_next().await {
			let result = joined.map_err(|e| Error::IoError(e.to_string()))??;
			results.push(result);
		}
		Ok(results)
	}

	/// spec.md §4.6.1 "Non-grouped" merge: concatenate, optionally
	/// k-way merge by sort key, then truncate to the global limit.
	fn merge_rows(&self, statement: &SelectStatement, results: Vec<ShardResult>) -> Result<Vec<Record>> {
		let mut rows: Vec<Record> = results
			.into_iter()
			.flat_map(|r| match r {
				ShardResult::Rows(rows) => rows,
				ShardResult::Grouped(_) => Vec::new(),
			})
			.collect();

		if let Some(sort) = &statement.order {
			rows.sort_by(|a, b| {
				let ord = sort_key(a, &sort.field).partial_cmp(&sort_key(b, &sort.field)).unwrap_or(std::cmp::Ordering::Equal);
				if sort.descending { ord.reverse() } else { ord }
			});
		}
		let limit = statement.limit.unwrap_or(usize::MAX);
		rows.truncate(limit);
		Ok(rows)
	}

	/// spec.md §4.6.1 "Grouped" merge: reduce partials per group key
	/// across shards, finalise the requested aggregator, apply a global
	/// sort on the aggregated value if requested, then truncate.
	fn merge_grouped(
		&self,
		group_by: &str,
		aggregator: Aggregator,
		statement: &SelectStatement,
		results: Vec<ShardResult>,
	) -> Result<Vec<Record>> {
		let mut groups: BTreeMap<String, GroupAggregate> = BTreeMap::new();
		for result in results {
			let ShardResult::Grouped(partials) = result else { continue };
			for partial in partials {
				groups
					.entry(partial.key.to_string())
					.and_modify(|existing| existing.merge(&partial))
					.or_insert(partial);
			}
		}

		let mut rows: Vec<Record> = groups
			.into_values()
			.map(|group| {
				let mut record = Record::new(0, group.finalize(aggregator));
				record.dimensions.insert(group_by.to_string(), group.key.clone());
				record
			})
			.collect();

		if let Some(sort) = &statement.order {
			rows.sort_by(|a, b| {
				let ord = numeric(&a.value).partial_cmp(&numeric(&b.value)).unwrap_or(std::cmp::Ordering::Equal);
				if sort.descending { ord.reverse() } else { ord }
			});
		}
		let limit = statement.limit.unwrap_or(usize::MAX);
		rows.truncate(limit);
		Ok(rows)
	}
}

enum ShardResult {
	Rows(Vec<Record>),
	Grouped(Vec<GroupAggregate>),
}

fn projection_of(statement: &SelectStatement) -> Projection {
	match &statement.fields {
		Fields::All => Projection::All,
		Fields::List(fields) => Projection::Fields(fields.iter().map(|f| f.name.clone()).collect()),
	}
}

fn sort_of(statement: &SelectStatement) -> Option<Sort> {
	statement.order.as_ref().map(|o| Sort { field: o.field.clone(), descending: o.descending })
}

fn sort_key(record: &Record, field: &str) -> f64 {
	if field == "timestamp" {
		return record.timestamp as f64;
	}
	if field == "value" {
		return numeric(&record.value);
	}
	record.dimensions.get(field).or_else(|| record.tags.get(field)).map(numeric).unwrap_or(0.0)
}

fn numeric(value: &Scalar) -> f64 {
	match value {
		Scalar::I64(v) => *v as f64,
		Scalar::F64(v) | Scalar::Decimal(v) => *v,
		Scalar::Str(_) => 0.0,
	}
}

/// spec.md §4.6 step 3: reduces a condition to one coarse `[lo, hi]`
/// time-range envelope, used by the write coordinator's
/// `ExecuteDeleteStatement` (spec.md §4.5) where a single range suffices.
/// The read coordinator uses the finer-grained [`extract_ranges`]
/// instead, since `NOT` on a timestamp comparison can split the range
/// into a non-contiguous pair (spec.md §4.6 step 3).
pub fn extract_range(condition: &Condition) -> (i64, i64) {
	let ranges = extract_ranges(condition);
	let lo = ranges.iter().map(|(lo, _)| *lo).min().unwrap_or(i64::MIN);
	let hi = ranges.iter().map(|(_, hi)| *hi).max().unwrap_or(i64::MAX);
	(lo, hi)
}

/// Reduces `condition` to a set of disjoint-or-overlapping `[lo, hi]`
/// ranges that are a conservative superset of every timestamp the
/// condition can match — narrower is better (fewer shards fanned out
/// to), but never narrower than the truth, since the exact residual
/// predicate (spec.md §4.3's "Predicate translation") is still applied
/// inside each shard. `NOT` on a single-range inner condition is
/// inverted exactly, which may yield two ranges (spec.md §4.6 step 3
/// "may yield a non-contiguous pair handled as a disjunction"); `NOT`
/// on anything less simple conservatively falls back to the full range.
pub fn extract_ranges(condition: &Condition) -> Vec<(i64, i64)> {
	match condition {
		Condition::Cmp(field, op, value) if field == "timestamp" => {
			let Some(ts) = value.as_i64() else { return vec![(i64::MIN, i64::MAX)] };
			vec![match op {
				Op::Eq => (ts, ts),
				Op::Gt => (ts.saturating_add(1), i64::MAX),
				Op::Gte => (ts, i64::MAX),
				Op::Lt => (i64::MIN, ts.saturating_sub(1)),
				Op::Lte => (i64::MIN, ts),
				Op::Ne => (i64::MIN, i64::MAX),
			}]
		}
		Condition::Cmp(..) => vec![(i64::MIN, i64::MAX)],
		Condition::And(parts) => {
			let mut acc = vec![(i64::MIN, i64::MAX)];
			for part in parts {
				let next = extract_ranges(part);
				acc = intersect_ranges(&acc, &next);
				if acc.is_empty() {
					break;
				}
			}
			acc
		}
		Condition::Or(parts) => parts.iter().flat_map(extract_ranges).collect(),
		Condition::Not(inner) => {
			let inner_ranges = extract_ranges(inner);
			match inner_ranges.as_slice() {
				[(lo, hi)] if *lo != i64::MIN || *hi != i64::MAX => {
					let mut complement = Vec::new();
					if *lo > i64::MIN {
						complement.push((i64::MIN, lo.saturating_sub(1)));
					}
					if *hi < i64::MAX {
						complement.push((hi.saturating_add(1), i64::MAX));
					}
					if complement.is_empty() { vec![(i64::MIN, i64::MAX)] } else { complement }
				}
				_ => vec![(i64::MIN, i64::MAX)],
			}
		}
	}
}

fn intersect_ranges(a: &[(i64, i64)], b: &[(i64, i64)]) -> Vec<(i64, i64)> {
	let mut out = Vec::new();
	for (a_lo, a_hi) in a {
		for (b_lo, b_hi) in b {
			let lo = (*a_lo).max(*b_lo);
			let hi = (*a_hi).min(*b_hi);
			if lo <= hi {
				out.push((lo, hi));
			}
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ast::{Aggregation, Field, OrderBy};
	use nsdb_cluster::StaticClusterView;
	use nsdb_type::{DataType, FieldClass, Schema, SchemaField};

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

	async fn fixture() -> (tempfile::TempDir, crate::write::WriteCoordinator, ReadCoordinator) {
		let dir = tempfile::tempdir().unwrap();
		let cluster: Arc<dyn ClusterView> = Arc::new(StaticClusterView::single_node("node-a"));
		let schema = Arc::new(SchemaRegistry::open(dir.path()).unwrap());
		let metadata = Arc::new(MetadataStore::open(dir.path(), cluster.clone(), 1_000_000).unwrap());
		let shards = Arc::new(ShardCache::new(dir.path()));
		let writer = crate::write::WriteCoordinator::new(
			"ns",
			cluster.clone(),
			schema.clone(),
			metadata.clone(),
			shards.clone(),
			None,
			None,
		);
		let reader = ReadCoordinator::new("ns", cluster, schema, metadata, shards, None);

		let names = ["John", "John", "Bill", "Frank", "Frank"];
		for (i, ts) in [2, 4, 6, 8, 10].into_iter().enumerate() {
			let record = Record::new(ts, 1i64).with_dimension("name", names[i]).with_tag("surname", "Doe");
			writer.map_input("people", record).await.unwrap();
		}
		(dir, writer, reader)
	}

	fn select(metric: &str) -> SelectStatement {
		SelectStatement {
			namespace: "ns".into(),
			metric: metric.into(),
			fields: Fields::All,
			condition: None,
			group_by: None,
			order: None,
			limit: None,
		}
	}

	#[tokio::test]
	async fn select_star_limit_five_returns_every_row() {
		let (_dir, _writer, reader) = fixture().await;
		let statement = SelectStatement { limit: Some(5), ..select("people") };
		let rows = reader.execute_statement(&statement, Deadline::after(std::time::Duration::from_secs(5))).await.unwrap();
		assert_eq!(rows.len(), 5);
	}

	#[tokio::test]
	async fn range_condition_narrows_to_two_rows() {
		let (_dir, _writer, reader) = fixture().await;
		let statement = SelectStatement {
			fields: Fields::List(vec![Field::plain("name")]),
			condition: Some(Condition::And(vec![
				Condition::Cmp("timestamp".into(), Op::Gte, Scalar::I64(2)),
				Condition::Cmp("timestamp".into(), Op::Lte, Scalar::I64(4)),
			])),
			limit: Some(5),
			..select("people")
		};
		let rows = reader.execute_statement(&statement, Deadline::after(std::time::Duration::from_secs(5))).await.unwrap();
		assert_eq!(rows.len(), 2);
	}

	#[tokio::test]
	async fn gte_ten_returns_the_single_trailing_row() {
		let (_dir, _writer, reader) = fixture().await;
		let statement = SelectStatement {
			fields: Fields::List(vec![Field::plain("name")]),
			condition: Some(Condition::Cmp("timestamp".into(), Op::Gte, Scalar::I64(10))),
			limit: Some(4),
			..select("people")
		};
		let rows = reader.execute_statement(&statement, Deadline::after(std::time::Duration::from_secs(5))).await.unwrap();
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0].timestamp, 10);
		assert_eq!(rows[0].dimensions.get("name"), Some(&Scalar::Str("Frank".into())));
	}

	#[tokio::test]
	async fn not_gte_ten_returns_the_four_leading_rows() {
		let (_dir, _writer, reader) = fixture().await;
		let statement = SelectStatement {
			fields: Fields::List(vec![Field::plain("name")]),
			condition: Some(Condition::Not(Box::new(Condition::Cmp("timestamp".into(), Op::Gte, Scalar::I64(10))))),
			limit: Some(4),
			..select("people")
		};
		let rows = reader.execute_statement(&statement, Deadline::after(std::time::Duration::from_secs(5))).await.unwrap();
		assert_eq!(rows.len(), 4);
	}

	#[tokio::test]
	async fn grouped_sum_produces_three_groups() {
		let (_dir, _writer, reader) = fixture().await;
		let statement = SelectStatement {
			fields: Fields::List(vec![Field::aggregated("value", Aggregation::Sum)]),
			condition: Some(Condition::Cmp("timestamp".into(), Op::Gte, Scalar::I64(2))),
			group_by: Some("name".into()),
			..select("people")
		};
		let rows = reader.execute_statement(&statement, Deadline::after(std::time::Duration::from_secs(5))).await.unwrap();
		assert_eq!(rows.len(), 3);
		let john = rows.iter().find(|r| r.dimensions.get("name") == Some(&Scalar::Str("John".into()))).unwrap();
		assert_eq!(john.value, Scalar::Decimal(2.0));
		let bill = rows.iter().find(|r| r.dimensions.get("name") == Some(&Scalar::Str("Bill".into()))).unwrap();
		assert_eq!(bill.value, Scalar::Decimal(1.0));
	}

	#[tokio::test]
	async fn group_by_without_aggregation_is_rejected() {
		let (_dir, _writer, reader) = fixture().await;
		let statement = SelectStatement {
			fields: Fields::List(vec![Field::plain("surname")]),
			condition: Some(Condition::Cmp("timestamp".into(), Op::Gte, Scalar::I64(2))),
			group_by: Some("name".into()),
			..select("people")
		};
		let err = reader.execute_statement(&statement, Deadline::after(std::time::Duration::from_secs(5))).await.unwrap_err();
		assert!(matches!(err, Error::InvalidStatement(_)));
	}

	#[tokio::test]
	async fn unknown_metric_fails_with_metric_not_found() {
		let (_dir, _writer, reader) = fixture().await;
		let err = reader
			.execute_statement(&select("nonexisting"), Deadline::after(std::time::Duration::from_secs(5)))
			.await
			.unwrap_err();
		assert!(matches!(err, Error::MetricNotFound(_)));
	}

	#[tokio::test]
	async fn limit_zero_returns_no_rows() {
		let (_dir, _writer, reader) = fixture().await;
		let statement = SelectStatement { limit: Some(0), ..select("people") };
		let rows = reader.execute_statement(&statement, Deadline::after(std::time::Duration::from_secs(5))).await.unwrap();
		assert!(rows.is_empty());
	}

	#[test]
	fn order_by_descending_is_applied_after_extraction() {
		let order = OrderBy { field: "timestamp".into(), descending: true };
		assert!(order.descending);
	}

	#[test]
	fn extract_ranges_inverts_a_single_comparison() {
		let condition = Condition::Not(Box::new(Condition::Cmp("timestamp".into(), Op::Gte, Scalar::I64(10))));
		assert_eq!(extract_ranges(&condition), vec![(i64::MIN, 9)]);
	}
}
