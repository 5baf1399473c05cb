// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use nsdb_cluster::NodeId;
use xxhash_rust::xxh3::xxh3_64;

/// Deterministic placement (spec.md §4.4 "Placement"): a stable hash of
/// `(metric, bin_index)` selected into the current sorted set of node
/// identifiers, so any node can independently compute the owner without
/// coordination. Implemented as rendezvous (highest-random-weight)
/// hashing — every node computes `hash(metric, bin_index, node)` and the
/// bin is owned by whichever node scores highest; membership changes
/// move only the bins whose winner changed, not the whole ring.
pub fn place(metric: &str, bin_index: i64, members: &[NodeId]) -> Option<NodeId> {
	members
		.iter()
		.max_by_key(|node| {
			let mut buf = Vec::with_capacity(metric.len() + node.len() + 16);
			buf.extend_from_slice(metric.as_bytes());
			buf.extend_from_slice(&bin_index.to_le_bytes());
			buf.extend_from_slice(node.as_bytes());
			xxh3_64(&buf)
		})
		.cloned()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn placement_is_a_pure_function_of_metric_bin_and_membership() {
		let members = vec!["a".to_string(), "b".to_string(), "c".to_string()];
		let first = place("cpu.load", 7, &members);
		let second = place("cpu.load", 7, &members);
		assert_eq!(first, second);
		assert!(first.is_some());
	}

	#[test]
	fn no_members_yields_no_placement() {
		assert_eq!(place("cpu.load", 7, &[]), None);
	}

	#[test]
	fn different_bins_can_land_on_different_nodes() {
		let members = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];
		let placements: std::collections::HashSet<_> =
			(0..20).map(|bin| place("cpu.load", bin, &members)).collect();
		assert!(placements.len() > 1, "expected placement to vary across bins");
	}
}
