// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::DataType;

/// A record field value, represented as a native Rust tagged sum rather
/// than a boxed common supertype (spec.md §9 "Dynamic typing of field
/// values"). Every mapping to an index field or a comparison is an
/// explicit per-variant match, never runtime class reflection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
	/// Backs `INT` and `BIGINT` schema fields, and a record's `value`
	/// when it is a whole number.
	I64(i64),
	/// Backs a record's `value` when it is a plain float64 reading.
	F64(f64),
	/// Backs `DECIMAL` schema fields, and a record's `value` when it is
	/// tagged decimal.
	Decimal(f64),
	/// Backs `VARCHAR` schema fields.
	Str(String),
}

impl Scalar {
	/// The `DataType` this value would be validated against.
	pub fn type_tag(&self) -> DataType {
		match self {
			Scalar::I64(_) => DataType::BigInt,
			Scalar::F64(_) | Scalar::Decimal(_) => DataType::Decimal,
			Scalar::Str(_) => DataType::Varchar,
		}
	}

	/// Whether `self` may be validated against a field declared as `expected`.
	/// `INT` and `BIGINT` both accept integer scalars; `DECIMAL` accepts
	/// either float representation.
	pub fn matches(&self, expected: DataType) -> bool {
		match (self, expected) {
			(Scalar::I64(_), DataType::Int | DataType::BigInt) => true,
			(Scalar::F64(_) | Scalar::Decimal(_), DataType::Decimal) => true,
			(Scalar::Str(_), DataType::Varchar) => true,
			_ => false,
		}
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Scalar::I64(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Scalar::F64(v) | Scalar::Decimal(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Scalar::Str(v) => Some(v.as_str()),
			_ => None,
		}
	}
}

impl Display for Scalar {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Scalar::I64(v) => Display::fmt(v, f),
			Scalar::F64(v) => Display::fmt(v, f),
			Scalar::Decimal(v) => Display::fmt(v, f),
			Scalar::Str(v) => Display::fmt(v, f),
		}
	}
}

impl From<i64> for Scalar {
	fn from(v: i64) -> Self {
		Scalar::I64(v)
	}
}

impl From<&str> for Scalar {
	fn from(v: &str) -> Self {
		Scalar::Str(v.to_string())
	}
}

impl From<String> for Scalar {
	fn from(v: String) -> Self {
		Scalar::Str(v)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn int_and_bigint_both_accept_i64_scalars() {
		assert!(Scalar::I64(42).matches(DataType::Int));
		assert!(Scalar::I64(42).matches(DataType::BigInt));
		assert!(!Scalar::I64(42).matches(DataType::Varchar));
	}

	#[test]
	fn float_and_decimal_scalars_both_satisfy_decimal_fields() {
		assert!(Scalar::F64(1.5).matches(DataType::Decimal));
		assert!(Scalar::Decimal(1.5).matches(DataType::Decimal));
	}

	#[test]
	fn type_tag_round_trips_through_matches() {
		for scalar in [Scalar::I64(1), Scalar::F64(1.0), Scalar::Decimal(1.0), Scalar::Str("x".into())] {
			assert!(scalar.matches(scalar.type_tag()));
		}
	}
}
