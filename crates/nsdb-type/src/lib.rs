// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

pub mod data_type;
pub mod index_field;
pub mod record;
pub mod scalar;
pub mod schema;
pub mod violation;

pub use data_type::DataType;
pub use index_field::IndexField;
pub use record::Record;
pub use scalar::Scalar;
pub use schema::{FieldClass, Schema, SchemaField};
pub use violation::SchemaViolation;
