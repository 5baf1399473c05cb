// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

pub mod incompatible;
pub mod registry;
pub mod store;

pub use incompatible::{FieldConflict, Incompatible};
pub use registry::SchemaRegistry;
pub use store::SchemaStore;
