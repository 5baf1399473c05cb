// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

//! The write and read coordinators (spec.md §4.5, §4.6 — C5/C6), the
//! statement AST spec.md §6 says is externally supplied, and the
//! `RemoteDispatch` boundary the guardian wires up to the RPC transport.

pub mod ast;
pub mod dispatch;
pub mod read;
pub mod shard_cache;
pub mod write;

pub use ast::{parse, Condition, DeleteStatement, DropStatement, Fields, InsertStatement, Op, SelectStatement, Statement};
pub use dispatch::RemoteDispatch;
pub use read::ReadCoordinator;
pub use shard_cache::ShardCache;
pub use write::{InputMapped, WriteCoordinator};
