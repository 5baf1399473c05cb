// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

//! The per-node guardian and RPC endpoint (spec.md §4.7, C7): lifecycle
//! of the schema registry, location metadata, shard cache, commit log
//! and write/read coordinators for every (db, namespace) this node has
//! opened, plumbed into the `tonic`-backed RPC transport of
//! `nsdb-network`.

pub mod guardian;
pub mod namespace;
pub mod serve;

pub use guardian::Guardian;
pub use namespace::NamespaceActor;
pub use serve::serve;
