// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

pub mod topic;
pub mod view;

pub use topic::Topic;
pub use view::{ClusterView, NodeId, StaticClusterView};
