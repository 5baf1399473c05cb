// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

pub mod config;
pub mod deadline;
pub mod error;
pub mod tracing_init;

pub use config::Config;
pub use deadline::Deadline;
pub use error::{Error, Result};
pub use tracing_init::init_tracing;
