// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

fn main() -> Result<(), Box<dyn std::error::Error>> {
	tonic_build::configure().compile_protos(&["proto/nsdb.proto"], &["proto"])?;
	Ok(())
}
