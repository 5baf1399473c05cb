// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use std::time::{Duration, Instant};

/// A statement's execution deadline (spec §4.6 "Cancellation", §5 "Timeouts").
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
	at: Instant,
}

impl Deadline {
	pub fn after(timeout: Duration) -> Self {
		Self { at: Instant::now() + timeout }
	}

	pub fn remaining(&self) -> Duration {
		self.at.saturating_duration_since(Instant::now())
	}

	pub fn has_elapsed(&self) -> bool {
		Instant::now() >= self.at
	}
}
