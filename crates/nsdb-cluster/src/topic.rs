// Copyright (c) nsdb.dev 2025
// This file is licensed under the Apache-2.0

use tokio::sync::broadcast;

/// A cluster-wide pub/sub topic (spec.md §4.4 "Publication"): location
/// creation and metric-info updates are broadcast so every node's local
/// metadata cache converges. Backed by `tokio::sync::broadcast`, which
/// is an in-process stand-in for the cross-node gossip fan-out a real
/// cluster substrate would provide.
pub struct Topic<T: Clone + Send + 'static> {
	sender: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> Topic<T> {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes `event`. Returns the number of active subscribers it
	/// reached; `0` is not an error — nobody is listening yet.
	pub fn publish(&self, event: T) -> usize {
		self.sender.send(event).unwrap_or(0)
	}

	pub fn subscribe(&self) -> broadcast::Receiver<T> {
		self.sender.subscribe()
	}
}

impl<T: Clone + Send + 'static> Default for Topic<T> {
	fn default() -> Self {
		Self::new(1024)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn subscriber_observes_published_event() {
		let topic: Topic<u32> = Topic::default();
		let mut rx = topic.subscribe();
		topic.publish(42);
		assert_eq!(rx.recv().await.unwrap(), 42);
	}
}
