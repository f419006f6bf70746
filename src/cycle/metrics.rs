//! Atomic counters kept across display cycles.

// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for display cycles.
#[derive(Debug, Default)]
pub struct CycleMetrics {
	attempts: AtomicU64,
	rendered: AtomicU64,
	skipped: AtomicU64,
	render_failures: AtomicU64,
}
impl CycleMetrics {
	/// Returns the total number of cycles started.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of cycles that reached the render sink.
	pub fn rendered(&self) -> u64 {
		self.rendered.load(Ordering::Relaxed)
	}

	/// Returns the number of cycles abandoned before rendering.
	pub fn skipped(&self) -> u64 {
		self.skipped.load(Ordering::Relaxed)
	}

	/// Returns the number of render calls the sink reported as failed (also counted in
	/// [`rendered`](Self::rendered)).
	pub fn render_failures(&self) -> u64 {
		self.render_failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rendered(&self) {
		self.rendered.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_skipped(&self) {
		self.skipped.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_render_failure(&self) {
		self.render_failures.fetch_add(1, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn counters_track_each_outcome() {
		let metrics = CycleMetrics::default();

		metrics.record_attempt();
		metrics.record_attempt();
		metrics.record_rendered();
		metrics.record_render_failure();
		metrics.record_skipped();

		assert_eq!(metrics.attempts(), 2);
		assert_eq!(metrics.rendered(), 1);
		assert_eq!(metrics.render_failures(), 1);
		assert_eq!(metrics.skipped(), 1);
	}
}
