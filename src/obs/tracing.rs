// crates.io
use tracing::instrument::Instrumented;
// self
use crate::{_prelude::*, obs::Stage};

/// Span wrapper used by pipeline stages.
#[derive(Clone, Debug)]
pub struct StageSpan {
	span: tracing::Span,
}
impl StageSpan {
	/// Creates a new span tagged with the provided stage + step.
	pub fn new(stage: Stage, step: &'static str) -> Self {
		Self { span: tracing::info_span!("drive_frame.stage", stage = stage.as_str(), step) }
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> tracing::span::EnteredSpan {
		self.span.entered()
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		tracing::Instrument::instrument(fut, self.span.clone())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn entered_guard_is_usable_without_subscriber() {
		let _guard = StageSpan::new(Stage::Select, "pick").entered();
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = StageSpan::new(Stage::Fetch, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[tokio::test]
	async fn instrument_reuses_the_span_for_each_future() {
		let span = StageSpan::new(Stage::Render, "reuse");
		let first = StageSpan::instrument(&span, async { 1 }).await;
		let second = span.instrument(async { 2 }).await;

		assert_eq!(first + second, 3);
	}
}
