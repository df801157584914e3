// crates.io
use tracing::instrument::Instrumented;
// self
use crate::{_prelude::*, obs::Stage};

/// A span builder used by extraction stages.
#[derive(Clone, Debug)]
pub struct StageSpan {
	span: tracing::Span,
}
impl StageSpan {
	/// Creates a new span tagged with the provided stage.
	pub fn new(stage: Stage) -> Self {
		Self { span: tracing::info_span!("hc_extract.stage", stage = stage.as_str()) }
	}

	/// Creates a span for per-appliance work.
	pub fn for_device(stage: Stage, identifier: &str) -> Self {
		Self {
			span: tracing::info_span!("hc_extract.stage", stage = stage.as_str(), device = identifier),
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		use tracing::Instrument;

		fut.instrument(self.span.clone())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = StageSpan::for_device(Stage::Bundle, "device-1");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[tokio::test]
	async fn stage_spans_are_reusable_across_futures() {
		let span = StageSpan::new(Stage::Directory);
		let first = span.instrument(async { "first" }).await;
		let second = span.instrument(async { "second" }).await;

		assert_eq!((first, second), ("first", "second"));
	}
}
