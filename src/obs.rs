//! Observability helpers for the display pipeline.
//!
//! Every pipeline stage runs inside a span named `drive_frame.stage` carrying the `stage`
//! and `step` fields. With the `metrics` feature enabled, the `drive_frame_stage_total`
//! counter is incremented for every attempt/success/failure, labeled by `stage` + `outcome`.
//! Completed downloads feed the `drive_frame_image_bytes` histogram and the
//! `drive_frame_catalog_entries` gauge.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline stages observed by the cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Bearer token readiness and refresh.
	Credential,
	/// Folder listing.
	Catalog,
	/// Random pick over the catalog.
	Select,
	/// Media download.
	Fetch,
	/// Hand-off to the render sink.
	Render,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Credential => "credential",
			Stage::Catalog => "catalog",
			Stage::Select => "select",
			Stage::Fetch => "fetch",
			Stage::Render => "render",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageOutcome {
	/// Entry to a stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure that abandons the iteration.
	Failure,
}
impl StageOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageOutcome::Attempt => "attempt",
			StageOutcome::Success => "success",
			StageOutcome::Failure => "failure",
		}
	}
}
impl Display for StageOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
