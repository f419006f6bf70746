// self
use crate::obs::{Stage, StageOutcome};

/// Records a stage outcome via the global metrics recorder (when enabled).
pub fn record_stage_outcome(stage: Stage, outcome: StageOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"drive_frame_stage_total",
			"stage" => stage.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (stage, outcome);
	}
}

/// Records the size of a completed download and the catalog it was drawn from.
pub fn record_image_fetched(bytes: usize, catalog_len: usize) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!("drive_frame_image_bytes").record(bytes as f64);
		metrics::gauge!("drive_frame_catalog_entries").set(catalog_len as f64);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (bytes, catalog_len);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_without_an_installed_recorder_is_a_noop() {
		record_stage_outcome(Stage::Fetch, StageOutcome::Failure);
		record_image_fetched(2_048, 3);
	}
}
