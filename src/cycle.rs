//! The display cycle: credential check, catalog sync, selection, fetch, render, sleep.
//!
//! [`DisplayCycle`] owns every piece of mutable pipeline state (credential, catalog, sink)
//! and runs one iteration at a time on the caller's task. Any failure abandons the
//! iteration and goes straight to `Sleeping`; the fixed interval is the only backoff.

pub mod metrics;
pub mod sink;

pub use metrics::*;
pub use sink::*;

// self
use crate::{
	_prelude::*,
	catalog::{self, Catalog, CatalogSync, RandomSelection, SelectionSource},
	credential::CredentialManager,
	fetch::{FetchedImage, Fetcher},
	http::HttpTransport,
	obs::{self, Stage, StageOutcome, StageSpan},
	provider::DriveEndpoints,
};

/// States visited by one iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CycleState {
	/// Nothing has run yet.
	Idle,
	/// Ensuring the bearer token is usable.
	CheckingCredential,
	/// Listing the folder.
	SyncingCatalog,
	/// Picking an entry.
	Selecting,
	/// Downloading the picked entry.
	Fetching,
	/// Handing bytes to the sink.
	Rendering,
	/// Waiting for the next iteration.
	Sleeping,
}
impl CycleState {
	/// Returns a stable label suitable for span or log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Idle => "idle",
			Self::CheckingCredential => "checking_credential",
			Self::SyncingCatalog => "syncing_catalog",
			Self::Selecting => "selecting",
			Self::Fetching => "fetching",
			Self::Rendering => "rendering",
			Self::Sleeping => "sleeping",
		}
	}
}
impl Display for CycleState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How an iteration ended.
#[derive(Debug)]
pub enum CycleOutcome {
	/// An image reached the sink and its buffer was released.
	Rendered {
		/// Rendered file identifier.
		file_id: String,
		/// Display name from the catalog.
		name: String,
		/// Bytes handed to the sink.
		bytes: usize,
		/// Bytes released after rendering.
		released: usize,
		/// Failure the sink reported; the flow continues regardless.
		render_error: Option<SinkError>,
	},
	/// The iteration was abandoned.
	Skipped {
		/// Stage that failed.
		stage: Stage,
		/// Failure cause.
		error: Error,
	},
}
impl CycleOutcome {
	/// Returns `true` when an image reached the sink.
	pub fn is_rendered(&self) -> bool {
		matches!(self, Self::Rendered { .. })
	}
}

/// Result of [`DisplayCycle::run_once`].
#[derive(Debug)]
pub struct CycleReport {
	/// States entered, in order; always ends with [`CycleState::Sleeping`].
	pub states: Vec<CycleState>,
	/// How the iteration ended.
	pub outcome: CycleOutcome,
}

/// Orchestrates the pipeline against one folder and one sink.
pub struct DisplayCycle<T, S, R = RandomSelection>
where
	T: HttpTransport,
	S: RenderSink,
	R: SelectionSource,
{
	transport: T,
	endpoints: DriveEndpoints,
	credentials: CredentialManager,
	catalog: CatalogSync,
	selector: R,
	fetcher: Fetcher,
	sink: S,
	interval: Duration,
	serve_stale_catalog: bool,
	state: CycleState,
	metrics: Arc<CycleMetrics>,
}
impl<T, S> DisplayCycle<T, S>
where
	T: HttpTransport,
	S: RenderSink,
{
	/// Iteration period when none is configured.
	pub const DEFAULT_INTERVAL: Duration = Duration::seconds(120);

	/// Creates a cycle with an OS-seeded selector, default fetch limits, and a 120 second
	/// interval.
	pub fn new(
		transport: T,
		endpoints: DriveEndpoints,
		credentials: CredentialManager,
		catalog: CatalogSync,
		sink: S,
	) -> Self {
		Self {
			transport,
			endpoints,
			credentials,
			catalog,
			selector: RandomSelection::from_os_rng(),
			fetcher: Fetcher::default(),
			sink,
			interval: Self::DEFAULT_INTERVAL,
			serve_stale_catalog: false,
			state: CycleState::Idle,
			metrics: Default::default(),
		}
	}
}
impl<T, S, R> DisplayCycle<T, S, R>
where
	T: HttpTransport,
	S: RenderSink,
	R: SelectionSource,
{
	/// Replaces the selection source.
	pub fn with_selector<R2>(self, selector: R2) -> DisplayCycle<T, S, R2>
	where
		R2: SelectionSource,
	{
		DisplayCycle {
			transport: self.transport,
			endpoints: self.endpoints,
			credentials: self.credentials,
			catalog: self.catalog,
			selector,
			fetcher: self.fetcher,
			sink: self.sink,
			interval: self.interval,
			serve_stale_catalog: self.serve_stale_catalog,
			state: self.state,
			metrics: self.metrics,
		}
	}

	/// Replaces the fetcher.
	pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
		self.fetcher = fetcher;

		self
	}

	/// Overrides the sleep between iterations.
	pub fn with_interval(mut self, interval: Duration) -> Self {
		self.interval = interval;

		self
	}

	/// Continues with the previous catalog when a sync fails and that catalog is non-empty.
	pub fn serve_stale_catalog(mut self, enabled: bool) -> Self {
		self.serve_stale_catalog = enabled;

		self
	}

	/// Shares a metrics recorder.
	pub fn with_metrics(mut self, metrics: Arc<CycleMetrics>) -> Self {
		self.metrics = metrics;

		self
	}

	/// Current state.
	pub fn state(&self) -> CycleState {
		self.state
	}

	/// Sleep between iterations.
	pub fn interval(&self) -> Duration {
		self.interval
	}

	/// Credential manager.
	pub fn credentials(&self) -> &CredentialManager {
		&self.credentials
	}

	/// Catalog from the last successful sync.
	pub fn catalog(&self) -> &Catalog {
		self.catalog.catalog()
	}

	/// Render sink.
	pub fn sink(&self) -> &S {
		&self.sink
	}

	/// Cycle counters.
	pub fn metrics(&self) -> &Arc<CycleMetrics> {
		&self.metrics
	}

	/// Runs forever: one iteration, then the fixed sleep.
	pub async fn run(&mut self) {
		loop {
			let report = self.run_once().await;

			tracing::debug!(
				rendered = report.outcome.is_rendered(),
				sleep_seconds = self.interval.whole_seconds(),
				"Cycle finished."
			);

			tokio::time::sleep(self.interval.unsigned_abs()).await;
		}
	}

	/// Runs one iteration and leaves the cycle in `Sleeping`.
	pub async fn run_once(&mut self) -> CycleReport {
		let mut states = Vec::with_capacity(7);

		self.metrics.record_attempt();
		self.enter(CycleState::CheckingCredential, &mut states);

		let outcome = match self.iterate(&mut states).await {
			Ok(outcome) => {
				self.metrics.record_rendered();

				outcome
			},
			Err((stage, error)) => {
				tracing::warn!(stage = stage.as_str(), error = %error, "Cycle skipped.");

				if error.is_unauthorized() {
					self.credentials.invalidate();
				}

				self.metrics.record_skipped();

				CycleOutcome::Skipped { stage, error }
			},
		};

		self.enter(CycleState::Sleeping, &mut states);

		CycleReport { states, outcome }
	}

	async fn iterate(
		&mut self,
		states: &mut Vec<CycleState>,
	) -> Result<CycleOutcome, (Stage, Error)> {
		self.credentials.ensure_ready().await.map_err(|e| (Stage::Credential, e.into()))?;
		self.enter(CycleState::SyncingCatalog, states);

		let synced = self
			.catalog
			.sync(&self.transport, &self.endpoints, &self.credentials)
			.await
			.map(|_| ());

		if let Err(e) = synced {
			if e.is_unauthorized()
				|| !self.serve_stale_catalog
				|| self.catalog.catalog().is_empty()
			{
				return Err((Stage::Catalog, e));
			}

			tracing::warn!(
				error = %e,
				entries = self.catalog.catalog().len(),
				"Catalog sync failed; serving the stale catalog."
			);
		}

		self.enter(CycleState::Selecting, states);

		let entry = {
			let _span = StageSpan::new(Stage::Select, "select").entered();

			catalog::select(self.catalog.catalog(), &mut self.selector)
				.map_err(|e| (Stage::Select, e))?
		};

		tracing::info!(file_id = %entry.id, name = %entry.name, "Image selected.");
		self.enter(CycleState::Fetching, states);

		let image = self
			.fetcher
			.fetch(&self.transport, &self.endpoints, &self.credentials, &entry.id)
			.await
			.map_err(|e| (Stage::Fetch, e.into_error()))?;

		obs::record_image_fetched(image.len(), self.catalog.catalog().len());
		self.enter(CycleState::Rendering, states);

		let bytes = image.len();
		let render_error = self.render(&image);
		let released = image.buffer.release();

		Ok(CycleOutcome::Rendered {
			file_id: entry.id,
			name: entry.name,
			bytes,
			released,
			render_error,
		})
	}

	fn render(&mut self, image: &FetchedImage) -> Option<SinkError> {
		const STAGE: Stage = Stage::Render;

		let _span = StageSpan::new(STAGE, "render").entered();

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		match self.sink.render(image.buffer.as_bytes()) {
			Ok(()) => {
				obs::record_stage_outcome(STAGE, StageOutcome::Success);
				tracing::info!(file_id = %image.file_id, bytes = image.len(), "Image rendered.");

				None
			},
			Err(e) => {
				obs::record_stage_outcome(STAGE, StageOutcome::Failure);
				self.metrics.record_render_failure();
				tracing::warn!(file_id = %image.file_id, error = %e, "Render sink failed.");

				Some(e)
			},
		}
	}

	fn enter(&mut self, state: CycleState, states: &mut Vec<CycleState>) {
		tracing::debug!(from = self.state.as_str(), to = state.as_str(), "Cycle state changed.");

		self.state = state;

		states.push(state);
	}
}
impl<T, S, R> Debug for DisplayCycle<T, S, R>
where
	T: HttpTransport,
	S: RenderSink,
	R: SelectionSource,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DisplayCycle")
			.field("state", &self.state)
			.field("container_id", &self.catalog.container_id())
			.field("credentials", &self.credentials)
			.field("catalog_entries", &self.catalog.catalog().len())
			.field("interval", &self.interval)
			.field("serve_stale_catalog", &self.serve_stale_catalog)
			.finish()
	}
}
