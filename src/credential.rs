//! Bearer-token lifecycle for the Drive pipeline.
//!
//! [`CredentialManager`] is an explicit state machine
//! (`Uninitialized → Requesting → {Ready | Error}`, `Ready → RefreshNeeded → Requesting`)
//! that delegates every token request to an [`IdentityProvider`]. Each request is awaited
//! under a timeout, and every transition is delivered to the registered
//! [`CredentialListener`]s. Errors never poison the manager: the next
//! [`CredentialManager::ensure_ready`] call requests a new token.

pub mod listener;
pub mod provider;

pub use listener::*;
pub use provider::*;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TokenSecret},
	error::CredentialError,
	obs::{self, Stage, StageOutcome, StageSpan},
};

/// Lifecycle states of the bearer credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialState {
	/// No token has been requested yet.
	Uninitialized,
	/// A token request is in flight.
	Requesting,
	/// A usable token is held.
	Ready,
	/// The held token is inside the pre-refresh margin or was rejected by the store.
	RefreshNeeded,
	/// The last request failed; the next readiness check retries.
	Error,
}
impl CredentialState {
	/// Returns a stable label suitable for span or log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Uninitialized => "uninitialized",
			Self::Requesting => "requesting",
			Self::Ready => "ready",
			Self::RefreshNeeded => "refresh_needed",
			Self::Error => "error",
		}
	}
}
impl Display for CredentialState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Owns the bearer token and drives its lifecycle.
pub struct CredentialManager {
	provider: Arc<dyn IdentityProvider>,
	listeners: Vec<Arc<dyn CredentialListener>>,
	state: CredentialState,
	token: Option<AccessToken>,
	last_error: Option<CredentialError>,
	margin: Duration,
	request_timeout: Duration,
}
impl CredentialManager {
	/// Pre-refresh margin applied when none is configured.
	pub const DEFAULT_MARGIN: Duration = Duration::seconds(60);
	/// Upper bound for a single token request when none is configured.
	pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(30);

	/// Creates a manager in the `Uninitialized` state.
	pub fn new<P>(provider: Arc<P>) -> Self
	where
		P: IdentityProvider,
	{
		Self {
			provider,
			listeners: Vec::new(),
			state: CredentialState::Uninitialized,
			token: None,
			last_error: None,
			margin: Self::DEFAULT_MARGIN,
			request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
		}
	}

	/// Overrides the pre-refresh margin; negative values are clamped to zero.
	pub fn with_margin(mut self, margin: Duration) -> Self {
		self.margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Overrides the token request timeout.
	pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Registers a listener that observes every transition.
	pub fn with_listener(mut self, listener: Arc<dyn CredentialListener>) -> Self {
		self.listeners.push(listener);

		self
	}

	/// Current lifecycle state.
	pub fn state(&self) -> CredentialState {
		self.state
	}

	/// Cause of the most recent `Error` transition, cleared once a token is obtained.
	pub fn last_error(&self) -> Option<&CredentialError> {
		self.last_error.as_ref()
	}

	/// Expiry of the held token.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.token.as_ref().map(|token| token.expires_at)
	}

	/// Pre-refresh margin in effect.
	pub fn margin(&self) -> Duration {
		self.margin
	}

	/// Returns the bearer token; fails with [`CredentialError::NotReady`] outside `Ready`.
	pub fn access_token(&self) -> Result<&TokenSecret, CredentialError> {
		match (self.state, &self.token) {
			(CredentialState::Ready, Some(token)) => Ok(&token.secret),
			_ => Err(CredentialError::NotReady),
		}
	}

	/// Returns `true` when `expiry - margin <= now`, or when no token is held.
	pub fn is_expiring_soon(&self) -> bool {
		self.is_expiring_soon_at(OffsetDateTime::now_utc())
	}

	/// Instant-parameterized variant of [`is_expiring_soon`](Self::is_expiring_soon).
	pub fn is_expiring_soon_at(&self, now: OffsetDateTime) -> bool {
		self.token.as_ref().is_none_or(|token| token.expires_within(self.margin, now))
	}

	/// Drives the state machine until it settles in `Ready` or `Error`.
	pub async fn ensure_ready(&mut self) -> Result<(), CredentialError> {
		self.ensure_ready_at(OffsetDateTime::now_utc()).await
	}

	/// Instant-parameterized variant of [`ensure_ready`](Self::ensure_ready).
	pub async fn ensure_ready_at(&mut self, now: OffsetDateTime) -> Result<(), CredentialError> {
		if self.state == CredentialState::Ready && self.is_expiring_soon_at(now) {
			self.transition(CredentialState::RefreshNeeded, None);
		}
		if self.state == CredentialState::Ready {
			return Ok(());
		}

		const STAGE: Stage = Stage::Credential;

		let span = StageSpan::new(STAGE, "ensure_ready");

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);
		self.transition(CredentialState::Requesting, None);

		let provider = self.provider.clone();
		let window = self.request_timeout;
		let result = span
			.instrument(async move {
				match tokio::time::timeout(window.unsigned_abs(), provider.request_token(now)).await
				{
					Ok(result) => result,
					Err(_) => Err(CredentialError::Timeout { seconds: window.whole_seconds() }),
				}
			})
			.await;

		match result {
			Ok(token) => {
				if token.expires_within(self.margin, now) {
					tracing::warn!(
						expires_at = %token.expires_at,
						"Token lifetime is shorter than the pre-refresh margin."
					);
				}

				self.token = Some(token);
				self.last_error = None;
				self.transition(CredentialState::Ready, None);
				obs::record_stage_outcome(STAGE, StageOutcome::Success);

				Ok(())
			},
			Err(e) => {
				self.token = None;
				self.last_error = Some(e.clone());
				self.transition(CredentialState::Error, Some(&e));
				obs::record_stage_outcome(STAGE, StageOutcome::Failure);

				Err(e)
			},
		}
	}

	/// Drops the held token after the store rejected it so the next readiness check mints a
	/// new one.
	pub fn invalidate(&mut self) {
		if self.state == CredentialState::Ready {
			self.token = None;
			self.transition(CredentialState::RefreshNeeded, None);
		}
	}

	fn transition(&mut self, to: CredentialState, cause: Option<&CredentialError>) {
		let from = self.state;

		self.state = to;

		let event = CredentialTransition { from, to, cause, expires_at: self.expires_at() };

		for listener in &self.listeners {
			listener.on_transition(&event);
		}
	}
}
impl Debug for CredentialManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialManager")
			.field("state", &self.state)
			.field("token", &self.token)
			.field("last_error", &self.last_error)
			.field("margin", &self.margin)
			.field("request_timeout", &self.request_timeout)
			.field("listeners", &self.listeners.len())
			.finish()
	}
}
