//! Observers notified on every credential state transition.

// self
use crate::{_prelude::*, credential::CredentialState, error::CredentialError};

/// A single state change reported to listeners.
#[derive(Clone, Copy, Debug)]
pub struct CredentialTransition<'a> {
	/// State before the change.
	pub from: CredentialState,
	/// State after the change.
	pub to: CredentialState,
	/// Failure cause; present only when `to` is [`CredentialState::Error`].
	pub cause: Option<&'a CredentialError>,
	/// Expiry of the token held after the change.
	pub expires_at: Option<OffsetDateTime>,
}

/// Receives credential transitions. Implementations run inline on the cycle loop and must
/// not block.
pub trait CredentialListener
where
	Self: Send + Sync,
{
	/// Called after the manager has switched to `event.to`.
	fn on_transition(&self, event: &CredentialTransition<'_>);
}
impl<F> CredentialListener for F
where
	F: Send + Sync + Fn(&CredentialTransition<'_>),
{
	fn on_transition(&self, event: &CredentialTransition<'_>) {
		self(event)
	}
}

/// Listener that reports transitions through `tracing`. It only ever sees the expiry, never
/// the bearer value.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingListener;
impl CredentialListener for TracingListener {
	fn on_transition(&self, event: &CredentialTransition<'_>) {
		match (event.to, event.cause) {
			(CredentialState::Error, Some(cause)) => tracing::warn!(
				from = event.from.as_str(),
				error = %cause,
				"Credential request failed."
			),
			(CredentialState::Ready, _) => tracing::info!(
				from = event.from.as_str(),
				expires_at = ?event.expires_at,
				"Credential is ready."
			),
			(to, _) => tracing::debug!(
				from = event.from.as_str(),
				to = to.as_str(),
				"Credential state changed."
			),
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	#[test]
	fn closures_act_as_listeners() {
		let seen = Arc::new(AtomicUsize::new(0));
		let counter = seen.clone();
		let listener = move |event: &CredentialTransition<'_>| {
			if event.to == CredentialState::Error {
				counter.fetch_add(1, Ordering::Relaxed);
			}
		};
		let cause = CredentialError::Network { message: "connection refused".into() };

		listener.on_transition(&CredentialTransition {
			from: CredentialState::Requesting,
			to: CredentialState::Error,
			cause: Some(&cause),
			expires_at: None,
		});
		TracingListener.on_transition(&CredentialTransition {
			from: CredentialState::Requesting,
			to: CredentialState::Error,
			cause: Some(&cause),
			expires_at: None,
		});

		assert_eq!(seen.load(Ordering::Relaxed), 1);
	}
}
