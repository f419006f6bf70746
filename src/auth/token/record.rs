//! Issued access-token records and their builder.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Errors produced by [`AccessTokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum AccessTokenBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingSecret,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Issued when the expiry does not come after the issued-at instant.
	#[error("Expiry must be later than the issued-at instant.")]
	NonPositiveLifetime,
}

/// Bearer token minted by the identity provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessToken {
	/// Bearer secret; callers must avoid logging it.
	pub secret: TokenSecret,
	/// Issued-at instant recorded when the response arrived.
	pub issued_at: OffsetDateTime,
	/// Expiry instant derived from issued_at plus `expires_in`.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Returns a builder for constructing tokens.
	pub fn builder() -> AccessTokenBuilder {
		AccessTokenBuilder::default()
	}

	/// Returns `true` once `expires_at - margin <= instant`.
	pub fn expires_within(&self, margin: Duration, instant: OffsetDateTime) -> bool {
		self.expires_at - margin <= instant
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("secret", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`AccessToken`].
#[derive(Clone, Debug, Default)]
pub struct AccessTokenBuilder {
	secret: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl AccessTokenBuilder {
	/// Provides the bearer value.
	pub fn secret(mut self, token: impl Into<String>) -> Self {
		self.secret = Some(TokenSecret::new(token));

		self
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces an [`AccessToken`].
	pub fn build(self) -> Result<AccessToken, AccessTokenBuilderError> {
		let secret = self
			.secret
			.filter(|secret| !secret.is_empty())
			.ok_or(AccessTokenBuilderError::MissingSecret)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at + delta,
			(None, None) => return Err(AccessTokenBuilderError::MissingExpiry),
		};

		if expires_at <= issued_at {
			return Err(AccessTokenBuilderError::NonPositiveLifetime);
		}

		Ok(AccessToken { secret, issued_at, expires_at })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn token() -> AccessToken {
		AccessToken::builder()
			.secret("ya29.access")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Token builder should succeed for a fixed lifetime.")
	}

	#[test]
	fn expires_within_is_inclusive_at_the_margin() {
		let token = token();
		let margin = Duration::seconds(60);

		assert!(!token.expires_within(margin, macros::datetime!(2025-01-01 00:58:59 UTC)));
		assert!(token.expires_within(margin, macros::datetime!(2025-01-01 00:59 UTC)));
	}

	#[test]
	fn builder_handles_relative_expiry() {
		let token = AccessToken::builder()
			.secret("secret")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::seconds(3_599))
			.build()
			.expect("Token builder should support relative expiry calculations.");

		assert_eq!(token.expires_at, macros::datetime!(2025-01-01 00:59:59 UTC));
	}

	#[test]
	fn builder_rejects_empty_and_inverted_tokens() {
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		assert_eq!(
			AccessToken::builder()
				.secret("")
				.issued_at(now)
				.expires_in(Duration::HOUR)
				.build()
				.err(),
			Some(AccessTokenBuilderError::MissingSecret)
		);
		assert_eq!(
			AccessToken::builder().secret("x").issued_at(now).build().err(),
			Some(AccessTokenBuilderError::MissingExpiry)
		);
		assert_eq!(
			AccessToken::builder().secret("x").issued_at(now).expires_at(now).build().err(),
			Some(AccessTokenBuilderError::NonPositiveLifetime)
		);
	}
}
