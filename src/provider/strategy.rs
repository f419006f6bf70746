//! Classification of token endpoint failures.
//!
//! Strategies look only at crate-owned data (status code, OAuth error fields, body preview)
//! so they stay independent of the HTTP stack that carried the exchange.

// self
use crate::{_prelude::*, error::CredentialError};

/// Hook that turns a failed token exchange into a [`CredentialError`].
pub trait TokenErrorStrategy
where
	Self: Send + Sync,
{
	/// Classifies the failure described by `ctx`.
	fn classify(&self, ctx: &TokenErrorContext) -> TokenErrorKind;

	/// Builds the credential error reported to listeners.
	///
	/// The default implementation prefers the provider's description over its error code,
	/// then the body preview, then the bare status.
	fn to_error(&self, ctx: &TokenErrorContext) -> CredentialError {
		let reason = ctx.reason();

		match self.classify(ctx) {
			TokenErrorKind::Rejected => CredentialError::Rejected { reason },
			TokenErrorKind::Transient =>
				CredentialError::Transient { reason, status: ctx.http_status },
		}
	}
}

/// Failure categories a strategy can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenErrorKind {
	/// The provider refused the assertion, the account, or the scopes; retrying with the
	/// same material will keep failing.
	Rejected,
	/// The provider failed in a way that may clear on the next cycle.
	Transient,
}

/// Facts gathered from a failed token response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenErrorContext {
	/// HTTP status code returned by the provider.
	pub http_status: Option<u16>,
	/// Provider-supplied OAuth `error` field.
	pub oauth_error: Option<String>,
	/// Provider-supplied OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Preview of the response body for non-JSON payloads.
	pub body_preview: Option<String>,
}
impl TokenErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a context for a response with `status`.
	pub fn new(status: u16) -> Self {
		Self { http_status: Some(status), ..Default::default() }
	}

	/// Adds the OAuth error code string returned by the provider.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a body preview for responses that are not OAuth error documents.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}

	fn reason(&self) -> String {
		match (&self.oauth_error, &self.error_description) {
			(Some(code), Some(description)) => format!("{code}: {description}"),
			(Some(code), None) => code.clone(),
			(None, Some(description)) => description.clone(),
			(None, None) => match (&self.body_preview, self.http_status) {
				(Some(body), _) if !body.trim().is_empty() => body.trim().to_owned(),
				(_, Some(status)) => format!("HTTP {status}"),
				_ => "unknown failure".into(),
			},
		}
	}
}

/// Strategy tuned for Google's token endpoint.
///
/// Structured OAuth fields win, then body hints, then the HTTP status.
#[derive(Debug, Default)]
pub struct DefaultTokenErrorStrategy;
impl Display for DefaultTokenErrorStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-token-error-strategy")
	}
}
impl TokenErrorStrategy for DefaultTokenErrorStrategy {
	fn classify(&self, ctx: &TokenErrorContext) -> TokenErrorKind {
		ctx.oauth_error
			.as_deref()
			.and_then(match_exact_value)
			.or_else(|| classify_body(ctx.error_description.as_deref()))
			.or_else(|| classify_body(ctx.body_preview.as_deref()))
			.unwrap_or_else(|| classify_status(ctx.http_status))
	}
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= TokenErrorContext::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf: String = body.chars().take(TokenErrorContext::BODY_PREVIEW_LIMIT).collect();

	buf.push('…');

	buf
}

fn match_exact_value(value: &str) -> Option<TokenErrorKind> {
	const REJECTED: &[&str] = &[
		"invalid_grant",
		"invalid_client",
		"unauthorized_client",
		"invalid_scope",
		"access_denied",
		"invalid_request",
		"unsupported_grant_type",
	];
	const TRANSIENT: &[&str] = &["temporarily_unavailable", "server_error", "rate_limit_exceeded"];

	if REJECTED.iter().any(|code| value.eq_ignore_ascii_case(code)) {
		Some(TokenErrorKind::Rejected)
	} else if TRANSIENT.iter().any(|code| value.eq_ignore_ascii_case(code)) {
		Some(TokenErrorKind::Transient)
	} else {
		None
	}
}

fn classify_body(body: Option<&str>) -> Option<TokenErrorKind> {
	let lowered = body?.to_ascii_lowercase();

	match lowered.as_str() {
		text if text.contains("invalid_grant")
			|| text.contains("invalid jwt")
			|| text.contains("invalid_client") =>
			Some(TokenErrorKind::Rejected),
		text if text.contains("temporarily_unavailable") || text.contains("retry") =>
			Some(TokenErrorKind::Transient),
		_ => None,
	}
}

fn classify_status(status: Option<u16>) -> TokenErrorKind {
	match status {
		Some(429) => TokenErrorKind::Transient,
		Some(code) if code >= 500 => TokenErrorKind::Transient,
		Some(400..=499) => TokenErrorKind::Rejected,
		_ => TokenErrorKind::Transient,
	}
}
