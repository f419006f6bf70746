//! Identity providers that mint bearer tokens for [`CredentialManager`](super::CredentialManager).

// crates.io
use oauth2::{
	TokenResponse,
	basic::{BasicErrorResponse, BasicTokenResponse, BasicTokenType},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet, ServiceAccountKey},
	error::{CredentialError, ParseError, TransportError},
	http::{self, HttpTransport},
	provider::{DefaultTokenErrorStrategy, TokenErrorContext, TokenErrorStrategy},
};

/// Grant type of the JWT-bearer assertion exchange (RFC 7523).
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Boxed future returned by [`IdentityProvider::request_token`].
pub type ProviderFuture<'a> =
	Pin<Box<dyn Future<Output = Result<AccessToken, CredentialError>> + 'a + Send>>;

/// Source of bearer tokens.
pub trait IdentityProvider
where
	Self: 'static + Send + Sync,
{
	/// Requests a fresh token; `now` is the issued-at instant recorded on the result.
	fn request_token(&self, now: OffsetDateTime) -> ProviderFuture<'_>;
}

/// Service-account provider: signs an RS256 assertion and exchanges it at the token
/// endpoint.
pub struct ServiceAccountProvider<T>
where
	T: HttpTransport,
{
	key: ServiceAccountKey,
	scopes: ScopeSet,
	token_endpoint: Url,
	transport: T,
	strategy: Arc<dyn TokenErrorStrategy>,
	assertion_lifetime: Duration,
	response_limit: usize,
}
impl<T> ServiceAccountProvider<T>
where
	T: HttpTransport,
{
	/// Largest token response body accepted when none is configured.
	pub const DEFAULT_RESPONSE_LIMIT: usize = 16 * 1024;

	/// Creates a provider exchanging assertions for `scopes` at `token_endpoint`.
	pub fn new(
		key: ServiceAccountKey,
		scopes: ScopeSet,
		token_endpoint: Url,
		transport: T,
	) -> Self {
		Self {
			key,
			scopes,
			token_endpoint,
			transport,
			strategy: Arc::new(DefaultTokenErrorStrategy),
			assertion_lifetime: crate::auth::MAX_ASSERTION_LIFETIME,
			response_limit: Self::DEFAULT_RESPONSE_LIMIT,
		}
	}

	/// Service-account e-mail used as the assertion issuer.
	pub fn client_email(&self) -> &str {
		&self.key.client_email
	}

	async fn exchange(&self, now: OffsetDateTime) -> Result<AccessToken, CredentialError> {
		let assertion = self.key.sign_assertion(
			&self.scopes,
			&self.token_endpoint,
			now,
			self.assertion_lifetime,
		)?;
		let request = http::form_post(
			&self.token_endpoint,
			&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)],
		)
		.map_err(|e| CredentialError::MalformedCredential { reason: e.to_string() })?;
		let response = self.transport.execute(request).await.map_err(transport_failure)?;
		let status = response.metadata.status;
		let success = response.metadata.is_success();
		let body = response.read_capped(self.response_limit, "token").await.map_err(|e| match e {
			Error::Transport(e) => transport_failure(e),
			Error::Parse(ParseError::BodyTooLarge { limit, .. }) =>
				CredentialError::MalformedResponse {
					reason: format!("token response exceeds {limit} bytes"),
				},
			e => CredentialError::MalformedResponse { reason: e.to_string() },
		})?;

		if !success {
			return Err(self.strategy.to_error(&error_context(status, &body)));
		}

		decode_token(&body, now)
	}
}
impl<T> IdentityProvider for ServiceAccountProvider<T>
where
	T: HttpTransport,
{
	fn request_token(&self, now: OffsetDateTime) -> ProviderFuture<'_> {
		Box::pin(async move {
			let result = self.exchange(now).await;

			match &result {
				Ok(token) => tracing::debug!(
					client_email = %self.key.client_email,
					expires_at = %token.expires_at,
					"Service-account token issued."
				),
				Err(e) => tracing::debug!(
					client_email = %self.key.client_email,
					error = %e,
					"Service-account token request failed."
				),
			}

			result
		})
	}
}
impl<T> Debug for ServiceAccountProvider<T>
where
	T: HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceAccountProvider")
			.field("key", &self.key)
			.field("scopes", &self.scopes)
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("assertion_lifetime", &self.assertion_lifetime)
			.finish()
	}
}

fn transport_failure(e: TransportError) -> CredentialError {
	match e {
		TransportError::Timeout { seconds } => CredentialError::Timeout { seconds },
		e => CredentialError::Network { message: error_chain(&e) },
	}
}

fn error_chain(e: &dyn StdError) -> String {
	let mut message = e.to_string();
	let mut source = e.source();

	while let Some(inner) = source {
		message.push_str(": ");
		message.push_str(&inner.to_string());

		source = inner.source();
	}

	message
}

fn error_context(status: u16, body: &[u8]) -> TokenErrorContext {
	let ctx = TokenErrorContext::new(status);

	match serde_json::from_slice::<BasicErrorResponse>(body) {
		Ok(parsed) => {
			let ctx = ctx.with_oauth_error(parsed.error().to_string());

			match parsed.error_description() {
				Some(description) => ctx.with_error_description(description.as_str()),
				None => ctx,
			}
		},
		Err(_) => ctx.with_body_preview(String::from_utf8_lossy(body)),
	}
}

fn decode_token(body: &[u8], now: OffsetDateTime) -> Result<AccessToken, CredentialError> {
	let de = &mut serde_json::Deserializer::from_slice(body);
	let response: BasicTokenResponse = serde_path_to_error::deserialize(de)
		.map_err(|e| CredentialError::MalformedResponse { reason: e.to_string() })?;

	if !matches!(response.token_type(), BasicTokenType::Bearer) {
		return Err(CredentialError::MalformedResponse {
			reason: format!("unsupported token type {:?}", response.token_type()),
		});
	}

	let expires_in = response.expires_in().ok_or_else(|| CredentialError::MalformedResponse {
		reason: "expires_in is missing".into(),
	})?;
	let expires_in = i64::try_from(expires_in.as_secs()).map_err(|_| {
		CredentialError::MalformedResponse { reason: "expires_in is out of range".into() }
	})?;

	AccessToken::builder()
		.secret(response.access_token().secret().to_owned())
		.issued_at(now)
		.expires_in(Duration::seconds(expires_in))
		.build()
		.map_err(|e| CredentialError::MalformedResponse { reason: e.to_string() })
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::_preludet::*;

	const T0: OffsetDateTime = macros::datetime!(2025-01-01 00:00 UTC);
	const KEY_PEM: &str = include_str!("../../tests/fixtures/service_account_key.pem");

	fn provider(
		responses: Vec<ScriptedResponse>,
	) -> ServiceAccountProvider<Arc<ScriptedTransport>> {
		let endpoints = test_endpoints("https://oauth.test");
		let mut key = test_service_account(endpoints.token.as_str());

		key.private_key = KEY_PEM.into();

		ServiceAccountProvider::new(
			key,
			test_scope(),
			endpoints.token,
			Arc::new(ScriptedTransport::new(responses)),
		)
	}

	#[tokio::test]
	async fn bearer_response_becomes_access_token() {
		let provider = provider(vec![ScriptedResponse::json(
			200,
			r#"{"access_token":"ya29.c.token","token_type":"Bearer","expires_in":3599}"#,
		)]);
		let token = provider.request_token(T0).await.expect("Token response should decode.");

		assert_eq!(token.secret.expose(), "ya29.c.token");
		assert_eq!(token.issued_at, T0);
		assert_eq!(token.expires_at, T0 + Duration::seconds(3_599));
		assert_eq!(
			provider.transport.requests(),
			vec![("POST".to_string(), "https://oauth.test/token".to_string())]
		);
	}

	#[tokio::test]
	async fn oauth_errors_are_classified() {
		let provider = provider(vec![
			ScriptedResponse::json(
				400,
				r#"{"error":"invalid_grant","error_description":"Invalid JWT Signature."}"#,
			),
			ScriptedResponse::json(503, "backend unavailable"),
		]);
		let err = provider.request_token(T0).await.expect_err("400 must be rejected.");

		assert_eq!(
			err,
			CredentialError::Rejected { reason: "invalid_grant: Invalid JWT Signature.".into() }
		);

		let err = provider.request_token(T0).await.expect_err("503 must be transient.");

		assert_eq!(
			err,
			CredentialError::Transient { reason: "backend unavailable".into(), status: Some(503) }
		);
	}

	#[tokio::test]
	async fn unusable_success_bodies_are_malformed() {
		let provider = provider(vec![
			ScriptedResponse::json(200, r#"{"access_token":"x","token_type":"Bearer"}"#),
			ScriptedResponse::json(200, r#"{"token_type":"Bearer","expires_in":3600}"#),
			ScriptedResponse::json(
				200,
				r#"{"access_token":"x","token_type":"mac","expires_in":1}"#,
			),
		]);

		for _ in 0..3 {
			let err = provider.request_token(T0).await.expect_err("Body must be rejected.");

			assert!(matches!(err, CredentialError::MalformedResponse { .. }), "{err:?}");
		}
	}

	#[tokio::test]
	async fn transport_failures_map_to_network() {
		let provider = provider(Vec::new());
		let err = provider.request_token(T0).await.expect_err("Empty transport must fail.");

		assert!(matches!(err, CredentialError::Network { .. }));
	}

	#[tokio::test]
	async fn placeholder_key_fails_before_any_request() {
		let endpoints = test_endpoints("https://oauth.test");
		let transport = Arc::new(ScriptedTransport::default());
		let provider = ServiceAccountProvider::new(
			test_service_account(endpoints.token.as_str()),
			test_scope(),
			endpoints.token,
			transport.clone(),
		);
		let err = provider.request_token(T0).await.expect_err("Placeholder key cannot sign.");

		assert!(matches!(err, CredentialError::MalformedCredential { .. }));
		assert!(transport.requests().is_empty());
	}
}
