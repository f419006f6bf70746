mod common;

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use parking_lot::Mutex;
use serde::Deserialize;
// self
use common::*;
use drive_frame::{
	credential::{CredentialListener, CredentialState, CredentialTransition, JWT_BEARER_GRANT},
	error::CredentialError,
};

#[derive(Debug, Deserialize)]
struct Claims {
	iss: String,
	scope: String,
	aud: String,
	iat: i64,
	exp: i64,
}

#[tokio::test]
async fn assertion_is_signed_and_exchanged_for_a_token() {
	let server = MockServer::start_async().await;
	let token_mock = mock_token(&server).await;
	let endpoints = mock_endpoints(&server);
	let transport = Arc::new(RecordingTransport::new(insecure_transport()));
	let transitions = <Arc<Mutex<Vec<(CredentialState, CredentialState)>>>>::default();
	let listener: Arc<dyn CredentialListener> = {
		let transitions = transitions.clone();

		Arc::new(move |event: &CredentialTransition<'_>| {
			transitions.lock().push((event.from, event.to));
		})
	};
	let mut credentials = credentials(&endpoints, transport.clone()).with_listener(listener);

	credentials.ensure_ready().await.expect("Mock token endpoint should issue a token.");

	assert_eq!(credentials.state(), CredentialState::Ready);
	assert_eq!(
		credentials.access_token().expect("Ready credential should expose its token.").expose(),
		ACCESS_TOKEN
	);
	assert_eq!(
		transitions.lock().as_slice(),
		[
			(CredentialState::Uninitialized, CredentialState::Requesting),
			(CredentialState::Requesting, CredentialState::Ready),
		]
	);

	token_mock.assert_async().await;

	let bodies = transport.bodies();

	assert_eq!(bodies.len(), 1);

	let form: Vec<(String, String)> =
		url::form_urlencoded::parse(&bodies[0]).into_owned().collect();
	let grant = form.iter().find(|(k, _)| k == "grant_type").map(|(_, v)| v.as_str());
	let assertion = form
		.iter()
		.find(|(k, _)| k == "assertion")
		.map(|(_, v)| v.clone())
		.expect("Form should carry the assertion.");

	assert_eq!(grant, Some(JWT_BEARER_GRANT));

	let mut validation = Validation::new(Algorithm::RS256);

	validation.set_audience(&[endpoints.token.as_str()]);
	validation.set_issuer(&[CLIENT_EMAIL]);

	let decoded = jsonwebtoken::decode::<Claims>(
		&assertion,
		&DecodingKey::from_rsa_pem(PUB_PEM.as_bytes()).expect("Fixture public key should parse."),
		&validation,
	)
	.expect("Assertion should verify against the fixture public key.");

	assert_eq!(decoded.header.kid.as_deref(), Some("fixture-key"));
	assert_eq!(decoded.claims.iss, CLIENT_EMAIL);
	assert_eq!(decoded.claims.aud, endpoints.token.as_str());
	assert_eq!(decoded.claims.scope, "https://www.googleapis.com/auth/drive.readonly");
	assert_eq!(decoded.claims.exp - decoded.claims.iat, 3_600);
}

#[tokio::test]
async fn rejected_grant_moves_to_error_then_recovers() {
	let server = MockServer::start_async().await;
	let endpoints = mock_endpoints(&server);
	let rejection = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400).header("content-type", "application/json").body(
				"{\"error\":\"invalid_grant\",\"error_description\":\"Invalid JWT Signature.\"}",
			);
		})
		.await;
	let mut credentials = credentials(&endpoints, insecure_transport());
	let err = credentials.ensure_ready().await.expect_err("Rejected grant must fail.");

	assert_eq!(
		err,
		CredentialError::Rejected { reason: "invalid_grant: Invalid JWT Signature.".into() }
	);
	assert_eq!(credentials.state(), CredentialState::Error);
	assert_eq!(credentials.last_error(), Some(&err));
	assert!(matches!(credentials.access_token(), Err(CredentialError::NotReady)));

	rejection.assert_async().await;
	rejection.delete_async().await;

	let token_mock = mock_token(&server).await;

	credentials.ensure_ready().await.expect("Next attempt should succeed.");

	assert_eq!(credentials.state(), CredentialState::Ready);
	assert!(credentials.last_error().is_none());

	token_mock.assert_async().await;
}

#[tokio::test]
async fn server_failures_are_transient() {
	let server = MockServer::start_async().await;
	let endpoints = mock_endpoints(&server);
	let _unavailable = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(503).body("upstream unavailable");
		})
		.await;
	let mut credentials = credentials(&endpoints, insecure_transport());
	let err = credentials.ensure_ready().await.expect_err("503 must fail.");

	assert!(matches!(err, CredentialError::Transient { status: Some(503), .. }));
	assert_eq!(credentials.state(), CredentialState::Error);
}
