//! Fixtures shared by the integration tests: a TLS-lenient transport for `httpmock`, the RSA
//! key pair under `tests/fixtures/`, and recording sinks.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use parking_lot::Mutex;
use url::Url;
// self
use drive_frame::{
	auth::{ScopeSet, ServiceAccountKey},
	credential::{CredentialManager, ServiceAccountProvider},
	cycle::SinkError,
	http::{HttpRequest, HttpResponseStream, HttpTransport, ReqwestTransport, TransportFuture},
	provider::DriveEndpoints,
	reqwest::Client,
};

pub const KEY_PEM: &str = include_str!("../fixtures/service_account_key.pem");
pub const PUB_PEM: &str = include_str!("../fixtures/service_account_pub.pem");
pub const CLIENT_EMAIL: &str = "frame@demo-project.iam.gserviceaccount.com";
pub const ACCESS_TOKEN: &str = "ya29.integration";

pub type Frames = Arc<Mutex<Vec<Vec<u8>>>>;

/// Reqwest transport that accepts the self-signed certificate `httpmock` serves.
pub fn insecure_transport() -> ReqwestTransport {
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Insecure test client should build.");

	ReqwestTransport::with_client(client)
}

/// Endpoints rooted at the mock server.
pub fn mock_endpoints(server: &MockServer) -> DriveEndpoints {
	DriveEndpoints::builder()
		.token_endpoint(Url::parse(&server.url("/token")).expect("Mock token URL should parse."))
		.api_base(Url::parse(&server.url("/drive/v3/")).expect("Mock API base should parse."))
		.build()
		.expect("Mock endpoints should validate.")
}

/// Service-account key carrying the fixture RSA private key.
pub fn service_account() -> ServiceAccountKey {
	ServiceAccountKey {
		client_email: CLIENT_EMAIL.into(),
		project_id: Some("demo-project".into()),
		private_key_id: Some("fixture-key".into()),
		private_key: KEY_PEM.into(),
		token_uri: None,
	}
}

/// Credential manager exchanging assertions at the mock token endpoint.
pub fn credentials<T>(endpoints: &DriveEndpoints, transport: T) -> CredentialManager
where
	T: HttpTransport,
{
	let provider = ServiceAccountProvider::new(
		service_account(),
		ScopeSet::drive_default(),
		endpoints.token.clone(),
		transport,
	);

	CredentialManager::new(Arc::new(provider))
}

/// Registers a token endpoint that always issues [`ACCESS_TOKEN`] for an hour.
pub async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200).header("content-type", "application/json").body(format!(
				"{{\"access_token\":\"{ACCESS_TOKEN}\",\"token_type\":\"Bearer\",\"expires_in\":3600}}"
			));
		})
		.await
}

/// Sink closure appending every frame to `frames`.
pub fn recording_sink(frames: Frames) -> impl FnMut(&[u8]) -> Result<(), SinkError> {
	move |image: &[u8]| {
		frames.lock().push(image.to_vec());

		Ok(())
	}
}

/// Transport that records request bodies before delegating to reqwest.
#[derive(Debug)]
pub struct RecordingTransport {
	inner: ReqwestTransport,
	bodies: Mutex<Vec<Vec<u8>>>,
}
impl RecordingTransport {
	pub fn new(inner: ReqwestTransport) -> Self {
		Self { inner, bodies: Mutex::new(Vec::new()) }
	}

	pub fn bodies(&self) -> Vec<Vec<u8>> {
		self.bodies.lock().clone()
	}
}
impl HttpTransport for RecordingTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, HttpResponseStream> {
		self.bodies.lock().push(request.body().clone());

		self.inner.execute(request)
	}
}
