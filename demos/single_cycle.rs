//! Runs one display iteration against a local mock of the token endpoint and the Drive API,
//! writing the chosen image to a temporary frame file.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use drive_frame::{
	auth::{ScopeSet, ServiceAccountKey},
	catalog::CatalogSync,
	credential::{CredentialManager, ServiceAccountProvider, TracingListener},
	cycle::{CanvasSize, CycleOutcome, DisplayCycle, FileSink},
	http::ReqwestTransport,
	provider::DriveEndpoints,
	reqwest::Client,
};

const KEY_PEM: &str = include_str!("../tests/fixtures/service_account_key.pem");

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let list_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/drive/v3/files").header("authorization", "Bearer demo-access");
			then.status(200).header("content-type", "application/json").body(
				"{\"files\":[{\"id\":\"sunset\",\"name\":\"sunset.jpg\"},{\"id\":\"harbour\",\"name\":\"harbour.jpg\"}]}",
			);
		})
		.await;
	let media_mock = server
		.mock_async(|when, then| {
			when.method(GET).path_matches("^/drive/v3/files/[a-z]+$").query_param("alt", "media");
			then.status(200).body(vec![0xA5_u8; 2048]);
		})
		.await;
	let endpoints = DriveEndpoints::builder()
		.token_endpoint(Url::parse(&server.url("/token"))?)
		.api_base(Url::parse(&server.url("/drive/v3/"))?)
		.build()?;
	let transport = ReqwestTransport::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let key = ServiceAccountKey {
		client_email: "frame@demo-project.iam.gserviceaccount.com".into(),
		project_id: Some("demo-project".into()),
		private_key_id: None,
		private_key: KEY_PEM.into(),
		token_uri: None,
	};
	let provider = Arc::new(ServiceAccountProvider::new(
		key,
		ScopeSet::drive_default(),
		endpoints.token.clone(),
		transport.clone(),
	));
	let credentials = CredentialManager::new(provider).with_listener(Arc::new(TracingListener));
	let frame_path = std::env::temp_dir().join("drive-frame-demo.jpg");
	let sink = FileSink::new(&frame_path, CanvasSize::default());
	let mut cycle = DisplayCycle::new(
		transport,
		endpoints,
		credentials,
		CatalogSync::new("demo-folder"),
		sink,
	);
	let report = cycle.run_once().await;

	match &report.outcome {
		CycleOutcome::Rendered { file_id, name, bytes, .. } => {
			println!("Rendered {name} ({file_id}, {bytes} bytes) to {}.", frame_path.display());
		},
		CycleOutcome::Skipped { stage, error } => {
			println!("Iteration skipped at {}: {error}.", stage.as_str());
		},
	}

	println!("States visited: {:?}.", report.states);

	token_mock.assert_async().await;
	list_mock.assert_async().await;
	media_mock.assert_async().await;

	Ok(())
}
