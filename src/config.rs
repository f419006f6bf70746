//! Frame configuration loaded from a JSON file.
//!
//! Every timing and size knob has a default; only the service-account key path and the
//! folder identifier are required. The key itself is read from the JSON file Google issues
//! for the account.

// std
use std::path::{Path, PathBuf};
// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;
use crate::{
	_prelude::*,
	auth::{ScopeSet, ServiceAccountKey},
	catalog::{CatalogSync, ListingOptions},
	credential::{CredentialManager, ServiceAccountProvider, TracingListener},
	cycle::{CanvasSize, DisplayCycle, RenderSink},
	error::ConfigError,
	fetch::{FetchOptions, Fetcher},
	http::HttpTransport,
	provider::DriveEndpoints,
};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "DRIVE_FRAME_CONFIG";

/// Settings for one frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameConfig {
	/// Path of the service-account key file.
	pub service_account_key: PathBuf,
	/// Drive folder whose images are shown.
	pub container_id: String,
	/// Scopes requested for the token.
	#[serde(default = "ScopeSet::drive_default")]
	pub scopes: ScopeSet,
	/// PEM file with an extra trusted root certificate.
	#[serde(default)]
	pub root_ca: Option<PathBuf>,
	/// Token endpoint override; defaults to the key file's `token_uri`, then Google's.
	#[serde(default)]
	pub token_endpoint: Option<Url>,
	/// Drive API base override.
	#[serde(default)]
	pub api_base: Option<Url>,
	/// File the rendered frame is written to.
	#[serde(default = "default_frame_path")]
	pub frame_path: PathBuf,
	/// Display canvas size.
	#[serde(default)]
	pub canvas: CanvasSize,
	/// Seconds between iterations.
	#[serde(default = "default_interval_secs")]
	pub interval_secs: u32,
	/// Seconds before expiry at which the token is refreshed.
	#[serde(default = "default_refresh_margin_secs")]
	pub refresh_margin_secs: u32,
	/// Upper bound for one token request, in seconds.
	#[serde(default = "default_timeout_secs")]
	pub request_timeout_secs: u32,
	/// Upper bound for the wait on each media chunk, in seconds.
	#[serde(default = "default_timeout_secs")]
	pub read_timeout_secs: u32,
	/// TCP/TLS connect timeout, in seconds.
	#[serde(default = "default_connect_timeout_secs")]
	pub connect_timeout_secs: u32,
	/// Largest image accepted, in bytes.
	#[serde(default = "default_max_image_bytes")]
	pub max_image_bytes: usize,
	/// Folder listing knobs.
	#[serde(default)]
	pub listing: ListingOptions,
	/// Keep showing images from the previous catalog when a sync fails.
	#[serde(default)]
	pub serve_stale_catalog: bool,
}
impl FrameConfig {
	/// Decodes configuration from JSON text; `origin` names the source in errors.
	pub fn from_json(raw: &str, origin: &str) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(de)
			.map_err(|source| ConfigError::Decode { path: origin.to_owned(), source })?;

		config.validate()?;

		Ok(config)
	}

	/// Reads configuration from `path`.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let display = path.display().to_string();
		let raw = std::fs::read_to_string(path)
			.map_err(|source| ConfigError::Read { path: display.clone(), source })?;

		Self::from_json(&raw, &display)
	}

	/// Reads configuration from the file named by [`CONFIG_ENV`].
	pub fn from_env() -> Result<Self, ConfigError> {
		let path = std::env::var_os(CONFIG_ENV).ok_or(ConfigError::Missing(CONFIG_ENV))?;

		Self::from_file(path)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.container_id.trim().is_empty() {
			return Err(ConfigError::Missing("container_id"));
		}
		if self.scopes.is_empty() {
			return Err(ConfigError::Missing("scopes"));
		}

		for (name, value) in [
			("interval_secs", self.interval_secs),
			("request_timeout_secs", self.request_timeout_secs),
			("read_timeout_secs", self.read_timeout_secs),
			("connect_timeout_secs", self.connect_timeout_secs),
		] {
			if value == 0 {
				return Err(ConfigError::Invalid { name, reason: "must be positive".into() });
			}
		}

		if self.max_image_bytes == 0 {
			return Err(ConfigError::Invalid {
				name: "max_image_bytes",
				reason: "must be positive".into(),
			});
		}
		if self.listing.page_size == 0 || self.listing.field_limit == 0 {
			return Err(ConfigError::Invalid {
				name: "listing",
				reason: "page_size and field_limit must be positive".into(),
			});
		}

		Ok(())
	}

	/// Sleep between iterations.
	pub fn interval(&self) -> Duration {
		Duration::seconds(self.interval_secs.into())
	}

	/// Pre-refresh margin.
	pub fn refresh_margin(&self) -> Duration {
		Duration::seconds(self.refresh_margin_secs.into())
	}

	/// Fetch limits.
	pub fn fetch_options(&self) -> FetchOptions {
		FetchOptions {
			max_image_bytes: self.max_image_bytes,
			read_timeout: Duration::seconds(self.read_timeout_secs.into()),
		}
	}

	/// Validated endpoints; `key_token_uri` is used when no token endpoint is configured.
	pub fn endpoints(&self, key_token_uri: Option<&str>) -> Result<DriveEndpoints, ConfigError> {
		let mut builder = DriveEndpoints::builder();
		let token = match (&self.token_endpoint, key_token_uri) {
			(Some(url), _) => Some(url.clone()),
			(None, Some(uri)) => Some(Url::parse(uri)?),
			(None, None) => None,
		};

		if let Some(token) = token {
			builder = builder.token_endpoint(token);
		}
		if let Some(api_base) = &self.api_base {
			builder = builder.api_base(api_base.clone());
		}

		Ok(builder.build()?)
	}

	/// Contents of the configured root certificate file.
	pub fn root_ca_pem(&self) -> Result<Option<Vec<u8>>, ConfigError> {
		self.root_ca
			.as_ref()
			.map(|path| {
				std::fs::read(path).map_err(|source| ConfigError::Read {
					path: path.display().to_string(),
					source,
				})
			})
			.transpose()
	}

	/// Builds the reqwest transport with the configured root certificate and connect timeout.
	#[cfg(feature = "reqwest")]
	pub fn reqwest_transport(&self) -> Result<ReqwestTransport> {
		let root_ca = self.root_ca_pem()?;

		ReqwestTransport::builder(
			root_ca.as_deref(),
			Duration::seconds(self.connect_timeout_secs.into()),
		)
	}

	/// Wires the full pipeline; `transport` is shared by the token exchange and Drive calls.
	pub fn build_cycle<T, S>(&self, transport: T, sink: S) -> Result<DisplayCycle<T, S>>
	where
		T: Clone + HttpTransport,
		S: RenderSink,
	{
		let key = ServiceAccountKey::from_json_file(&self.service_account_key)?;
		let endpoints = self.endpoints(key.token_uri.as_deref())?;

		tracing::info!(
			client_email = %key.client_email,
			container_id = %self.container_id,
			token_endpoint = %endpoints.token,
			"Frame configured."
		);

		let provider = Arc::new(ServiceAccountProvider::new(
			key,
			self.scopes.clone(),
			endpoints.token.clone(),
			transport.clone(),
		));
		let credentials = CredentialManager::new(provider)
			.with_margin(self.refresh_margin())
			.with_request_timeout(Duration::seconds(self.request_timeout_secs.into()))
			.with_listener(Arc::new(TracingListener));
		let catalog =
			CatalogSync::new(self.container_id.clone()).with_options(self.listing.clone());

		Ok(DisplayCycle::new(transport, endpoints, credentials, catalog, sink)
			.with_fetcher(Fetcher::new(self.fetch_options()))
			.with_interval(self.interval())
			.serve_stale_catalog(self.serve_stale_catalog))
	}
}

fn default_frame_path() -> PathBuf {
	PathBuf::from("/run/drive-frame/frame.jpg")
}

fn default_interval_secs() -> u32 {
	120
}

fn default_refresh_margin_secs() -> u32 {
	60
}

fn default_timeout_secs() -> u32 {
	30
}

fn default_connect_timeout_secs() -> u32 {
	10
}

fn default_max_image_bytes() -> usize {
	16 * 1024 * 1024
}
