// self
use crate::{
	_prelude::*,
	provider::{DRIVE_API_BASE, DriveEndpoints, GOOGLE_TOKEN_ENDPOINT},
};

/// Errors raised while constructing or validating endpoint descriptors.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum DriveEndpointsError {
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// A built-in default URL failed to parse.
	#[error("The default {endpoint} endpoint is invalid.")]
	InvalidDefault {
		/// Which endpoint failed to parse.
		endpoint: &'static str,
	},
	/// The API base cannot be used as a join base.
	#[error("The API base must end with `/` so relative paths keep its version segment: {url}.")]
	ApiBaseWithoutTrailingSlash {
		/// Offending URL.
		url: String,
	},
}

/// Builder for [`DriveEndpoints`] values; unset endpoints fall back to Google's.
#[derive(Debug, Default)]
pub struct DriveEndpointsBuilder {
	/// Token endpoint override.
	pub token_endpoint: Option<Url>,
	/// Drive API base override.
	pub api_base: Option<Url>,
}
impl DriveEndpointsBuilder {
	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the Drive API base.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<DriveEndpoints, DriveEndpointsError> {
		let token = match self.token_endpoint {
			Some(url) => url,
			None => Url::parse(GOOGLE_TOKEN_ENDPOINT)
				.map_err(|_| DriveEndpointsError::InvalidDefault { endpoint: "token" })?,
		};
		let api_base = match self.api_base {
			Some(url) => url,
			None => Url::parse(DRIVE_API_BASE)
				.map_err(|_| DriveEndpointsError::InvalidDefault { endpoint: "api" })?,
		};
		let endpoints = DriveEndpoints { token, api_base };

		endpoints.validate()?;

		Ok(endpoints)
	}
}

impl DriveEndpoints {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), DriveEndpointsError> {
		validate_endpoint("token", &self.token)?;
		validate_endpoint("api", &self.api_base)?;

		if !self.api_base.path().ends_with('/') {
			return Err(DriveEndpointsError::ApiBaseWithoutTrailingSlash {
				url: self.api_base.to_string(),
			});
		}

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), DriveEndpointsError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(DriveEndpointsError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Fixture URL should parse.")
	}

	#[test]
	fn defaults_point_at_google() {
		let endpoints = DriveEndpoints::builder().build().expect("Defaults should validate.");

		assert_eq!(endpoints.token.as_str(), GOOGLE_TOKEN_ENDPOINT);
		assert_eq!(endpoints.api_base.as_str(), DRIVE_API_BASE);
	}

	#[test]
	fn rejects_plain_http_for_remote_hosts() {
		let err = DriveEndpoints::builder()
			.token_endpoint(url("http://example.com/token"))
			.build()
			.expect_err("Remote plain-HTTP endpoints must be rejected.");

		assert!(matches!(err, DriveEndpointsError::InsecureEndpoint { endpoint: "token", .. }));
	}

	#[test]
	fn allows_plain_http_on_loopback() {
		let endpoints = DriveEndpoints::builder()
			.token_endpoint(url("http://127.0.0.1:8080/token"))
			.api_base(url("http://localhost:8080/drive/v3/"))
			.build()
			.expect("Loopback endpoints should validate.");

		assert_eq!(endpoints.api_base.port(), Some(8080));
	}

	#[test]
	fn api_base_needs_trailing_slash() {
		let err = DriveEndpoints::builder()
			.api_base(url("https://www.googleapis.com/drive/v3"))
			.build()
			.expect_err("API base without trailing slash must be rejected.");

		assert!(matches!(err, DriveEndpointsError::ApiBaseWithoutTrailingSlash { .. }));
	}
}
