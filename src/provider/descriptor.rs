//! Endpoint descriptor shared by the credential provider, catalog sync, and fetcher.

/// Builder API for assembling endpoint descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Google's OAuth 2.0 token endpoint.
pub const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
/// Drive v3 REST base; the trailing slash lets relative joins keep the version segment.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3/";

/// Immutable endpoint set consumed by the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveEndpoints {
	/// Token endpoint used for the JWT-bearer exchange (also the assertion audience).
	pub token: Url,
	/// Drive API base (`…/drive/v3/`).
	pub api_base: Url,
}
impl DriveEndpoints {
	/// Creates a new builder.
	pub fn builder() -> DriveEndpointsBuilder {
		DriveEndpointsBuilder::default()
	}

	/// Endpoints of the public Google services.
	pub fn google() -> Result<Self, DriveEndpointsError> {
		Self::builder().build()
	}

	/// `GET files` URL listing the children of `container_id`, restricted server-side to the
	/// fields the catalog decodes.
	pub fn list_files_url(&self, container_id: &str, page_size: u32) -> Result<Url, ConfigError> {
		let mut url = self.api_base.join("files")?;

		url.query_pairs_mut()
			.append_pair("q", &format!("'{container_id}' in parents"))
			.append_pair("fields", "files(id,name),nextPageToken")
			.append_pair("pageSize", &page_size.to_string());

		Ok(url)
	}

	/// `GET files/{id}?alt=media` URL for the binary content of `file_id`.
	pub fn media_url(&self, file_id: &str) -> Result<Url, ConfigError> {
		let mut url = self.api_base.join("files/")?;

		url.path_segments_mut()
			.map_err(|_| ConfigError::Invalid {
				name: "api_base",
				reason: "URL cannot carry path segments".into(),
			})?
			.pop_if_empty()
			.push(file_id);
		url.query_pairs_mut().append_pair("alt", "media");

		Ok(url)
	}
}
