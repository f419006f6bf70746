//! Field-filtered decode of the `files.list` response.
//!
//! Only `files[].id`, `files[].name` and `nextPageToken` are materialized; every other field
//! in the document is skipped by the deserializer.

// self
use crate::{_prelude::*, catalog::Catalog, error::ParseError};

/// Default bound on identifier and display-name length, in characters.
pub const DEFAULT_FIELD_LIMIT: usize = 39;

/// Decoded first page of a folder listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Listing {
	/// Entries that passed validation.
	pub catalog: Catalog,
	/// Entries dropped for a missing, overlong, or duplicate identifier.
	pub skipped: usize,
	/// Continuation token; further pages are not fetched.
	pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListingDocument {
	files: Vec<ListedFile>,
	#[serde(default, rename = "nextPageToken")]
	next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListedFile {
	#[serde(default)]
	id: Option<String>,
	#[serde(default)]
	name: Option<String>,
}

/// Decodes a listing body, bounding identifiers and names to `field_limit` characters.
///
/// Identifiers over the bound are rejected because truncating them could collide keys;
/// names over the bound are truncated on a character boundary. The first occurrence of a
/// duplicate identifier wins.
pub fn parse_listing(body: &[u8], field_limit: usize) -> Result<Listing, ParseError> {
	let de = &mut serde_json::Deserializer::from_slice(body);
	let document: ListingDocument = serde_path_to_error::deserialize(de)
		.map_err(|source| ParseError::Json { operation: "list_files", source })?;
	let mut listing =
		Listing { next_page_token: document.next_page_token, ..Default::default() };

	for (index, file) in document.files.into_iter().enumerate() {
		let Some(id) = file.id.filter(|id| !id.is_empty()) else {
			tracing::warn!(index, "Skipping listed file without an identifier.");

			listing.skipped += 1;

			continue;
		};

		if id.chars().count() > field_limit {
			tracing::warn!(
				index,
				id = %id,
				field_limit,
				"Skipping listed file with an overlong identifier."
			);

			listing.skipped += 1;

			continue;
		}

		let name = bound_name(file.name.unwrap_or_default(), field_limit);

		if !listing.catalog.insert_first(id, name) {
			tracing::warn!(index, "Skipping duplicate identifier.");

			listing.skipped += 1;
		}
	}

	Ok(listing)
}

fn bound_name(name: String, limit: usize) -> String {
	match name.char_indices().nth(limit) {
		Some((cut, _)) => {
			tracing::warn!(name = %name, limit, "Truncating overlong display name.");

			name[..cut].to_owned()
		},
		None => name,
	}
}
