//! Folder catalog: listing, decoding, and random selection.
//!
//! [`CatalogSync`] lists one Drive folder and rebuilds its [`Catalog`] wholesale. A failed
//! or empty listing never touches the catalog that is already held, so callers can decide
//! whether stale entries are good enough for the current cycle.

pub mod listing;
pub mod selector;

pub use listing::*;
pub use selector::*;

// self
use crate::{
	_prelude::*,
	credential::CredentialManager,
	http::{self, HttpTransport},
	obs::{self, Stage, StageOutcome, StageSpan},
	provider::DriveEndpoints,
};

/// Identifier plus display name of one listed file.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogEntry {
	/// Drive file identifier.
	pub id: String,
	/// Display name.
	pub name: String,
}

/// Identifier → display-name mapping; identifiers are unique.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog(BTreeMap<String, String>);
impl Catalog {
	/// Number of entries.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when the catalog holds nothing to select from.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Display name stored for `id`.
	pub fn name(&self, id: &str) -> Option<&str> {
		self.0.get(id).map(String::as_str)
	}

	/// Returns `true` when `id` is listed.
	pub fn contains(&self, id: &str) -> bool {
		self.0.contains_key(id)
	}

	/// Entry at `index` in identifier order.
	pub fn entry_at(&self, index: usize) -> Option<CatalogEntry> {
		self.0
			.iter()
			.nth(index)
			.map(|(id, name)| CatalogEntry { id: id.clone(), name: name.clone() })
	}

	/// Iterator over `(id, name)` pairs in identifier order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(id, name)| (id.as_str(), name.as_str()))
	}

	/// Inserts an entry unless the identifier is already present; returns whether it was
	/// inserted.
	pub(crate) fn insert_first(&mut self, id: String, name: String) -> bool {
		match self.0.entry(id) {
			std::collections::btree_map::Entry::Vacant(slot) => {
				slot.insert(name);

				true
			},
			std::collections::btree_map::Entry::Occupied(_) => false,
		}
	}
}
impl<K, V> FromIterator<(K, V)> for Catalog
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I>(entries: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
	{
		let mut catalog = Self::default();

		for (id, name) in entries {
			catalog.insert_first(id.into(), name.into());
		}

		catalog
	}
}

/// Listing knobs for [`CatalogSync`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingOptions {
	/// `pageSize` sent with the query.
	pub page_size: u32,
	/// Largest listing body accepted, in bytes.
	pub body_limit: usize,
	/// Bound on identifier and display-name length, in characters.
	pub field_limit: usize,
}
impl Default for ListingOptions {
	fn default() -> Self {
		Self { page_size: 1_000, body_limit: 256 * 1024, field_limit: DEFAULT_FIELD_LIMIT }
	}
}

/// Keeps the catalog of one container in sync with Drive.
#[derive(Clone, Debug)]
pub struct CatalogSync {
	container_id: String,
	options: ListingOptions,
	catalog: Catalog,
	synced_at: Option<OffsetDateTime>,
}
impl CatalogSync {
	/// Creates a sync for `container_id` with an empty catalog.
	pub fn new(container_id: impl Into<String>) -> Self {
		Self {
			container_id: container_id.into(),
			options: ListingOptions::default(),
			catalog: Catalog::default(),
			synced_at: None,
		}
	}

	/// Overrides the listing options.
	pub fn with_options(mut self, options: ListingOptions) -> Self {
		self.options = options;

		self
	}

	/// Container (folder) identifier being listed.
	pub fn container_id(&self) -> &str {
		&self.container_id
	}

	/// Catalog from the last successful sync.
	pub fn catalog(&self) -> &Catalog {
		&self.catalog
	}

	/// Instant of the last successful sync.
	pub fn synced_at(&self) -> Option<OffsetDateTime> {
		self.synced_at
	}

	/// Lists `container_id` and decodes a fresh catalog without touching the held one.
	///
	/// Requires `credentials` to be Ready.
	pub async fn list_files<T>(
		&self,
		transport: &T,
		endpoints: &DriveEndpoints,
		credentials: &CredentialManager,
		container_id: &str,
	) -> Result<Listing>
	where
		T: HttpTransport,
	{
		let token = credentials.access_token()?;
		let url = endpoints.list_files_url(container_id, self.options.page_size)?;
		let request = http::bearer_get(&url, token.expose())?;
		let response = transport.execute(request).await?;
		let status = response.metadata.status;

		match status {
			200..=299 => {},
			401 | 403 => return Err(Error::Unauthorized { status }),
			_ => return Err(Error::UnexpectedStatus { status, operation: "list_files" }),
		}

		let body = response.read_capped(self.options.body_limit, "list_files").await?;
		let listing = parse_listing(&body, self.options.field_limit)?;

		if let Some(token) = &listing.next_page_token {
			tracing::warn!(
				container_id,
				entries = listing.catalog.len(),
				next_page_token = %token,
				"Listing has more pages; only the first page is used."
			);
		}

		Ok(listing)
	}

	/// Replaces the held catalog with a fresh listing.
	///
	/// On any failure, including an empty listing, the held catalog is left unchanged.
	pub async fn sync<T>(
		&mut self,
		transport: &T,
		endpoints: &DriveEndpoints,
		credentials: &CredentialManager,
	) -> Result<&Catalog>
	where
		T: HttpTransport,
	{
		const STAGE: Stage = Stage::Catalog;

		let span = StageSpan::new(STAGE, "sync");

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		let result = span
			.instrument(self.list_files(transport, endpoints, credentials, &self.container_id))
			.await
			.and_then(|listing| {
				if listing.catalog.is_empty() {
					Err(Error::EmptyCatalog)
				} else {
					Ok(listing)
				}
			});

		match result {
			Ok(listing) => {
				tracing::info!(
					container_id = %self.container_id,
					entries = listing.catalog.len(),
					skipped = listing.skipped,
					"Catalog synced."
				);

				self.catalog = listing.catalog;
				self.synced_at = Some(OffsetDateTime::now_utc());
				obs::record_stage_outcome(STAGE, StageOutcome::Success);

				Ok(&self.catalog)
			},
			Err(e) => {
				obs::record_stage_outcome(STAGE, StageOutcome::Failure);

				Err(e)
			},
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, error::ParseError};

	const FIXTURE: &str = r#"{
		"kind": "drive#fileList",
		"files": [
			{ "id": "a1", "name": "x", "mimeType": "image/jpeg" },
			{ "id": "a2", "name": "y" },
			{ "id": "a3", "name": "z" }
		]
	}"#;

	async fn sync_with(
		sync: &mut CatalogSync,
		responses: Vec<ScriptedResponse>,
	) -> (Result<Catalog>, Arc<ScriptedTransport>) {
		let transport = Arc::new(ScriptedTransport::new(responses));
		let credentials = ready_credentials("tok").await;
		let endpoints = test_endpoints("https://drive.test");
		let result = sync.sync(&transport, &endpoints, &credentials).await.map(Catalog::clone);

		(result, transport)
	}

	#[tokio::test]
	async fn fixture_listing_builds_exact_catalog() {
		let mut sync = CatalogSync::new("folder-1");
		let (catalog, transport) =
			sync_with(&mut sync, vec![ScriptedResponse::json(200, FIXTURE)]).await;
		let catalog = catalog.expect("Fixture listing should sync.");

		assert_eq!(catalog, Catalog::from_iter([("a1", "x"), ("a2", "y"), ("a3", "z")]));
		assert!(sync.synced_at().is_some());

		let (method, uri) = transport.requests().remove(0);

		assert_eq!(method, "GET");
		assert!(uri.starts_with("https://drive.test/drive/v3/files?q=%27folder-1%27+in+parents"));
	}

	#[tokio::test]
	async fn failures_keep_the_previous_catalog() {
		let mut sync = CatalogSync::new("folder-1");
		let (catalog, _) = sync_with(&mut sync, vec![ScriptedResponse::json(200, FIXTURE)]).await;
		let populated = catalog.expect("Fixture listing should sync.");
		let (malformed, _) =
			sync_with(&mut sync, vec![ScriptedResponse::json(200, r#"{"files": [{"id": 7}"#)])
				.await;

		assert!(matches!(malformed, Err(Error::Parse(ParseError::Json { .. }))));
		assert_eq!(sync.catalog(), &populated);

		let (empty, _) =
			sync_with(&mut sync, vec![ScriptedResponse::json(200, r#"{"files": []}"#)]).await;

		assert!(matches!(empty, Err(Error::EmptyCatalog)));
		assert_eq!(sync.catalog(), &populated);

		let (denied, _) = sync_with(&mut sync, vec![ScriptedResponse::json(401, "{}")]).await;

		assert!(matches!(denied, Err(Error::Unauthorized { status: 401 })));

		let (missing, _) = sync_with(&mut sync, vec![ScriptedResponse::json(404, "{}")]).await;

		assert!(matches!(
			missing,
			Err(Error::UnexpectedStatus { status: 404, operation: "list_files" })
		));
		assert_eq!(sync.catalog(), &populated);
	}

	#[tokio::test]
	async fn listing_requires_ready_credentials() {
		let sync = CatalogSync::new("folder-1");
		let transport = ScriptedTransport::default();
		let credentials = CredentialManager::new(Arc::new(ScriptedProvider::default()));
		let endpoints = test_endpoints("https://drive.test");
		let err = sync
			.list_files(&transport, &endpoints, &credentials, "folder-1")
			.await
			.expect_err("Listing without a token must fail.");

		assert!(matches!(err, Error::Credential(crate::error::CredentialError::NotReady)));
		assert!(transport.requests().is_empty());
	}

	#[tokio::test]
	async fn oversized_listing_is_a_parse_error() {
		let mut sync = CatalogSync::new("folder-1")
			.with_options(ListingOptions { body_limit: 16, ..Default::default() });
		let (result, _) = sync_with(&mut sync, vec![ScriptedResponse::json(200, FIXTURE)]).await;

		assert!(matches!(result, Err(Error::Parse(ParseError::BodyTooLarge { limit: 16, .. }))));
		assert!(sync.catalog().is_empty());
	}

	#[test]
	fn entry_at_follows_identifier_order() {
		let catalog = Catalog::from_iter([("b", "2"), ("a", "1"), ("a", "dup")]);

		assert_eq!(catalog.len(), 2);
		assert_eq!(catalog.name("a"), Some("1"));
		assert_eq!(
			catalog.entry_at(1),
			Some(CatalogEntry { id: "b".into(), name: "2".into() })
		);
		assert_eq!(catalog.entry_at(2), None);
	}
}
