//! Service-account key material and the RS256 JWT assertion minted from it.
//!
//! The key is read from the JSON file Google issues for a service account; only the fields
//! the assertion needs are decoded and the private key stays wrapped in [`TokenSecret`].

// std
use std::path::Path;
// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
	error::{ConfigError, CredentialError},
};

/// Longest assertion lifetime Google's token endpoint accepts.
pub const MAX_ASSERTION_LIFETIME: Duration = Duration::HOUR;

/// Service-account identity decoded from a Google key file.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
	/// Account e-mail, used as the assertion issuer.
	pub client_email: String,
	/// Owning project; informational only.
	#[serde(default)]
	pub project_id: Option<String>,
	/// Key identifier placed in the JWT `kid` header when present.
	#[serde(default)]
	pub private_key_id: Option<String>,
	/// PEM-encoded RSA private key (PKCS#8 or PKCS#1).
	pub private_key: TokenSecret,
	/// Token endpoint recorded in the key file.
	#[serde(default)]
	pub token_uri: Option<String>,
}
impl ServiceAccountKey {
	/// Decodes a key from its JSON text.
	pub fn from_json(raw: &str, origin: &str) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_str(raw);
		let key: Self = serde_path_to_error::deserialize(de)
			.map_err(|source| ConfigError::Decode { path: origin.to_owned(), source })?;

		key.validate()?;

		Ok(key)
	}

	/// Reads and decodes the key file at `path`.
	pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let display = path.display().to_string();
		let raw = std::fs::read_to_string(path)
			.map_err(|source| ConfigError::Read { path: display.clone(), source })?;

		Self::from_json(&raw, &display)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.client_email.trim().is_empty() {
			return Err(ConfigError::Missing("client_email"));
		}
		if self.private_key.is_empty() {
			return Err(ConfigError::Missing("private_key"));
		}

		Ok(())
	}

	/// Signs a JWT-bearer assertion for `scopes`, addressed to `audience`, issued at `now`.
	///
	/// The lifetime is clamped to [`MAX_ASSERTION_LIFETIME`].
	pub fn sign_assertion(
		&self,
		scopes: &ScopeSet,
		audience: &Url,
		now: OffsetDateTime,
		lifetime: Duration,
	) -> Result<String, CredentialError> {
		if scopes.is_empty() {
			return Err(CredentialError::MalformedCredential {
				reason: "no scopes were requested".into(),
			});
		}

		let lifetime = lifetime.clamp(Duration::SECOND, MAX_ASSERTION_LIFETIME);
		let claims = AssertionClaims {
			iss: &self.client_email,
			scope: scopes.normalized(),
			aud: audience.as_str(),
			iat: now.unix_timestamp(),
			exp: (now + lifetime).unix_timestamp(),
		};
		let mut header = Header::new(Algorithm::RS256);

		header.kid = self.private_key_id.clone();

		let key = EncodingKey::from_rsa_pem(self.private_key.expose().as_bytes()).map_err(|e| {
			CredentialError::MalformedCredential { reason: format!("private key is unusable: {e}") }
		})?;

		jsonwebtoken::encode(&header, &claims, &key).map_err(|e| {
			CredentialError::MalformedCredential {
				reason: format!("assertion signing failed: {e}"),
			}
		})
	}
}
impl Debug for ServiceAccountKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceAccountKey")
			.field("client_email", &self.client_email)
			.field("project_id", &self.project_id)
			.field("private_key_id", &self.private_key_id)
			.field("private_key", &"<redacted>")
			.field("token_uri", &self.token_uri)
			.finish()
	}
}

/// Claim set of the JWT-bearer assertion (RFC 7523).
#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
	iss: &'a str,
	scope: String,
	aud: &'a str,
	iat: i64,
	exp: i64,
}
