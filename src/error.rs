//! Crate-level error types shared across credentials, catalog sync, fetching, and the cycle.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Every variant is local to one display cycle: the cycle logs it and sleeps.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token could not be obtained or is not usable right now.
	#[error(transparent)]
	Credential(#[from] CredentialError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body does not have the expected shape.
	#[error(transparent)]
	Parse(#[from] ParseError),

	/// The store rejected the bearer token.
	#[error("Drive rejected the bearer token with HTTP {status}.")]
	Unauthorized {
		/// HTTP status code (401 or 403).
		status: u16,
	},
	/// The store answered with a non-success status unrelated to credentials.
	#[error("Drive returned HTTP {status} for {operation}.")]
	UnexpectedStatus {
		/// HTTP status code.
		status: u16,
		/// Operation label (`list_files`, `fetch`).
		operation: &'static str,
	},
	/// The catalog holds no entries to select from.
	#[error("Catalog is empty.")]
	EmptyCatalog,
	/// The connection closed before the declared content length arrived.
	#[error("Transfer ended after {received} of {declared} bytes.")]
	IncompleteTransfer {
		/// Bytes received before the stream closed.
		received: usize,
		/// Declared content length.
		declared: usize,
	},
	/// The stream delivered more bytes than it declared.
	#[error("Transfer exceeded the declared length of {declared} bytes.")]
	Overrun {
		/// Declared content length.
		declared: usize,
	},
	/// The response carried no usable content length.
	#[error("Response for {file_id} is missing a content length.")]
	MissingContentLength {
		/// File identifier being fetched.
		file_id: String,
	},
	/// The declared content length exceeds the configured cap.
	#[error("Declared content length {declared} exceeds the {limit}-byte cap.")]
	ContentTooLarge {
		/// Declared content length.
		declared: u64,
		/// Configured cap.
		limit: usize,
	},
	/// The image buffer could not be reserved.
	#[error("Unable to allocate a {len}-byte image buffer.")]
	Allocation {
		/// Requested length.
		len: usize,
	},
}
impl Error {
	/// Returns `true` when the store rejected the token, meaning the credential should be
	/// minted again before the next request.
	pub fn is_unauthorized(&self) -> bool {
		matches!(self, Self::Unauthorized { .. })
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A URL could not be joined or parsed.
	#[error("URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoint validation failed.
	#[error(transparent)]
	Endpoints(#[from] crate::provider::DriveEndpointsError),
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Configuration or key file could not be read.
	#[error("Unable to read {path}.")]
	Read {
		/// File path.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Configuration or key file is not valid JSON for the expected shape.
	#[error("Unable to decode {path}.")]
	Decode {
		/// File path.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A required setting is missing.
	#[error("Missing required setting `{0}`.")]
	Missing(&'static str),
	/// A setting has an unusable value.
	#[error("Setting `{name}` is invalid: {reason}.")]
	Invalid {
		/// Setting name.
		name: &'static str,
		/// Why the value was rejected.
		reason: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
impl From<url::ParseError> for ConfigError {
	fn from(source: url::ParseError) -> Self {
		Self::InvalidUrl { source }
	}
}

/// Credential lifecycle failures; each maps to a cause reported to listeners.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CredentialError {
	/// An API call was attempted outside the Ready state.
	#[error("Credential is not ready.")]
	NotReady,
	/// Token endpoint could not be reached.
	#[error("Network failure while requesting a token: {message}.")]
	Network {
		/// Transport-supplied message.
		message: String,
	},
	/// The token request did not complete in time.
	#[error("Token request timed out after {seconds} seconds.")]
	Timeout {
		/// Timeout that elapsed.
		seconds: i64,
	},
	/// Service-account material could not be used to sign an assertion.
	#[error("Service-account credential is malformed: {reason}.")]
	MalformedCredential {
		/// Why the credential was rejected locally.
		reason: String,
	},
	/// The identity provider refused the grant or the client.
	#[error("Identity provider rejected the request: {reason}.")]
	Rejected {
		/// Provider-supplied reason.
		reason: String,
	},
	/// The identity provider failed in a way that may clear on retry.
	#[error("Identity provider returned a transient failure: {reason}.")]
	Transient {
		/// Provider-supplied reason.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// The token response could not be decoded or is unusable.
	#[error("Token response is malformed: {reason}.")]
	MalformedResponse {
		/// Why the response was rejected.
		reason: String,
	},
}

/// Transport-level failures (network, IO, stalls).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling Drive.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling Drive.")]
	Io(#[from] std::io::Error),
	/// No response or no further bytes arrived within the allowed window.
	#[error("No data arrived within {seconds} seconds.")]
	Timeout {
		/// Window that elapsed.
		seconds: i64,
	},
	/// The transport closed the exchange without a usable response.
	#[error("Connection closed: {message}.")]
	Closed {
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Builds a timeout error from the elapsed window.
	pub fn timeout(window: Duration) -> Self {
		Self::Timeout { seconds: window.whole_seconds() }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Response-shape failures.
#[derive(Debug, ThisError)]
pub enum ParseError {
	/// The body is not JSON of the expected shape.
	#[error("Drive returned malformed JSON for {operation}.")]
	Json {
		/// Operation label.
		operation: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The body exceeded the memory cap for parsing.
	#[error("Response body for {operation} exceeds the {limit}-byte parsing cap.")]
	BodyTooLarge {
		/// Operation label.
		operation: &'static str,
		/// Configured cap.
		limit: usize,
	},
}
