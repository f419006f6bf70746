//! Transport primitives shared by the token exchange, catalog listing, and media fetch.
//!
//! The module exposes [`HttpTransport`] alongside [`HttpResponseStream`] and
//! [`BodyStream`] so the pipeline never depends on a concrete HTTP stack. A transport
//! resolves once the status line and headers are known and hands back the body as a
//! chunk stream; callers decide whether to buffer it (JSON) or stream it into a
//! pre-sized image buffer (media).

// crates.io
use oauth2::http::{
	Method, Request,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{_prelude::*, error::{ConfigError, ParseError, TransportError}};

/// Request type accepted by [`HttpTransport`]; identical to the `oauth2` crate's request.
pub type HttpRequest = oauth2::HttpRequest;

/// Boxed future returned by transport operations.
pub type TransportFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks able to stream response bodies.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can back the
/// credential provider and the Drive calls at the same time. The returned future resolves
/// after headers arrive; the body is consumed through [`HttpResponseStream::body`].
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Dispatches `request` and resolves with the response head plus a body stream.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, HttpResponseStream>;
}
impl<T> HttpTransport for Arc<T>
where
	T: ?Sized + HttpTransport,
{
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, HttpResponseStream> {
		(**self).execute(request)
	}
}

/// Incremental access to a response body.
pub trait BodyStream
where
	Self: Send,
{
	/// Resolves with the next chunk, or `None` once the connection has closed.
	fn next_chunk(&mut self) -> TransportFuture<'_, Option<Vec<u8>>>;
}

/// Metadata from the response head.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// HTTP status code.
	pub status: u16,
	/// Declared content length, if the server sent one.
	pub content_length: Option<u64>,
}
impl ResponseMetadata {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Response head plus its streaming body.
pub struct HttpResponseStream {
	/// Status and declared length.
	pub metadata: ResponseMetadata,
	/// Remaining body bytes.
	pub body: Box<dyn BodyStream>,
}
impl HttpResponseStream {
	/// Reads the whole body, failing once more than `limit` bytes arrive.
	///
	/// Used for JSON payloads whose size is bounded by configuration rather than by a
	/// declared content length.
	pub async fn read_capped(mut self, limit: usize, operation: &'static str) -> Result<Vec<u8>> {
		if self.metadata.content_length.is_some_and(|declared| declared > limit as u64) {
			return Err(ParseError::BodyTooLarge { operation, limit }.into());
		}

		let mut body = Vec::new();

		while let Some(chunk) = self.body.next_chunk().await? {
			if body.len() + chunk.len() > limit {
				return Err(ParseError::BodyTooLarge { operation, limit }.into());
			}

			body.extend_from_slice(&chunk);
		}

		Ok(body)
	}
}
impl Debug for HttpResponseStream {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpResponseStream")
			.field("metadata", &self.metadata)
			.field("body", &"<stream>")
			.finish()
	}
}

/// Builds an authenticated `GET` request.
pub fn bearer_get(url: &Url, token: &str) -> Result<HttpRequest> {
	Request::builder()
		.method(Method::GET)
		.uri(url.as_str())
		.header(AUTHORIZATION, format!("Bearer {token}"))
		.body(Vec::new())
		.map_err(|e| ConfigError::from(e).into())
}

/// Builds a form-encoded `POST` request.
pub fn form_post(url: &Url, form: &[(&str, &str)]) -> Result<HttpRequest> {
	let body = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(form).finish();

	Request::builder()
		.method(Method::POST)
		.uri(url.as_str())
		.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
		.header(ACCEPT, "application/json")
		.body(body.into_bytes())
		.map_err(|e| ConfigError::from(e).into())
}

/// [`HttpTransport`] backed by a shared [`ReqwestClient`].
///
/// Redirects follow reqwest's defaults, which is what Drive's `alt=media` downloads need.
/// Use [`ReqwestTransport::builder`] to pin a root certificate and connection timeout.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client trusting `root_ca_pem` (when provided) with the given connect timeout.
	pub fn builder(root_ca_pem: Option<&[u8]>, connect_timeout: Duration) -> Result<Self> {
		let mut builder = ReqwestClient::builder()
			.connect_timeout(connect_timeout.unsigned_abs())
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));

		if let Some(pem) = root_ca_pem {
			let certificate =
				reqwest::Certificate::from_pem(pem).map_err(ConfigError::from)?;

			builder = builder.add_root_certificate(certificate);
		}

		Ok(Self(builder.build().map_err(ConfigError::from)?))
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, HttpResponseStream> {
		let client = self.0.clone();

		Box::pin(async move {
			let request: reqwest::Request = request.try_into()?;
			let response = client.execute(request).await?;
			let metadata = ResponseMetadata {
				status: response.status().as_u16(),
				content_length: response.content_length(),
			};

			Ok(HttpResponseStream { metadata, body: Box::new(ReqwestBody(response)) })
		})
	}
}

#[cfg(feature = "reqwest")]
struct ReqwestBody(reqwest::Response);
#[cfg(feature = "reqwest")]
impl BodyStream for ReqwestBody {
	fn next_chunk(&mut self) -> TransportFuture<'_, Option<Vec<u8>>> {
		Box::pin(async move {
			let chunk = self.0.chunk().await?;

			Ok(chunk.map(Vec::from))
		})
	}
}
