//! Streaming media download into an exactly sized buffer.
//!
//! The declared content length is read from the response head before anything is
//! allocated. Each wait for the next chunk is bounded by the read timeout, and a stream that
//! closes early hands its partial buffer back inside [`IncompleteTransfer`].

pub mod buffer;

pub use buffer::*;

// self
use crate::{
	_prelude::*,
	credential::CredentialManager,
	http::{self, BodyStream, HttpTransport},
	obs::{self, Stage, StageOutcome, StageSpan},
	provider::DriveEndpoints,
};

/// Limits applied to each download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchOptions {
	/// Largest declared content length accepted, in bytes.
	pub max_image_bytes: usize,
	/// Longest wait for the next chunk.
	pub read_timeout: Duration,
}
impl Default for FetchOptions {
	fn default() -> Self {
		Self { max_image_bytes: 16 * 1024 * 1024, read_timeout: Duration::seconds(30) }
	}
}

/// Failure of a download.
#[derive(Debug, ThisError)]
pub enum FetchError {
	/// The download failed before or without a usable partial buffer.
	#[error(transparent)]
	Failed(#[from] Error),
	/// The stream ended early; the partial buffer is owned by the error.
	#[error(transparent)]
	Incomplete(IncompleteTransfer),
}
impl FetchError {
	/// Releases any partial buffer and returns the crate error.
	pub fn into_error(self) -> Error {
		match self {
			Self::Failed(e) => e,
			Self::Incomplete(transfer) => transfer.into_error(),
		}
	}
}

/// A completed download.
#[derive(Debug)]
pub struct FetchedImage {
	/// File identifier that was downloaded.
	pub file_id: String,
	/// Buffer filled to its declared length.
	pub buffer: ImageBuffer,
}
impl FetchedImage {
	/// Confirmed byte count.
	pub fn len(&self) -> usize {
		self.buffer.len()
	}

	/// Returns `true` for a zero-length file.
	pub fn is_empty(&self) -> bool {
		self.buffer.is_empty()
	}
}

/// Downloads file content for the cycle.
#[derive(Clone, Debug, Default)]
pub struct Fetcher {
	options: FetchOptions,
}
impl Fetcher {
	/// Creates a fetcher with the given limits.
	pub fn new(options: FetchOptions) -> Self {
		Self { options }
	}

	/// Limits in effect.
	pub fn options(&self) -> &FetchOptions {
		&self.options
	}

	/// Streams the content of `file_id` into a buffer of its declared length.
	///
	/// Requires `credentials` to be Ready.
	pub async fn fetch<T>(
		&self,
		transport: &T,
		endpoints: &DriveEndpoints,
		credentials: &CredentialManager,
		file_id: &str,
	) -> Result<FetchedImage, FetchError>
	where
		T: HttpTransport,
	{
		const STAGE: Stage = Stage::Fetch;

		let span = StageSpan::new(STAGE, "fetch");

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		let result = span
			.instrument(async {
				let (body, buffer) = self.open(transport, endpoints, credentials, file_id).await?;

				stream_into_buffer(body, buffer, self.options.read_timeout).await
			})
			.await;

		match result {
			Ok(buffer) => {
				tracing::debug!(file_id, bytes = buffer.len(), "Image downloaded.");
				obs::record_stage_outcome(STAGE, StageOutcome::Success);

				Ok(FetchedImage { file_id: file_id.to_owned(), buffer })
			},
			Err(e) => {
				obs::record_stage_outcome(STAGE, StageOutcome::Failure);

				Err(e)
			},
		}
	}

	async fn open<T>(
		&self,
		transport: &T,
		endpoints: &DriveEndpoints,
		credentials: &CredentialManager,
		file_id: &str,
	) -> Result<(Box<dyn BodyStream>, ImageBuffer)>
	where
		T: HttpTransport,
	{
		let token = credentials.access_token()?;
		let url = endpoints.media_url(file_id)?;
		let request = http::bearer_get(&url, token.expose())?;
		let response = transport.execute(request).await?;
		let status = response.metadata.status;

		match status {
			200..=299 => {},
			401 | 403 => return Err(Error::Unauthorized { status }),
			_ => return Err(Error::UnexpectedStatus { status, operation: "fetch" }),
		}

		let declared = response
			.metadata
			.content_length
			.ok_or_else(|| Error::MissingContentLength { file_id: file_id.to_owned() })?;
		let limit = self.options.max_image_bytes;
		let declared = usize::try_from(declared)
			.ok()
			.filter(|len| *len <= limit)
			.ok_or(Error::ContentTooLarge { declared, limit })?;
		let buffer = ImageBuffer::allocate(declared)?;

		Ok((response.body, buffer))
	}
}

/// Copies chunks from `body` into `buffer` until it reaches its declared length.
///
/// Reading stops at the declared length; a chunk that would pass it is an
/// [`Error::Overrun`] and the buffer is released.
pub async fn stream_into_buffer(
	mut body: Box<dyn BodyStream>,
	mut buffer: ImageBuffer,
	read_timeout: Duration,
) -> Result<ImageBuffer, FetchError> {
	while !buffer.is_complete() {
		let cause = match tokio::time::timeout(read_timeout.unsigned_abs(), body.next_chunk()).await
		{
			Ok(Ok(Some(chunk))) => {
				if let Err(e) = buffer.extend(&chunk) {
					buffer.release();

					return Err(e.into());
				}

				continue;
			},
			Ok(Ok(None)) => TransferCause::Closed,
			Ok(Err(e)) => TransferCause::Transport(e),
			Err(_) => TransferCause::TimedOut { seconds: read_timeout.whole_seconds() },
		};

		return Err(FetchError::Incomplete(IncompleteTransfer { buffer, cause }));
	}

	Ok(buffer)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, error::TransportError, http::TransportFuture};

	async fn fetch_with(response: ScriptedResponse) -> Result<FetchedImage, FetchError> {
		let transport = ScriptedTransport::new([response]);
		let credentials = ready_credentials("tok").await;
		let endpoints = test_endpoints("https://drive.test");

		Fetcher::default().fetch(&transport, &endpoints, &credentials, "img1").await
	}

	#[tokio::test]
	async fn declared_bytes_arrive_across_arbitrary_chunks() {
		for chunk in [1, 7, 333, 1_000, 4_096] {
			let image = fetch_with(ScriptedResponse::binary(1_000, chunk))
				.await
				.expect("Full body should download.");

			assert_eq!(image.len(), 1_000);
			assert_eq!(image.file_id, "img1");
			assert_eq!(image.buffer.as_bytes()[250], (250 % 251) as u8);
		}
	}

	#[tokio::test]
	async fn early_close_returns_the_partial_buffer() {
		let mut response = ScriptedResponse::binary(400, 100);

		response.content_length = Some(1_000);

		let err = fetch_with(response).await.expect_err("Short body must fail.");
		let transfer = match err {
			FetchError::Incomplete(transfer) => transfer,
			other => panic!("Expected an incomplete transfer, got {other:?}."),
		};

		assert_eq!(transfer.received(), 400);
		assert!(matches!(transfer.cause, TransferCause::Closed));
		assert!(matches!(
			transfer.into_error(),
			Error::IncompleteTransfer { received: 400, declared: 1_000 }
		));
	}

	#[tokio::test]
	async fn excess_bytes_are_an_overrun() {
		let mut response = ScriptedResponse::binary(1_200, 600);

		response.content_length = Some(1_000);

		let err = fetch_with(response).await.expect_err("Long body must fail.");

		assert!(matches!(err, FetchError::Failed(Error::Overrun { declared: 1_000 })));
	}

	#[tokio::test]
	async fn length_is_validated_before_allocation() {
		let mut missing = ScriptedResponse::binary(10, 10);

		missing.content_length = None;

		assert!(matches!(
			fetch_with(missing).await,
			Err(FetchError::Failed(Error::MissingContentLength { .. }))
		));

		let mut huge = ScriptedResponse::binary(10, 10);

		huge.content_length = Some(u64::MAX);

		assert!(matches!(
			fetch_with(huge).await,
			Err(FetchError::Failed(Error::ContentTooLarge { declared: u64::MAX, .. }))
		));
		assert!(matches!(
			fetch_with(ScriptedResponse::json(403, "{}")).await,
			Err(FetchError::Failed(Error::Unauthorized { status: 403 }))
		));
	}

	#[tokio::test]
	async fn stalled_stream_times_out_with_partial_buffer() {
		struct Stalled(bool);
		impl BodyStream for Stalled {
			fn next_chunk(&mut self) -> TransportFuture<'_, Option<Vec<u8>>> {
				if std::mem::replace(&mut self.0, true) {
					Box::pin(std::future::pending::<Result<Option<Vec<u8>>, TransportError>>())
				} else {
					Box::pin(async { Ok(Some(vec![0; 8])) })
				}
			}
		}

		let buffer = ImageBuffer::allocate(16).expect("Buffer should allocate.");
		let err = stream_into_buffer(Box::new(Stalled(false)), buffer, Duration::milliseconds(20))
			.await
			.expect_err("Stalled stream must time out.");
		let transfer = match err {
			FetchError::Incomplete(transfer) => transfer,
			other => panic!("Expected an incomplete transfer, got {other:?}."),
		};

		assert_eq!(transfer.received(), 8);
		assert!(matches!(transfer.cause, TransferCause::TimedOut { .. }));
	}
}
