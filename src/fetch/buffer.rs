//! Exactly sized image buffer and the partial-transfer error that owns it.

// self
use crate::{_prelude::*, error::TransportError};

/// Byte buffer allocated once at the declared content length.
///
/// The backing storage never grows: chunks that would exceed the declared length are
/// refused.
pub struct ImageBuffer {
	bytes: Vec<u8>,
	declared: usize,
}
impl ImageBuffer {
	/// Reserves exactly `declared` bytes, failing instead of aborting when memory is short.
	pub fn allocate(declared: usize) -> Result<Self> {
		let mut bytes = Vec::new();

		bytes.try_reserve_exact(declared).map_err(|_| Error::Allocation { len: declared })?;

		Ok(Self { bytes, declared })
	}

	/// Declared content length.
	pub fn declared_len(&self) -> usize {
		self.declared
	}

	/// Bytes received so far.
	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	/// Returns `true` when nothing has been received.
	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	/// Bytes still expected.
	pub fn remaining(&self) -> usize {
		self.declared - self.bytes.len()
	}

	/// Returns `true` once the declared length has been received.
	pub fn is_complete(&self) -> bool {
		self.bytes.len() == self.declared
	}

	/// Received bytes.
	pub fn as_bytes(&self) -> &[u8] {
		&self.bytes
	}

	/// Appends `chunk`; fails without writing anything when it would pass the declared
	/// length.
	pub fn extend(&mut self, chunk: &[u8]) -> Result<(), Error> {
		if chunk.len() > self.remaining() {
			return Err(Error::Overrun { declared: self.declared });
		}

		self.bytes.extend_from_slice(chunk);

		Ok(())
	}

	/// Frees the storage and returns the declared length that was released.
	pub fn release(self) -> usize {
		let declared = self.declared;

		drop(self);

		declared
	}
}
impl Debug for ImageBuffer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ImageBuffer")
			.field("received", &self.bytes.len())
			.field("declared", &self.declared)
			.finish()
	}
}

/// Why a transfer stopped before the declared length.
#[derive(Debug, ThisError)]
pub enum TransferCause {
	/// The peer closed the stream.
	#[error("connection closed")]
	Closed,
	/// No chunk arrived within the read timeout.
	#[error("no data for {seconds} seconds")]
	TimedOut {
		/// Read timeout that elapsed.
		seconds: i64,
	},
	/// The transport failed mid-stream.
	#[error("transport failed")]
	Transport(#[source] TransportError),
}

/// A transfer that ended early. Owns the partial buffer so the caller decides when it is
/// released; its content is never usable.
#[derive(Debug)]
pub struct IncompleteTransfer {
	/// Partially filled buffer.
	pub buffer: ImageBuffer,
	/// What ended the transfer.
	pub cause: TransferCause,
}
impl IncompleteTransfer {
	/// Bytes received before the transfer ended.
	pub fn received(&self) -> usize {
		self.buffer.len()
	}

	/// Releases the partial buffer and converts the failure into the crate error.
	pub fn into_error(self) -> Error {
		let received = self.buffer.len();
		let declared = self.buffer.release();

		tracing::debug!(received, declared, cause = %self.cause, "Released partial image buffer.");

		Error::IncompleteTransfer { received, declared }
	}
}
impl Display for IncompleteTransfer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(
			f,
			"Transfer ended after {} of {} bytes: {}.",
			self.buffer.len(),
			self.buffer.declared_len(),
			self.cause
		)
	}
}
impl StdError for IncompleteTransfer {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		Some(&self.cause)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn buffer_never_grows_past_declared_length() {
		let mut buffer = ImageBuffer::allocate(4).expect("Tiny buffer should allocate.");

		buffer.extend(b"ab").expect("Chunk within the declared length should fit.");

		assert_eq!(buffer.remaining(), 2);
		assert!(matches!(buffer.extend(b"cde"), Err(Error::Overrun { declared: 4 })));
		assert_eq!(buffer.as_bytes(), b"ab");

		buffer.extend(b"cd").expect("Exact fit should be accepted.");

		assert!(buffer.is_complete());
		assert_eq!(buffer.release(), 4);
	}

	#[test]
	fn impossible_allocation_is_an_error() {
		let err =
			ImageBuffer::allocate(usize::MAX).expect_err("usize::MAX bytes cannot be reserved.");

		assert!(matches!(err, Error::Allocation { len: usize::MAX }));
	}

	#[test]
	fn incomplete_transfer_reports_progress() {
		let mut buffer = ImageBuffer::allocate(10).expect("Buffer should allocate.");

		buffer.extend(b"1234").expect("Chunk should fit.");

		let incomplete = IncompleteTransfer { buffer, cause: TransferCause::Closed };

		assert_eq!(incomplete.received(), 4);
		assert_eq!(
			incomplete.to_string(),
			"Transfer ended after 4 of 10 bytes: connection closed."
		);
		assert!(matches!(
			incomplete.into_error(),
			Error::IncompleteTransfer { received: 4, declared: 10 }
		));
	}
}
