//! Render sinks that receive downloaded image bytes.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::_prelude::*;

/// Failures reported by a [`RenderSink`].
#[derive(Debug, ThisError)]
pub enum SinkError {
	/// Writing the frame failed.
	#[error("Failed to write frame to {path}.")]
	Io {
		/// Destination path.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// The sink refused the image.
	#[error("Sink rejected the image: {reason}.")]
	Rejected {
		/// Sink-supplied reason.
		reason: String,
	},
}

/// Pixel size of the display canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
	/// Width in pixels.
	pub width: u32,
	/// Height in pixels.
	pub height: u32,
}
impl Default for CanvasSize {
	fn default() -> Self {
		Self { width: 960, height: 540 }
	}
}
impl Display for CanvasSize {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}x{}", self.width, self.height)
	}
}

/// Display collaborator that consumes raw image bytes; the content is never interpreted by
/// the cycle.
pub trait RenderSink {
	/// Renders `image`; `image.len()` is the confirmed byte count.
	fn render(&mut self, image: &[u8]) -> Result<(), SinkError>;
}
impl<F> RenderSink for F
where
	F: FnMut(&[u8]) -> Result<(), SinkError>,
{
	fn render(&mut self, image: &[u8]) -> Result<(), SinkError> {
		self(image)
	}
}

/// Atomically replaces an image file consumed by a display daemon.
#[derive(Clone, Debug)]
pub struct FileSink {
	path: PathBuf,
	canvas: CanvasSize,
}
impl FileSink {
	/// Creates a sink writing to `path` for a panel of `canvas` size.
	pub fn new(path: impl Into<PathBuf>, canvas: CanvasSize) -> Self {
		Self { path: path.into(), canvas }
	}

	/// Destination path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn io_error(path: &Path, source: std::io::Error) -> SinkError {
		SinkError::Io { path: path.display().to_string(), source }
	}
}
impl RenderSink for FileSink {
	fn render(&mut self, image: &[u8]) -> Result<(), SinkError> {
		if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| Self::io_error(parent, e))?;
		}

		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| Self::io_error(&tmp_path, e))?;

			file.write_all(image).map_err(|e| Self::io_error(&tmp_path, e))?;
			file.sync_all().map_err(|e| Self::io_error(&tmp_path, e))?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| Self::io_error(&self.path, e))?;

		tracing::debug!(
			path = %self.path.display(),
			bytes = image.len(),
			canvas = %self.canvas,
			"Frame written."
		);

		Ok(())
	}
}
