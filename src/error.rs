//! Error types for the tricolor-overlay crate.

use std::path::PathBuf;

/// Errors that can occur while compositing, loading or saving images.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The emblem asset exists but could not be decoded.
    #[error("failed to decode emblem {}: {source}", path.display())]
    EmblemDecode {
        /// Location of the emblem file.
        path: PathBuf,
        /// Underlying decoder error.
        source: image::ImageError,
    },

    /// The overlay buffer does not cover the source image.
    #[error("overlay is {overlay_width}x{overlay_height} but image is {width}x{height}")]
    DimensionMismatch {
        /// Source image width in pixels.
        width: u32,
        /// Source image height in pixels.
        height: u32,
        /// Overlay width in pixels.
        overlay_width: u32,
        /// Overlay height in pixels.
        overlay_height: u32,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image processing (decode, encode, save).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
