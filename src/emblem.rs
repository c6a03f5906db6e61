//! The emblem asset pasted at the center of every image.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use image::{DynamicImage, ImageReader, RgbaImage};

use crate::error::{Error, Result};

/// File name of the emblem inside the asset directory.
pub const EMBLEM_FILE_NAME: &str = "ashoka_chakra.jpg";

/// Default asset directory, relative to the working directory.
pub const DEFAULT_ASSET_DIR: &str = "static";

/// Lazily loaded emblem image.
///
/// The decoded image is cached after the first successful load and never
/// mutated, so one `Emblem` can be shared across threads. A missing file is
/// not cached: the next call looks on disk again.
#[derive(Debug)]
pub struct Emblem {
    path: PathBuf,
    cached: OnceLock<Arc<RgbaImage>>,
}

impl Emblem {
    /// Emblem stored as [`EMBLEM_FILE_NAME`] inside `asset_dir`.
    pub fn new(asset_dir: impl AsRef<Path>) -> Self {
        Self::from_path(asset_dir.as_ref().join(EMBLEM_FILE_NAME))
    }

    /// Emblem stored at an explicit file path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: OnceLock::new(),
        }
    }

    /// Location of the emblem file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the emblem as RGBA.
    ///
    /// Returns `Ok(None)` if the file does not exist. Images without an alpha
    /// channel come back fully opaque.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmblemDecode`] if the file exists but cannot be decoded.
    pub fn load(&self) -> Result<Option<Arc<RgbaImage>>> {
        if let Some(img) = self.cached.get() {
            return Ok(Some(Arc::clone(img)));
        }

        if !self.path.exists() {
            return Ok(None);
        }

        let decoded = decode_file(&self.path)
            .map_err(|source| Error::EmblemDecode {
                path: self.path.clone(),
                source,
            })?
            .to_rgba8();
        tracing::debug!(
            path = %self.path.display(),
            width = decoded.width(),
            height = decoded.height(),
            "loaded emblem"
        );

        // A concurrent loader may have won; either copy is identical.
        let cached = self.cached.get_or_init(|| Arc::new(decoded));
        Ok(Some(Arc::clone(cached)))
    }
}

/// Decode by content rather than trusting the extension.
fn decode_file(path: &Path) -> image::ImageResult<DynamicImage> {
    ImageReader::open(path)?.with_guessed_format()?.decode()
}

impl Default for Emblem {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_DIR)
    }
}
