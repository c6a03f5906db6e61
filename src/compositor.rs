//! Core tricolor compositing engine.

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbImage};

use crate::blending::{self, Placement};
use crate::emblem::Emblem;
use crate::error::{Error, Result};

/// JPEG quality used for encoded results.
pub const JPEG_QUALITY: u8 = 95;

/// What happened to the emblem during a composite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmblemOutcome {
    /// The emblem was resized and pasted at the given placement.
    Applied(Placement),
    /// The caller did not ask for the emblem.
    NotRequested,
    /// The emblem file was not found; the image has the overlay only.
    Missing {
        /// Where the emblem was expected.
        path: PathBuf,
    },
    /// The image is too small for a non-empty emblem square.
    TooSmall,
}

/// Result of compositing a single image.
#[derive(Debug, Clone)]
pub struct Composite {
    /// The blended, opaque RGB image.
    pub image: RgbImage,
    /// Whether and where the emblem was pasted.
    pub emblem: EmblemOutcome,
}

/// Options controlling file processing.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Paste the emblem at the center of the image.
    pub include_emblem: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            include_emblem: true,
        }
    }
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Where the output was written, if it was.
    pub output: Option<PathBuf>,
    /// Whether processing succeeded.
    pub success: bool,
    /// Emblem outcome, when compositing ran.
    pub emblem: Option<EmblemOutcome>,
    /// Human-readable status message.
    pub message: String,
}

/// The compositor holding the emblem asset.
///
/// Create once and reuse for every image; the emblem is decoded on first use
/// and shared read-only afterwards, so a `Compositor` can sit behind an `Arc`.
#[derive(Debug, Default)]
pub struct Compositor {
    emblem: Emblem,
}

impl Compositor {
    /// Create a compositor reading the emblem from `asset_dir`.
    pub fn new(asset_dir: impl AsRef<Path>) -> Self {
        Self::with_emblem(Emblem::new(asset_dir))
    }

    /// Create a compositor around an existing [`Emblem`].
    #[must_use]
    pub fn with_emblem(emblem: Emblem) -> Self {
        Self { emblem }
    }

    /// The emblem this compositor pastes.
    #[must_use]
    pub fn emblem(&self) -> &Emblem {
        &self.emblem
    }

    /// Apply the tricolor overlay and, optionally, the centered emblem.
    ///
    /// A missing emblem file is not an error: it is logged and reported as
    /// [`EmblemOutcome::Missing`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmblemDecode`] if the emblem file exists but is corrupt.
    pub fn composite(&self, source: &DynamicImage, include_emblem: bool) -> Result<Composite> {
        let rgba = source.to_rgba8();
        let (width, height) = rgba.dimensions();

        let overlay = blending::tricolor_overlay(width, height);
        let mut image = blending::alpha_blend(&rgba, &overlay)?;

        let emblem = if include_emblem {
            self.paste_emblem(&mut image)?
        } else {
            EmblemOutcome::NotRequested
        };

        Ok(Composite { image, emblem })
    }

    fn paste_emblem(&self, image: &mut RgbImage) -> Result<EmblemOutcome> {
        let Some(emblem) = self.emblem.load()? else {
            tracing::warn!(
                path = %self.emblem.path().display(),
                "emblem not found, skipping"
            );
            return Ok(EmblemOutcome::Missing {
                path: self.emblem.path().to_path_buf(),
            });
        };

        let Some(placement) = blending::emblem_placement(image.width(), image.height()) else {
            tracing::debug!(
                width = image.width(),
                height = image.height(),
                "image too small for emblem"
            );
            return Ok(EmblemOutcome::TooSmall);
        };

        let resized = blending::resize_premultiplied(
            &emblem,
            placement.side,
            placement.side,
            FilterType::Lanczos3,
        );
        blending::paste_with_mask(image, &resized, placement.x, placement.y);
        tracing::debug!(
            side = placement.side,
            x = placement.x,
            y = placement.y,
            "pasted emblem"
        );

        Ok(EmblemOutcome::Applied(placement))
    }

    /// Process a single image file: load, composite, save.
    ///
    /// Returns a [`ProcessResult`] indicating success or failure.
    #[must_use]
    pub fn process_file(&self, input: &Path, output: &Path, opts: &ProcessOptions) -> ProcessResult {
        let mut result = ProcessResult {
            path: input.to_path_buf(),
            output: None,
            success: false,
            emblem: None,
            message: String::new(),
        };

        if !is_supported_image(input) {
            result.message = "Unsupported input format".to_string();
            return result;
        }

        let source = match image::open(input) {
            Ok(img) => img,
            Err(e) => {
                result.message = format!("Failed to load: {e}");
                return result;
            }
        };

        let composite = match self.composite(&source, opts.include_emblem) {
            Ok(c) => c,
            Err(e) => {
                result.message = format!("Failed to composite: {e}");
                return result;
            }
        };

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    result.message = format!("Failed to create output directory: {e}");
                    return result;
                }
            }
        }

        match save_image(&composite.image, output) {
            Ok(()) => {
                result.success = true;
                result.output = Some(output.to_path_buf());
                result.message = match &composite.emblem {
                    EmblemOutcome::Missing { path } => {
                        format!("Overlay applied (emblem not found at {})", path.display())
                    }
                    EmblemOutcome::TooSmall => {
                        "Overlay applied (image too small for emblem)".to_string()
                    }
                    EmblemOutcome::Applied(_) | EmblemOutcome::NotRequested => {
                        "Overlay applied".to_string()
                    }
                };
            }
            Err(e) => {
                result.message = format!("Failed to save: {e}");
            }
        }
        result.emblem = Some(composite.emblem);

        result
    }
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp"
        ),
        None => false,
    }
}

/// Encode an RGB image as JPEG in memory.
///
/// # Errors
///
/// Returns [`Error::Image`] if encoding fails.
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(img)?;
    Ok(buf)
}

/// Save an RGB image, picking the format from the file extension.
///
/// JPEG is written at [`JPEG_QUALITY`]; PNG, BMP and WebP are lossless.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &RgbImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    match format {
        ImageFormat::Jpeg => {
            let file = BufWriter::new(std::fs::File::create(path)?);
            JpegEncoder::new_with_quality(file, JPEG_QUALITY).encode_image(img)?;
        }
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => {
            img.save_with_format(path, format)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.png"` becomes `"photo_tricolor.jpg"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_tricolor.jpg"))
}
