//! Overlay a three-band tricolor gradient and a centered emblem onto images.
//!
//! Each band covers a third of the rows and is alpha-blended onto the source
//! with a fixed colour and opacity. The emblem, read from an asset directory,
//! is resized to a third of the shorter side and pasted at the center using
//! its own alpha channel as the mask.
//!
//! # Quick Start
//!
//! ```no_run
//! use tricolor_overlay::{Compositor, EmblemOutcome};
//!
//! let compositor = Compositor::new("static");
//! let img = image::open("photo.jpg").unwrap();
//! let composite = compositor.composite(&img, true).unwrap();
//! if let EmblemOutcome::Missing { path } = &composite.emblem {
//!     eprintln!("no emblem at {}", path.display());
//! }
//! composite.image.save("photo_tricolor.jpg").unwrap();
//! ```
//!
//! # HTTP service
//!
//! With the `server` feature, [`server::router`] exposes `GET /` and
//! `POST /tricolor` (multipart field `image`, JPEG response).

#![deny(missing_docs)]

pub mod blending;
mod compositor;
pub mod config;
pub mod emblem;
pub mod error;
#[cfg(feature = "server")]
pub mod server;

pub use compositor::{
    default_output_path, encode_jpeg, is_supported_image, save_image, Composite, Compositor,
    EmblemOutcome, ProcessOptions, ProcessResult, JPEG_QUALITY,
};
pub use emblem::Emblem;
pub use error::{Error, Result};
