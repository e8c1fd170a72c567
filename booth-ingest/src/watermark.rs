//! Post-Processor: watermark compositing
//!
//! Stamps a fixed overlay onto the bottom-right corner of a capture. The
//! overlay is scaled so its longer side is 20% of the source width (aspect
//! ratio preserved), and inset from the corner by 10% of that size.
//!
//! The transform is pure apart from writing the destination file: the source
//! is never modified and identical inputs give identical output.

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageError, ImageFormat, RgbaImage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Post-processing errors
///
/// Any of these leaves the source capture in the landing zone.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Overlay asset absent at the configured path
    #[error("Watermark overlay not found: {0}")]
    OverlayMissing(PathBuf),

    /// Overlay asset present but not a decodable image
    #[error("Watermark overlay {path} is not a valid image: {source}")]
    OverlayDecode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    /// Source bytes are not a recognised image format
    #[error("Unsupported image format for {0}")]
    UnsupportedFormat(PathBuf),

    /// Source could not be decoded
    #[error("Cannot decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    /// Stamped image could not be encoded
    #[error("Cannot encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    /// Reading the source or writing the destination failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where and how large the overlay lands on a given source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Longer side of the scaled overlay: `floor(0.2 * source_width)`
    pub size: u32,
    /// Inset from the bottom-right corner: `floor(0.1 * size)`
    pub margin: u32,
    /// Scaled overlay width
    pub width: u32,
    /// Scaled overlay height
    pub height: u32,
    /// Top-left x: `source_width - size - margin`
    pub x: i64,
    /// Top-left y: `source_height - size - margin` (negative on very wide sources)
    pub y: i64,
}

/// Compute overlay placement for a source and overlay of the given dimensions
///
/// Returns `None` when the source is too narrow for a visible overlay
/// (width under 5 px) or the overlay is empty.
pub fn placement(
    source_width: u32,
    source_height: u32,
    overlay_width: u32,
    overlay_height: u32,
) -> Option<Placement> {
    let size = source_width / 5;
    if size == 0 || overlay_width == 0 || overlay_height == 0 {
        return None;
    }

    let (width, height) = if overlay_width >= overlay_height {
        (size, scale_side(overlay_height, size, overlay_width))
    } else {
        (scale_side(overlay_width, size, overlay_height), size)
    };

    let margin = size / 10;
    let inset = i64::from(size) + i64::from(margin);

    Some(Placement {
        size,
        margin,
        width,
        height,
        x: i64::from(source_width) - inset,
        y: i64::from(source_height) - inset,
    })
}

/// `side * target / longest`, rounded, never below 1
fn scale_side(side: u32, target: u32, longest: u32) -> u32 {
    let scaled = (u64::from(side) * u64::from(target) + u64::from(longest) / 2) / u64::from(longest);
    scaled.clamp(1, u64::from(target)) as u32
}

/// Overlay compositor loaded once at startup
#[derive(Clone)]
pub struct Watermarker {
    overlay: RgbaImage,
}

impl Watermarker {
    /// Load the overlay asset
    ///
    /// A missing or unreadable asset is a startup configuration error.
    pub fn load(path: &Path) -> Result<Self, ProcessingError> {
        if !path.is_file() {
            return Err(ProcessingError::OverlayMissing(path.to_path_buf()));
        }
        let overlay = image::open(path).map_err(|source| ProcessingError::OverlayDecode {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            "Loaded watermark overlay {} ({}x{})",
            path.display(),
            overlay.width(),
            overlay.height()
        );
        Ok(Self::from_image(overlay.to_rgba8()))
    }

    pub fn from_image(overlay: RgbaImage) -> Self {
        Self { overlay }
    }

    /// Composite the overlay onto `source`
    pub fn stamp(&self, source: &DynamicImage) -> (RgbaImage, Option<Placement>) {
        let mut canvas = source.to_rgba8();
        let placement = placement(
            canvas.width(),
            canvas.height(),
            self.overlay.width(),
            self.overlay.height(),
        );

        if let Some(p) = placement {
            let scaled = imageops::resize(&self.overlay, p.width, p.height, FilterType::Lanczos3);
            imageops::overlay(&mut canvas, &scaled, p.x, p.y);
        }

        (canvas, placement)
    }

    /// Stamp the image at `source` and write the result to `destination`
    ///
    /// The output keeps the source's encoding format regardless of the
    /// destination's extension. The destination is synced to disk before
    /// returning, so the caller may safely remove the source afterwards.
    pub fn apply(&self, source: &Path, destination: &Path) -> Result<Option<Placement>, ProcessingError> {
        let bytes = std::fs::read(source).map_err(|e| ProcessingError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;
        let format = image::guess_format(&bytes)
            .map_err(|_| ProcessingError::UnsupportedFormat(source.to_path_buf()))?;
        let decoded = image::load_from_memory_with_format(&bytes, format).map_err(|e| {
            ProcessingError::Decode {
                path: source.to_path_buf(),
                source: e,
            }
        })?;

        let (stamped, placement) = self.stamp(&decoded);
        let output = match format {
            // JPEG has no alpha channel
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(stamped).to_rgb8()),
            _ => DynamicImage::ImageRgba8(stamped),
        };

        write_synced(&output, format, destination)?;
        Ok(placement)
    }
}

fn write_synced(image: &DynamicImage, format: ImageFormat, destination: &Path) -> Result<(), ProcessingError> {
    let io_err = |e| ProcessingError::Io {
        path: destination.to_path_buf(),
        source: e,
    };

    let file = File::create(destination).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    image
        .write_to(&mut writer, format)
        .map_err(|e| ProcessingError::Encode {
            path: destination.to_path_buf(),
            source: e,
        })?;
    writer.flush().map_err(io_err)?;
    let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    file.sync_all().map_err(io_err)
}
