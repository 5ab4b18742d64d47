// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decode, quarter-turn rotation, and capped downscaling.
// Operates on in-memory images using the `image` crate.

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use pagescan_core::Rotation;
use pagescan_core::error::{Result, ScanError};
use tracing::{debug, info, instrument};

/// Image processing pipeline operating on a single in-memory image.
///
/// Each transformation consumes `self` and returns a new `ImageProcessor`,
/// enabling method chaining.
///
/// ```ignore
/// let (frame, scale) = ImageProcessor::from_rgba(frame).downscale_to(1080);
/// let page = frame.rotate(Rotation::Deg90).into_rgba();
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let img = image::open(path.as_ref()).map_err(|err| {
            ScanError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    pub fn from_rgba(image: RgbaImage) -> Self {
        Self {
            image: DynamicImage::ImageRgba8(image),
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Consume the processor and return 8-bit RGBA pixels.
    pub fn into_rgba(self) -> RgbaImage {
        match self.image {
            DynamicImage::ImageRgba8(rgba) => rgba,
            other => other.to_rgba8(),
        }
    }

    // -- Transformations ------------------------------------------------------

    /// Apply a cumulative clockwise quarter-turn rotation. Lossless.
    #[instrument(skip(self), fields(degrees = rotation.degrees()))]
    pub fn rotate(self, rotation: Rotation) -> Self {
        let image = match rotation {
            Rotation::Deg0 => return self,
            Rotation::Deg90 => self.image.rotate90(),
            Rotation::Deg180 => self.image.rotate180(),
            Rotation::Deg270 => self.image.rotate270(),
        };
        debug!(
            new_w = image.width(),
            new_h = image.height(),
            "Rotation applied"
        );
        Self { image }
    }

    /// Shrink so the longer side is at most `max_side`, preserving aspect
    /// ratio. Never upscales.
    ///
    /// Returns the processor and `scale = max_side / original_longer_side`
    /// (1.0 when no resize was needed). Dividing a coordinate found in the
    /// downscaled image by `scale` maps it back to the original.
    #[instrument(skip(self))]
    pub fn downscale_to(self, max_side: u32) -> (Self, f64) {
        let longer = self.image.width().max(self.image.height());
        if longer <= max_side || max_side == 0 {
            return (self, 1.0);
        }
        let scale = max_side as f64 / longer as f64;
        let resized = self.image.resize(max_side, max_side, FilterType::Triangle);
        debug!(
            from_w = self.image.width(),
            from_h = self.image.height(),
            new_w = resized.width(),
            new_h = resized.height(),
            scale,
            "Downscaled"
        );
        (Self { image: resized }, scale)
    }
}
