// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Normalization & filter engine — rectify a quad and tone-map the result.
//
// Full-resolution output is produced on demand per mode. Mode-switch previews
// come from a reduced copy of the source with the quad scaled to match, so a
// preview never costs a full-resolution warp.

use std::sync::Arc;

use image::RgbaImage;
use pagescan_core::error::Result;
use pagescan_core::geometry::{rectified_size, scale_quad};
use pagescan_core::{FilterMode, Quad};
use tracing::{debug, info, instrument};

use super::rectify::{PerspectiveTransform, ProjectiveRectifier};
use super::tone::apply_filter;
use crate::image::processor::ImageProcessor;

/// Reduced-resolution rectified previews, one per tone mode.
#[derive(Debug, Clone)]
pub struct FilterPreviews {
    color: RgbaImage,
    grayscale: RgbaImage,
    black_and_white: RgbaImage,
}

impl FilterPreviews {
    pub fn get(&self, mode: FilterMode) -> &RgbaImage {
        match mode {
            FilterMode::Color => &self.color,
            FilterMode::Grayscale => &self.grayscale,
            FilterMode::BlackAndWhite => &self.black_and_white,
        }
    }
}

/// Produces perspective-corrected, tone-mapped page images.
#[derive(Clone)]
pub struct NormalizationEngine {
    rectifier: Arc<dyn PerspectiveTransform>,
    preview_rectifier: Arc<dyn PerspectiveTransform>,
    thumbnail_max_side: u32,
}

impl NormalizationEngine {
    pub fn new(thumbnail_max_side: u32) -> Self {
        Self {
            rectifier: Arc::new(ProjectiveRectifier::default()),
            preview_rectifier: Arc::new(ProjectiveRectifier::nearest()),
            thumbnail_max_side,
        }
    }

    /// Use a different perspective transform for both full-size output and
    /// previews.
    pub fn with_transform(mut self, transform: Arc<dyn PerspectiveTransform>) -> Self {
        self.rectifier = Arc::clone(&transform);
        self.preview_rectifier = transform;
        self
    }

    pub fn thumbnail_max_side(&self) -> u32 {
        self.thumbnail_max_side
    }

    /// Rectify `quad` out of `image` and apply `mode`.
    ///
    /// The output size follows the quad's edge lengths. Fails with
    /// `NormalizationFailure` when the quad cannot be rectified.
    #[instrument(skip(self, image, quad), fields(width = image.width(), height = image.height()))]
    pub fn normalize(&self, image: &RgbaImage, quad: &Quad, mode: FilterMode) -> Result<RgbaImage> {
        let size = rectified_size(quad);
        let mut out = self.rectifier.rectify(image, quad, size)?;
        apply_filter(&mut out, mode);
        info!(out_w = size.0, out_h = size.1, ?mode, "Page normalized");
        Ok(out)
    }

    /// Apply `mode` to an already rectified colour image.
    pub fn retone(&self, color: &RgbaImage, mode: FilterMode) -> RgbaImage {
        let mut out = color.clone();
        apply_filter(&mut out, mode);
        out
    }

    /// Rectified thumbnails for every tone mode.
    ///
    /// The source is downscaled so its longer side is at most
    /// `thumbnail_max_side` and the quad is scaled by the same ratio.
    #[instrument(skip_all, fields(max_side = self.thumbnail_max_side))]
    pub fn previews(&self, image: &RgbaImage, quad: &Quad) -> Result<FilterPreviews> {
        let (small, scale) =
            ImageProcessor::from_rgba(image.clone()).downscale_to(self.thumbnail_max_side);
        let small = small.into_rgba();
        let small_quad = scale_quad(quad, scale);

        let size = rectified_size(&small_quad);
        let size = (
            size.0.min(self.thumbnail_max_side),
            size.1.min(self.thumbnail_max_side),
        );
        let color = self.preview_rectifier.rectify(&small, &small_quad, size)?;
        let grayscale = self.retone(&color, FilterMode::Grayscale);
        let black_and_white = self.retone(&color, FilterMode::BlackAndWhite);

        debug!(thumb_w = size.0, thumb_h = size.1, scale, "Filter previews rendered");
        Ok(FilterPreviews {
            color,
            grayscale,
            black_and_white,
        })
    }
}
