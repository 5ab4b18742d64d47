// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification — map a quad onto an upright rectangle.
//
// Corner convention: quad index 0 → (0, 0), 1 → (w, 0), 2 → (w, h),
// 3 → (0, h).

use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use pagescan_core::Quad;
use pagescan_core::error::{Result, ScanError};
use pagescan_core::geometry::quad_area;
use tracing::{debug, instrument};

/// Quads smaller than this (in square pixels) cannot be rectified.
const MIN_QUAD_AREA: f64 = 1.0;

/// A 4-point-to-rectangle projective warp.
pub trait PerspectiveTransform: Send + Sync {
    /// Warp the region bounded by `quad` into an image of `output` size.
    fn rectify(&self, image: &RgbaImage, quad: &Quad, output: (u32, u32)) -> Result<RgbaImage>;
}

/// [`PerspectiveTransform`] backed by `imageproc`'s planar homography.
#[derive(Debug, Clone, Copy)]
pub struct ProjectiveRectifier {
    interpolation: Interpolation,
    fill: Rgba<u8>,
}

impl Default for ProjectiveRectifier {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::Bilinear,
            fill: Rgba([255, 255, 255, 255]),
        }
    }
}

impl ProjectiveRectifier {
    /// Use nearest-neighbour sampling. Faster, for previews.
    pub fn nearest() -> Self {
        Self {
            interpolation: Interpolation::Nearest,
            ..Self::default()
        }
    }
}

impl PerspectiveTransform for ProjectiveRectifier {
    #[instrument(skip(self, image, quad), fields(out_w = output.0, out_h = output.1))]
    fn rectify(&self, image: &RgbaImage, quad: &Quad, output: (u32, u32)) -> Result<RgbaImage> {
        let (out_w, out_h) = output;
        if out_w == 0 || out_h == 0 {
            return Err(ScanError::NormalizationFailure(format!(
                "empty output size {out_w}x{out_h}"
            )));
        }

        let area = quad_area(quad);
        if !area.is_finite() || area < MIN_QUAD_AREA {
            return Err(ScanError::NormalizationFailure(format!(
                "quad is degenerate (area {area:.2})"
            )));
        }

        let src = quad.to_f32_pairs();
        let dest: [(f32, f32); 4] = [
            (0.0, 0.0),
            (out_w as f32, 0.0),
            (out_w as f32, out_h as f32),
            (0.0, out_h as f32),
        ];

        let projection = Projection::from_control_points(src, dest).ok_or_else(|| {
            ScanError::NormalizationFailure("failed to compute projective transform".into())
        })?;

        let mut out = RgbaImage::new(out_w, out_h);
        warp_into(image, &projection, self.interpolation, self.fill, &mut out);

        debug!(out_w, out_h, "Perspective warp applied");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagescan_core::Point;

    /// Left half red, right half blue.
    fn split_image() -> RgbaImage {
        RgbaImage::from_fn(100, 100, |x, _| {
            if x < 50 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        })
    }

    #[test]
    fn axis_aligned_quad_acts_as_crop() {
        let quad = Quad::from_rect(10.0, 10.0, 90.0, 90.0);
        let out = ProjectiveRectifier::default()
            .rectify(&split_image(), &quad, (80, 80))
            .unwrap();
        assert_eq!(out.dimensions(), (80, 80));
        assert_eq!(out.get_pixel(10, 40), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(70, 40), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn corner_order_controls_orientation() {
        // Start the quad at the top-right corner: the output is mirrored.
        let quad = Quad::new([
            Point::new(90.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 90.0),
            Point::new(90.0, 90.0),
        ]);
        let out = ProjectiveRectifier::nearest()
            .rectify(&split_image(), &quad, (80, 80))
            .unwrap();
        assert_eq!(out.get_pixel(10, 40), &Rgba([0, 0, 255, 255]));
        assert_eq!(out.get_pixel(70, 40), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn degenerate_quad_fails() {
        let collapsed = Quad::new([Point::new(5.0, 5.0); 4]);
        let err = ProjectiveRectifier::default()
            .rectify(&split_image(), &collapsed, (10, 10))
            .unwrap_err();
        assert!(matches!(err, ScanError::NormalizationFailure(_)));
    }

    #[test]
    fn zero_output_fails() {
        let quad = Quad::from_rect(0.0, 0.0, 50.0, 50.0);
        assert!(
            ProjectiveRectifier::default()
                .rectify(&split_image(), &quad, (0, 10))
                .is_err()
        );
    }
}
