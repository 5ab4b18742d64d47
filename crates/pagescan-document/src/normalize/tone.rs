// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-pixel tone mapping applied after rectification.

use image::{Rgba, RgbaImage};
use pagescan_core::FilterMode;

/// Luma weights for the grayscale conversion, in hundredths.
const WEIGHT_R: u32 = 30;
const WEIGHT_G: u32 = 59;
const WEIGHT_B: u32 = 11;

/// Binarization midpoint: luma at or above this becomes white.
pub const BW_THRESHOLD: u8 = 128;

/// Unrounded weighted luma, scaled by 100.
fn luma_centi(pixel: &Rgba<u8>) -> u32 {
    let [r, g, b, _] = pixel.0;
    WEIGHT_R * r as u32 + WEIGHT_G * g as u32 + WEIGHT_B * b as u32
}

/// Weighted luma of one pixel, rounded to the nearest integer.
pub fn luma(pixel: &Rgba<u8>) -> u8 {
    ((luma_centi(pixel) + 50) / 100).min(255) as u8
}

/// Apply `mode` in place. Alpha is left untouched.
pub fn apply_filter(image: &mut RgbaImage, mode: FilterMode) {
    match mode {
        FilterMode::Color => {}
        FilterMode::Grayscale => {
            for pixel in image.pixels_mut() {
                let v = luma(pixel);
                pixel.0 = [v, v, v, pixel.0[3]];
            }
        }
        FilterMode::BlackAndWhite => {
            for pixel in image.pixels_mut() {
                let v = if luma_centi(pixel) >= BW_THRESHOLD as u32 * 100 { 255 } else { 0 };
                pixel.0 = [v, v, v, pixel.0[3]];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> RgbaImage {
        RgbaImage::from_fn(64, 16, |x, y| {
            Rgba([(x * 4) as u8, (y * 16) as u8, ((x + y) * 3) as u8, 200])
        })
    }

    #[test]
    fn color_is_identity() {
        let original = gradient();
        let mut img = original.clone();
        apply_filter(&mut img, FilterMode::Color);
        assert_eq!(img, original);
    }

    #[test]
    fn grayscale_uses_weighted_luma() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([100, 200, 60, 255]));
        apply_filter(&mut img, FilterMode::Grayscale);
        // 30 + 118 + 6.6 = 154.6
        assert_eq!(img.get_pixel(0, 0), &Rgba([155, 155, 155, 255]));
    }

    #[test]
    fn black_and_white_is_strictly_binary() {
        let mut img = gradient();
        apply_filter(&mut img, FilterMode::BlackAndWhite);
        for pixel in img.pixels() {
            let [r, g, b, a] = pixel.0;
            assert!(r == 0 || r == 255);
            assert_eq!(r, g);
            assert_eq!(g, b);
            assert_eq!(a, 200);
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut img = RgbaImage::from_vec(
            2,
            1,
            vec![128, 128, 128, 255, 127, 127, 127, 255],
        )
        .unwrap();
        apply_filter(&mut img, FilterMode::BlackAndWhite);
        assert_eq!(img.get_pixel(0, 0).0[0], 255);
        assert_eq!(img.get_pixel(1, 0).0[0], 0);
    }

    #[test]
    fn threshold_compares_unrounded_luma() {
        // 38.4 + 75.52 + 13.64 = 127.56: rounds to 128 but stays below it.
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([128, 128, 124, 255]));
        apply_filter(&mut img, FilterMode::BlackAndWhite);
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
    }
}
