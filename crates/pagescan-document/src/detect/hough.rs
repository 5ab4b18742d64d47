// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hough-line document detector.
//
// Pipeline: grayscale, Gaussian blur, Canny edges, Hough lines, split into
// near-horizontal and near-vertical sets, take the outermost line on each
// side, and intersect them into a quad.

use image::RgbaImage;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use pagescan_core::error::Result;
use pagescan_core::geometry::quad_area;
use pagescan_core::{DetectionResult, Point, Quad};
use tracing::{debug, instrument};

use super::EdgeDetector;

/// Tunables for [`HoughEdgeDetector`].
#[derive(Debug, Clone, Copy)]
pub struct HoughOptions {
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Vote threshold as a fraction of the image diagonal.
    pub vote_fraction: f64,
    pub min_votes: u32,
    pub suppression_radius: u32,
    /// Smallest accepted quad, as a fraction of the frame area.
    pub min_area_fraction: f64,
}

impl Default for HoughOptions {
    fn default() -> Self {
        Self {
            blur_sigma: 2.0,
            canny_low: 50.0,
            canny_high: 150.0,
            vote_fraction: 0.25,
            min_votes: 80,
            suppression_radius: 8,
            min_area_fraction: 0.10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HoughEdgeDetector {
    options: HoughOptions,
}

impl HoughEdgeDetector {
    pub fn new(options: HoughOptions) -> Self {
        Self { options }
    }
}

impl EdgeDetector for HoughEdgeDetector {
    #[instrument(skip_all, fields(width = frame.width(), height = frame.height()))]
    fn detect(&self, frame: &RgbaImage) -> Result<Vec<DetectionResult>> {
        let (w, h) = frame.dimensions();
        if w < 8 || h < 8 {
            return Ok(Vec::new());
        }
        let opts = &self.options;

        let gray = image::DynamicImage::ImageRgba8(frame.clone()).to_luma8();
        let blurred = gaussian_blur_f32(&gray, opts.blur_sigma);
        let edges = canny(&blurred, opts.canny_low, opts.canny_high);

        let diagonal = ((w as f64).powi(2) + (h as f64).powi(2)).sqrt();
        let vote_threshold = ((diagonal * opts.vote_fraction) as u32).max(opts.min_votes);
        let lines = detect_lines(
            &edges,
            LineDetectionOptions {
                vote_threshold,
                suppression_radius: opts.suppression_radius,
            },
        );
        debug!(line_count = lines.len(), vote_threshold, "Hough lines detected");

        let (horizontal, vertical) = classify_lines(&lines);
        let centre = (w as f64 / 2.0, h as f64 / 2.0);

        let Some((top, bottom)) = outermost(&horizontal, |l| y_at(l, centre.0)) else {
            debug!(horizontal = horizontal.len(), "No horizontal edge pair");
            return Ok(Vec::new());
        };
        let Some((left, right)) = outermost(&vertical, |l| x_at(l, centre.1)) else {
            debug!(vertical = vertical.len(), "No vertical edge pair");
            return Ok(Vec::new());
        };

        let corners = [
            intersect_polar_lines(&top, &left),
            intersect_polar_lines(&top, &right),
            intersect_polar_lines(&bottom, &right),
            intersect_polar_lines(&bottom, &left),
        ];
        let mut points = [Point::default(); 4];
        for (slot, corner) in points.iter_mut().zip(corners) {
            let Some((x, y)) = corner else {
                return Ok(Vec::new());
            };
            *slot = Point::new(x.clamp(0.0, w as f64), y.clamp(0.0, h as f64));
        }
        let quad = Quad::new(points);

        let area = quad_area(&quad);
        let min_area = w as f64 * h as f64 * opts.min_area_fraction;
        if area < min_area {
            debug!(area, min_area, "Detected quadrilateral too small");
            return Ok(Vec::new());
        }

        debug!(?quad, "Document quad found");
        Ok(vec![DetectionResult::new(quad)])
    }

    fn name(&self) -> &'static str {
        "hough"
    }
}

// -- Line helpers -------------------------------------------------------------

/// Split lines into near-horizontal and near-vertical sets.
///
/// `angle_in_degrees` is the direction of the line's normal: about 90 for a
/// horizontal line, about 0 or 180 for a vertical one. Lines more than 30°
/// off either axis are dropped.
fn classify_lines(lines: &[PolarLine]) -> (Vec<PolarLine>, Vec<PolarLine>) {
    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();
    for line in lines {
        let angle = line.angle_in_degrees;
        if (60..=120).contains(&angle) {
            horizontal.push(*line);
        } else if angle <= 30 || angle >= 150 {
            vertical.push(*line);
        }
    }
    (horizontal, vertical)
}

/// The lines with the smallest and largest `position`, if they are distinct.
fn outermost(
    lines: &[PolarLine],
    position: impl Fn(&PolarLine) -> Option<f64>,
) -> Option<(PolarLine, PolarLine)> {
    let mut min: Option<(f64, PolarLine)> = None;
    let mut max: Option<(f64, PolarLine)> = None;
    for line in lines {
        let Some(p) = position(line) else { continue };
        if min.is_none_or(|(m, _)| p < m) {
            min = Some((p, *line));
        }
        if max.is_none_or(|(m, _)| p > m) {
            max = Some((p, *line));
        }
    }
    match (min, max) {
        (Some((lo, a)), Some((hi, b))) if hi - lo > 1.0 => Some((a, b)),
        _ => None,
    }
}

fn normal(line: &PolarLine) -> (f64, f64) {
    let theta = (line.angle_in_degrees as f64).to_radians();
    (theta.cos(), theta.sin())
}

/// y where a (mostly horizontal) line crosses the vertical `x`.
fn y_at(line: &PolarLine, x: f64) -> Option<f64> {
    let (c, s) = normal(line);
    (s.abs() > 1e-6).then(|| (line.r as f64 - x * c) / s)
}

/// x where a (mostly vertical) line crosses the horizontal `y`.
fn x_at(line: &PolarLine, y: f64) -> Option<f64> {
    let (c, s) = normal(line);
    (c.abs() > 1e-6).then(|| (line.r as f64 - y * s) / c)
}

/// Intersection of two lines `x·cosθ + y·sinθ = r`. `None` if (nearly)
/// parallel.
fn intersect_polar_lines(a: &PolarLine, b: &PolarLine) -> Option<(f64, f64)> {
    let (cos_a, sin_a) = normal(a);
    let (cos_b, sin_b) = normal(b);

    let denom = cos_a * sin_b - sin_a * cos_b;
    if denom.abs() < 1e-6 {
        return None;
    }

    let (r_a, r_b) = (a.r as f64, b.r as f64);
    let x = (r_a * sin_b - r_b * sin_a) / denom;
    let y = (r_b * cos_a - r_a * cos_b) / denom;
    Some((x, y))
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn blank_frame_has_no_document() {
        let frame = RgbaImage::from_pixel(200, 300, Rgba([200, 200, 200, 255]));
        assert!(HoughEdgeDetector::default().detect(&frame).unwrap().is_empty());
    }

    #[test]
    fn tiny_frame_is_skipped() {
        let frame = RgbaImage::new(4, 4);
        assert!(HoughEdgeDetector::default().detect(&frame).unwrap().is_empty());
    }

    #[test]
    fn finds_bright_page_on_dark_table() {
        let (w, h) = (400u32, 500u32);
        let frame = RgbaImage::from_fn(w, h, |x, y| {
            if (50..350).contains(&x) && (60..440).contains(&y) {
                Rgba([240, 240, 240, 255])
            } else {
                Rgba([30, 30, 30, 255])
            }
        });
        let results = HoughEdgeDetector::default().detect(&frame).unwrap();
        assert_eq!(results.len(), 1);

        let expected = [(50.0, 60.0), (350.0, 60.0), (350.0, 440.0), (50.0, 440.0)];
        for (p, (ex, ey)) in results[0].quad.points().iter().zip(expected) {
            assert!(
                (p.x - ex).abs() < 10.0 && (p.y - ey).abs() < 10.0,
                "corner {p:?} far from ({ex}, {ey})"
            );
        }
    }

    #[test]
    fn perpendicular_lines_intersect() {
        // y = 100 and x = 50.
        let h = PolarLine {
            r: 100.0,
            angle_in_degrees: 90,
        };
        let v = PolarLine {
            r: 50.0,
            angle_in_degrees: 0,
        };
        let (x, y) = intersect_polar_lines(&h, &v).unwrap();
        assert!((x - 50.0).abs() < 1e-6 && (y - 100.0).abs() < 1e-6);
    }

    #[test]
    fn parallel_lines_do_not_intersect() {
        let a = PolarLine {
            r: 50.0,
            angle_in_degrees: 0,
        };
        let b = PolarLine {
            r: 100.0,
            angle_in_degrees: 0,
        };
        assert!(intersect_polar_lines(&a, &b).is_none());
    }

    #[test]
    fn classification_follows_normal_angle() {
        let lines = [
            PolarLine { r: 10.0, angle_in_degrees: 90 },
            PolarLine { r: 20.0, angle_in_degrees: 85 },
            PolarLine { r: 30.0, angle_in_degrees: 0 },
            PolarLine { r: 40.0, angle_in_degrees: 175 },
            PolarLine { r: 50.0, angle_in_degrees: 45 },
        ];
        let (horizontal, vertical) = classify_lines(&lines);
        assert_eq!(horizontal.len(), 2);
        assert_eq!(vertical.len(), 2);
    }
}
