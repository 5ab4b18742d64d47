// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Interactive crop editor — a platform-independent quad editor driven by
// pointer events in screen space.
//
// The editor holds the image at full resolution and keeps the quad in
// image-pixel space. Screen coordinates are divided by the display scale
// before hit-testing, so a rendering layer only has to forward raw pointer
// positions and draw what `render` returns.

use std::sync::Arc;

use image::{Rgba, RgbaImage, imageops};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use pagescan_core::error::{Result, ScanError};
use pagescan_core::geometry::{default_quad, fit_scale, nearest_corner, quad_contains, scale_quad};
use pagescan_core::{Corner, Point, Quad};
use tracing::debug;

/// Outline and idle handle colour.
const OUTLINE: Rgba<u8> = Rgba([0x39, 0xFF, 0x14, 0xFF]);
/// Handle colour for the corner being dragged.
const SELECTED: Rgba<u8> = Rgba([0xFF, 0x39, 0x39, 0xFF]);
/// Handle edge length in display pixels.
const HANDLE_SIZE: u32 = 20;

/// What the editor reports when the user leaves it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropEvent {
    Confirmed(Quad),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct CropEditor {
    image: Option<Arc<RgbaImage>>,
    quad: Quad,
    viewport: Option<(f64, f64)>,
    scale: f64,
    selected: Option<Corner>,
    tap_radius_px: f64,
    overlay_alpha: f32,
}

impl CropEditor {
    pub fn new(tap_radius_px: f64, overlay_alpha: f32) -> Self {
        Self {
            image: None,
            quad: Quad::from_rect(0.0, 0.0, 0.0, 0.0),
            viewport: None,
            scale: 1.0,
            selected: None,
            tap_radius_px,
            overlay_alpha: overlay_alpha.clamp(0.0, 1.0),
        }
    }

    // -- Contents -------------------------------------------------------------

    /// Load an image, seeding the quad from `quad` or the default 80% inset.
    pub fn set_image(&mut self, image: Arc<RgbaImage>, quad: Option<Quad>) {
        let (w, h) = image.dimensions();
        self.quad = quad.unwrap_or_else(|| default_quad(w, h));
        self.image = Some(image);
        self.selected = None;
        self.update_scale();
        debug!(width = w, height = h, scale = self.scale, seeded = quad.is_some(), "Crop editor loaded");
    }

    /// Drop the image and any selection.
    pub fn clear(&mut self) {
        self.image = None;
        self.selected = None;
    }

    pub fn image(&self) -> Option<&Arc<RgbaImage>> {
        self.image.as_ref()
    }

    pub fn set_quad(&mut self, quad: Quad) {
        self.quad = quad;
        self.selected = None;
    }

    pub fn quad(&self) -> Quad {
        self.quad
    }

    // -- Display scale --------------------------------------------------------

    /// Available drawing area in screen pixels.
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Some((width, height));
        self.update_scale();
    }

    /// Screen pixels per image pixel, never above 1.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    fn update_scale(&mut self) {
        self.scale = match (&self.image, self.viewport) {
            (Some(image), Some((vw, vh))) => fit_scale(vw, vh, image.width(), image.height()),
            _ => 1.0,
        };
    }

    pub fn to_image_space(&self, screen: Point) -> Point {
        screen.scaled(1.0 / self.scale)
    }

    // -- Pointer events -------------------------------------------------------

    pub fn selected(&self) -> Option<Corner> {
        self.selected
    }

    /// Select the nearest corner if it lies within the tap radius.
    pub fn pointer_down(&mut self, screen: Point) -> Option<Corner> {
        if self.image.is_none() {
            return None;
        }
        let point = self.to_image_space(screen);
        let (corner, distance) = nearest_corner(&self.quad, &point);
        let radius = self.tap_radius_px / self.scale;
        self.selected = (distance < radius).then_some(corner);
        self.selected
    }

    /// Move the selected corner to the pointer, clamped to the image bounds.
    /// `false` when nothing is selected.
    pub fn pointer_move(&mut self, screen: Point) -> bool {
        let (Some(corner), Some(image)) = (self.selected, self.image.as_ref()) else {
            return false;
        };
        let point = self.to_image_space(screen);
        let clamped = Point::new(
            point.x.clamp(0.0, image.width() as f64),
            point.y.clamp(0.0, image.height() as f64),
        );
        self.quad.set_corner(corner, clamped);
        true
    }

    pub fn pointer_up(&mut self) {
        self.selected = None;
    }

    pub fn confirm(&mut self) -> CropEvent {
        self.selected = None;
        CropEvent::Confirmed(self.quad)
    }

    pub fn cancel(&mut self) -> CropEvent {
        self.selected = None;
        CropEvent::Cancelled
    }

    // -- Rendering ------------------------------------------------------------

    /// Draw the editor at display scale: the image darkened outside the
    /// quad, the quad outline, and a handle on each corner.
    pub fn render(&self) -> Result<RgbaImage> {
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| ScanError::ImageError("crop editor has no image".into()))?;

        let mut canvas = if self.scale < 1.0 {
            let w = ((image.width() as f64 * self.scale).round() as u32).max(1);
            let h = ((image.height() as f64 * self.scale).round() as u32).max(1);
            imageops::resize(image.as_ref(), w, h, imageops::FilterType::Triangle)
        } else {
            image.as_ref().clone()
        };

        let quad = scale_quad(&self.quad, self.scale);
        let keep = 1.0 - self.overlay_alpha;
        for (x, y, pixel) in canvas.enumerate_pixels_mut() {
            let centre = Point::new(x as f64 + 0.5, y as f64 + 0.5);
            if !quad_contains(&quad, &centre) {
                for channel in &mut pixel.0[..3] {
                    *channel = (*channel as f32 * keep).round() as u8;
                }
            }
        }

        let pts = quad.to_f32_pairs();
        for i in 0..pts.len() {
            let (a, b) = (pts[i], pts[(i + 1) % pts.len()]);
            draw_line_segment_mut(&mut canvas, a, b, OUTLINE);
            draw_line_segment_mut(&mut canvas, (a.0 + 1.0, a.1 + 1.0), (b.0 + 1.0, b.1 + 1.0), OUTLINE);
        }

        let half = (HANDLE_SIZE / 2) as i32;
        for corner in Corner::ALL {
            let p = quad.corner(corner);
            let colour = if self.selected == Some(corner) { SELECTED } else { OUTLINE };
            let rect = Rect::at(p.x.round() as i32 - half, p.y.round() as i32 - half)
                .of_size(HANDLE_SIZE, HANDLE_SIZE);
            draw_filled_rect_mut(&mut canvas, rect, colour);
        }
        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor_with(w: u32, h: u32) -> CropEditor {
        let mut editor = CropEditor::new(40.0, 0.5);
        editor.set_image(
            Arc::new(RgbaImage::from_pixel(w, h, Rgba([200, 200, 200, 255]))),
            None,
        );
        editor
    }

    #[test]
    fn default_quad_is_central_eighty_percent() {
        let editor = editor_with(1000, 1000);
        assert_eq!(
            editor.quad().points(),
            &[
                Point::new(100.0, 100.0),
                Point::new(900.0, 100.0),
                Point::new(900.0, 900.0),
                Point::new(100.0, 900.0),
            ]
        );
    }

    #[test]
    fn supplied_quad_is_used() {
        let mut editor = CropEditor::new(40.0, 0.5);
        let quad = Quad::from_rect(5.0, 5.0, 50.0, 50.0);
        editor.set_image(Arc::new(RgbaImage::new(100, 100)), Some(quad));
        assert_eq!(editor.quad(), quad);
    }

    #[test]
    fn viewport_scale_never_upscales() {
        let mut editor = editor_with(1000, 500);
        editor.set_viewport(500.0, 500.0);
        assert!((editor.scale() - 0.5).abs() < 1e-9);
        editor.set_viewport(4000.0, 4000.0);
        assert_eq!(editor.scale(), 1.0);
    }

    #[test]
    fn tap_selects_nearest_corner_in_image_space() {
        let mut editor = editor_with(1000, 1000);
        editor.set_viewport(500.0, 500.0);
        // Screen (52, 52) is image (104, 104), next to the top-left corner.
        assert_eq!(editor.pointer_down(Point::new(52.0, 52.0)), Some(Corner::TopLeft));
        editor.pointer_up();
        // Screen (250, 250) is the image centre, far from every corner.
        assert_eq!(editor.pointer_down(Point::new(250.0, 250.0)), None);
    }

    #[test]
    fn tap_radius_scales_with_display() {
        let mut editor = editor_with(1000, 1000);
        editor.set_viewport(500.0, 500.0);
        // 35 screen px away: inside the 40 px radius (80 image px).
        assert_eq!(editor.pointer_down(Point::new(85.0, 50.0)), Some(Corner::TopLeft));
        // 45 screen px away: outside.
        assert_eq!(editor.pointer_down(Point::new(95.0, 50.0)), None);
    }

    #[test]
    fn drag_moves_only_the_selected_corner() {
        let mut editor = editor_with(1000, 1000);
        let before = editor.quad();
        editor.pointer_down(Point::new(905.0, 905.0));
        assert_eq!(editor.selected(), Some(Corner::BottomRight));
        assert!(editor.pointer_move(Point::new(950.0, 970.0)));
        editor.pointer_up();
        assert!(!editor.pointer_move(Point::new(0.0, 0.0)));

        let after = editor.quad();
        assert_eq!(after.corner(Corner::BottomRight), Point::new(950.0, 970.0));
        for corner in [Corner::TopLeft, Corner::TopRight, Corner::BottomLeft] {
            assert_eq!(after.corner(corner), before.corner(corner));
        }
    }

    #[test]
    fn drag_stops_at_the_image_edge() {
        let mut editor = editor_with(1000, 800);
        editor.set_viewport(500.0, 400.0);
        assert_eq!(editor.pointer_down(Point::new(50.0, 40.0)), Some(Corner::TopLeft));
        editor.pointer_move(Point::new(-300.0, -20.0));
        assert_eq!(editor.quad().corner(Corner::TopLeft), Point::new(0.0, 0.0));

        editor.pointer_up();
        editor.pointer_down(Point::new(450.0, 360.0));
        editor.pointer_move(Point::new(9000.0, 390.0));
        assert_eq!(editor.quad().corner(Corner::BottomRight), Point::new(1000.0, 780.0));
    }

    #[test]
    fn confirm_emits_quad_and_cancel_emits_none() {
        let mut editor = editor_with(100, 100);
        let quad = editor.quad();
        assert_eq!(editor.confirm(), CropEvent::Confirmed(quad));
        assert_eq!(editor.cancel(), CropEvent::Cancelled);
    }

    #[test]
    fn render_darkens_outside_and_marks_corners() {
        let mut editor = editor_with(200, 100);
        let canvas = editor.render().unwrap();
        assert_eq!(canvas.dimensions(), (200, 100));
        assert_eq!(canvas.get_pixel(100, 50).0, [200, 200, 200, 255]);
        assert_eq!(canvas.get_pixel(199, 50).0, [100, 100, 100, 255]);
        assert_eq!(*canvas.get_pixel(20, 10), OUTLINE);

        editor.pointer_down(Point::new(20.0, 10.0));
        let canvas = editor.render().unwrap();
        assert_eq!(*canvas.get_pixel(20, 10), SELECTED);
        assert_eq!(*canvas.get_pixel(180, 90), OUTLINE);
    }

    #[test]
    fn render_uses_display_scale() {
        let mut editor = editor_with(400, 200);
        editor.set_viewport(200.0, 200.0);
        assert_eq!(editor.render().unwrap().dimensions(), (200, 100));
    }

    #[test]
    fn render_without_image_fails() {
        assert!(CropEditor::new(40.0, 0.5).render().is_err());
    }
}
