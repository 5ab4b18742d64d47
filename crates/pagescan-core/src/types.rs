// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Pagescan scan-to-page pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScanError;

/// A position in image-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Multiply both coordinates by `ratio`.
    pub fn scaled(&self, ratio: f64) -> Self {
        Self {
            x: self.x * ratio,
            y: self.y * ratio,
        }
    }
}

/// Named quad corner. The discriminant is the index into [`Quad::points`].
///
/// The names follow the rectification convention (index 0 maps to the output
/// top-left, 1 to top-right, 2 to bottom-right, 3 to bottom-left); a detector
/// or a user drag may leave the physical corners in any arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft = 0,
    TopRight = 1,
    BottomRight = 2,
    BottomLeft = 3,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Four points approximating a document boundary, in image-pixel coordinates.
///
/// Always exactly four points. Corner `i` keeps its identity across edits: a
/// drag replaces one corner's coordinates and leaves the others untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    points: [Point; 4],
}

impl Quad {
    pub fn new(points: [Point; 4]) -> Self {
        Self { points }
    }

    /// Build a quad from a slice, rejecting anything that is not exactly four
    /// points.
    pub fn from_slice(points: &[Point]) -> Result<Self, ScanError> {
        let points: [Point; 4] = points
            .try_into()
            .map_err(|_| ScanError::InvalidQuad(points.len()))?;
        Ok(Self { points })
    }

    /// Axis-aligned rectangle with corners in top-left, top-right,
    /// bottom-right, bottom-left order.
    pub fn from_rect(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self::new([
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        ])
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.points
    }

    pub fn corner(&self, corner: Corner) -> Point {
        self.points[corner.index()]
    }

    /// Replace one corner, leaving the other three in place.
    pub fn set_corner(&mut self, corner: Corner, point: Point) {
        self.points[corner.index()] = point;
    }

    /// Corner coordinates as `f32` pairs, in index order.
    pub fn to_f32_pairs(&self) -> [(f32, f32); 4] {
        self.points.map(|p| (p.x as f32, p.y as f32))
    }
}

/// One hypothesis returned by an edge detector.
///
/// Detectors return these best-first; the rank is the position in that list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub quad: Quad,
}

impl DetectionResult {
    pub fn new(quad: Quad) -> Self {
        Self { quad }
    }
}

impl From<Quad> for DetectionResult {
    fn from(quad: Quad) -> Self {
        Self { quad }
    }
}

/// Tone mapping applied after rectification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterMode {
    #[default]
    Color,
    Grayscale,
    BlackAndWhite,
}

impl FilterMode {
    pub const ALL: [FilterMode; 3] = [
        FilterMode::BlackAndWhite,
        FilterMode::Grayscale,
        FilterMode::Color,
    ];

    /// Short label shown on the filter picker.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Color => "Color",
            Self::Grayscale => "Grayscale",
            Self::BlackAndWhite => "B&W",
        }
    }
}

impl std::str::FromStr for FilterMode {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "color" | "colour" => Ok(Self::Color),
            "grayscale" | "greyscale" | "gray" | "grey" => Ok(Self::Grayscale),
            "bw" | "b&w" | "blackandwhite" | "black-and-white" | "binary" => {
                Ok(Self::BlackAndWhite)
            }
            other => Err(ScanError::Config(format!("unknown filter mode: {other}"))),
        }
    }
}

/// A single quarter-turn applied by the user on the result screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationStep {
    /// -90°.
    CounterClockwise,
    /// +90°.
    Clockwise,
}

impl RotationStep {
    pub fn degrees(&self) -> i32 {
        match self {
            Self::CounterClockwise => -90,
            Self::Clockwise => 90,
        }
    }
}

/// Cumulative clockwise page rotation, normalized modulo 360.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalize an arbitrary multiple of 90 into `0..360`.
    ///
    /// Returns `None` for angles that are not quarter turns.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        match degrees.rem_euclid(360) {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    pub fn degrees(&self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Apply one quarter-turn.
    pub fn rotated(self, step: RotationStep) -> Self {
        let next = self.degrees() as i32 + step.degrees();
        // Always a multiple of 90, so the lookup cannot miss.
        Self::from_degrees(next).unwrap_or_default()
    }

    /// Whether applying this rotation swaps width and height.
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Opaque platform identifier for a video input device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An enumerated video input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: DeviceId,
    /// Platform label; empty until the user has granted camera permission on
    /// some platforms.
    pub label: Option<String>,
}

impl DeviceInfo {
    /// Label for a device picker, falling back to "Camera N" (1-based).
    pub fn display_label(&self, position: usize) -> String {
        match self.label.as_deref() {
            Some(label) if !label.trim().is_empty() => label.to_string(),
            _ => format!("Camera {}", position + 1),
        }
    }
}

/// Requested capture resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const HD: Resolution = Resolution::new(1280, 720);
    pub const FULL_HD: Resolution = Resolution::new(1920, 1080);
    pub const UHD_4K: Resolution = Resolution::new(3840, 2160);

    /// Presets offered on the setup screen, smallest first.
    pub const PRESETS: [Resolution; 3] = [Self::HD, Self::FULL_HD, Self::UHD_4K];

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn label(&self) -> String {
        match (self.width, self.height) {
            (1280, 720) => "HD (720p)".into(),
            (1920, 1080) => "Full HD (1080p)".into(),
            (3840, 2160) => "4K".into(),
            (w, h) => format!("{w}x{h}"),
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::HD
    }
}

impl std::str::FromStr for Resolution {
    type Err = ScanError;

    /// Parse `"WIDTHxHEIGHT"`, e.g. `"1920x1080"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| ScanError::Config(format!("resolution must be WxH, got {s}")))?;
        let width = w
            .trim()
            .parse()
            .map_err(|_| ScanError::Config(format!("invalid resolution width: {w}")))?;
        let height = h
            .trim()
            .parse()
            .map_err(|_| ScanError::Config(format!("invalid resolution height: {h}")))?;
        Ok(Self::new(width, height))
    }
}

/// Live-stream settings owned by the camera controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub device_id: Option<DeviceId>,
    pub width: u32,
    pub height: u32,
    pub torch_enabled: bool,
}

impl CameraConfig {
    pub fn new(device_id: Option<DeviceId>, resolution: Resolution) -> Self {
        Self {
            device_id,
            width: resolution.width,
            height: resolution.height,
            torch_enabled: false,
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self::new(None, Resolution::default())
    }
}

/// Workflow stage of the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScannerStage {
    /// Choosing a camera, or deciding to scan another page or finish.
    Setup,
    /// Live preview with edge detection.
    Camera,
    /// Manual boundary correction.
    Cropper,
    /// Reviewing the rectified page.
    Result,
}

impl std::fmt::Display for ScannerStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Setup => "setup",
            Self::Camera => "camera",
            Self::Cropper => "cropper",
            Self::Result => "result",
        };
        f.write_str(name)
    }
}

/// Unique identifier for a scanning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an accepted page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub Uuid);

impl PageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Standard paper sizes for the assembled PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Portrait dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_from_slice_requires_four_points() {
        let three = [Point::new(0.0, 0.0); 3];
        assert!(matches!(
            Quad::from_slice(&three),
            Err(ScanError::InvalidQuad(3))
        ));
        let four = [Point::new(1.0, 2.0); 4];
        assert!(Quad::from_slice(&four).is_ok());
    }

    #[test]
    fn set_corner_moves_only_that_corner() {
        let mut quad = Quad::from_rect(0.0, 0.0, 10.0, 10.0);
        quad.set_corner(Corner::BottomRight, Point::new(12.0, 15.0));
        assert_eq!(quad.corner(Corner::TopLeft), Point::new(0.0, 0.0));
        assert_eq!(quad.corner(Corner::TopRight), Point::new(10.0, 0.0));
        assert_eq!(quad.corner(Corner::BottomRight), Point::new(12.0, 15.0));
        assert_eq!(quad.corner(Corner::BottomLeft), Point::new(0.0, 10.0));
    }

    #[test]
    fn rotation_normalizes_modulo_360() {
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Deg270));
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(45), None);

        let mut r = Rotation::Deg0;
        for _ in 0..4 {
            r = r.rotated(RotationStep::CounterClockwise);
        }
        assert_eq!(r, Rotation::Deg0);
        assert!(Rotation::Deg0.rotated(RotationStep::Clockwise).swaps_dimensions());
    }

    #[test]
    fn filter_mode_parses_aliases() {
        assert_eq!("bw".parse::<FilterMode>().unwrap(), FilterMode::BlackAndWhite);
        assert_eq!("Greyscale".parse::<FilterMode>().unwrap(), FilterMode::Grayscale);
        assert!("sepia".parse::<FilterMode>().is_err());
    }

    #[test]
    fn resolution_parses_and_labels() {
        let r: Resolution = "1920x1080".parse().unwrap();
        assert_eq!(r, Resolution::FULL_HD);
        assert_eq!(r.label(), "Full HD (1080p)");
        assert!("1920".parse::<Resolution>().is_err());
    }

    #[test]
    fn unlabeled_device_gets_positional_name() {
        let device = DeviceInfo {
            id: DeviceId::new("abc"),
            label: Some("  ".into()),
        };
        assert_eq!(device.display_label(1), "Camera 2");
    }
}
