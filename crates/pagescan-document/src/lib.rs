// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagescan-document — Pixel and PDF work for the Pagescan pipeline.
//
// Provides image processing (rotate, downscale, thumbnail, encode), document
// edge detection, perspective normalization with tone filters, and multi-page
// PDF assembly.

pub mod detect;
pub mod image;
pub mod normalize;
pub mod pdf;

// Re-export the primary structs so callers can use `pagescan_document::PdfWriter` etc.
pub use detect::{EdgeDetector, FixedInsetDetector, HoughEdgeDetector};
pub use self::image::processor::ImageProcessor;
pub use normalize::engine::NormalizationEngine;
pub use normalize::rectify::{PerspectiveTransform, ProjectiveRectifier};
pub use pdf::reader::PdfReader;
pub use pdf::writer::PdfWriter;
pub use pdf::{DocumentEncoder, PageImages};
