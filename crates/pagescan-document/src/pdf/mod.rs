// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — multi-page assembly of scanned pages, and a reader for
// verifying the result.

pub mod reader;
pub mod writer;

use image::RgbaImage;
use pagescan_core::error::Result;

pub use reader::PdfReader;
pub use writer::PdfWriter;

/// One accepted page as handed to an encoder.
#[derive(Debug, Clone, Copy)]
pub struct PageImages<'a> {
    /// The captured frame or uploaded photo, before rectification.
    pub original: &'a RgbaImage,
    /// The rectified, tone-mapped, rotated page.
    pub processed: &'a RgbaImage,
}

/// Turns an ordered page set into a single document file.
pub trait DocumentEncoder: Send + Sync {
    /// Encode `pages` in order, one page each.
    fn assemble(&self, pages: &[PageImages<'_>]) -> Result<Vec<u8>>;

    /// MIME type of the produced bytes.
    fn media_type(&self) -> &'static str {
        "application/pdf"
    }
}
