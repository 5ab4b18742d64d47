// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — assemble scanned pages into one document using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use image::RgbaImage;
use pagescan_core::PaperSize;
use pagescan_core::error::{Result, ScanError};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument};

use super::{DocumentEncoder, PageImages};

/// At 72 DPI one image pixel is one PDF point, so the fit scale is a plain
/// ratio of points to pixels.
const PLACEMENT_DPI: f32 = 72.0;

const DOCUMENT_TITLE: &str = "Scanned Document";

/// Lays out one page image per PDF page, fitted inside the margins and
/// centred.
#[derive(Debug, Clone)]
pub struct PdfWriter {
    paper_size: PaperSize,
    margin_mm: f32,
}

impl PdfWriter {
    pub fn new(paper_size: PaperSize, margin_mm: f32) -> Self {
        Self {
            paper_size,
            margin_mm,
        }
    }

    /// A4 portrait with 10 mm margins.
    pub fn a4() -> Self {
        Self::new(PaperSize::A4, 10.0)
    }

    fn page_dimensions(&self) -> (Mm, Mm) {
        let (w_mm, h_mm) = self.paper_size.dimensions_mm();
        (Mm(w_mm as f32), Mm(h_mm as f32))
    }

    /// Placement of an `img_w`×`img_h` pixel image on the page:
    /// `(x_offset_pt, y_offset_pt, scale)`.
    fn fit(&self, img_w: u32, img_h: u32) -> (f32, f32, f32) {
        let (page_w, page_h) = self.page_dimensions();
        let margin_pt = Mm(self.margin_mm).into_pt().0;
        let usable_w_pt = Mm(page_w.0 - 2.0 * self.margin_mm).into_pt().0;
        let usable_h_pt = Mm(page_h.0 - 2.0 * self.margin_mm).into_pt().0;

        let scale = (usable_w_pt / img_w as f32).min(usable_h_pt / img_h as f32);
        let rendered_w_pt = img_w as f32 * scale;
        let rendered_h_pt = img_h as f32 * scale;

        let x_offset = margin_pt + (usable_w_pt - rendered_w_pt) / 2.0;
        let y_offset = margin_pt + (usable_h_pt - rendered_h_pt) / 2.0;
        (x_offset, y_offset, scale)
    }

    /// Build a PDF with one page per image, in order.
    #[instrument(skip_all, fields(pages = images.len(), paper = ?self.paper_size))]
    pub fn create_from_images(&self, images: &[&RgbaImage]) -> Result<Vec<u8>> {
        if images.is_empty() {
            return Err(ScanError::NoPages);
        }
        let (page_w, page_h) = self.page_dimensions();

        let mut doc = PdfDocument::new(DOCUMENT_TITLE);
        let mut pages = Vec::with_capacity(images.len());

        for (index, image) in images.iter().enumerate() {
            let (img_w, img_h) = image.dimensions();
            if img_w == 0 || img_h == 0 {
                return Err(ScanError::AssemblyFailure(format!("page {} is empty", index + 1)));
            }

            let rgb = image::DynamicImage::ImageRgba8((*image).clone()).to_rgb8();
            let raw = RawImage {
                pixels: RawImageData::U8(rgb.into_raw()),
                width: img_w as usize,
                height: img_h as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            let (x_offset, y_offset, scale) = self.fit(img_w, img_h);
            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(x_offset)),
                    translate_y: Some(Pt(y_offset)),
                    scale_x: Some(scale),
                    scale_y: Some(scale),
                    dpi: Some(PLACEMENT_DPI),
                    rotate: None,
                },
            }];
            debug!(page = index + 1, img_w, img_h, scale, "Image placed on page");
            pages.push(PdfPage::new(page_w, page_h, ops));
        }

        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        info!(bytes = output.len(), warnings = warnings.len(), "PDF assembled");
        Ok(output)
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::a4()
    }
}

impl DocumentEncoder for PdfWriter {
    fn assemble(&self, pages: &[PageImages<'_>]) -> Result<Vec<u8>> {
        let processed: Vec<&RgbaImage> = pages.iter().map(|p| p.processed).collect();
        self.create_from_images(&processed)
    }
}
