// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Result assembler — accepted pages, the session that orders them, and the
// handoff to a document encoder.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::RgbaImage;
use pagescan_core::error::{Result, ScanError};
use pagescan_core::{FilterMode, PageId, Quad, Rotation, SessionId};
use pagescan_document::{DocumentEncoder, ImageProcessor, PageImages};
use sha2::{Digest, Sha256};
use tracing::{error, info, instrument};

// -- Pages --------------------------------------------------------------------

/// One accepted page. `normalized` already has `rotation` applied.
#[derive(Debug, Clone)]
pub struct ScannedPage {
    pub id: PageId,
    pub original: Arc<RgbaImage>,
    pub normalized: RgbaImage,
    pub quad: Quad,
    pub filter_mode: FilterMode,
    pub rotation: Rotation,
    pub captured_at: DateTime<Utc>,
}

impl ScannedPage {
    /// Build a page, rotating `normalized` by `rotation`.
    pub fn new(
        original: Arc<RgbaImage>,
        normalized: RgbaImage,
        quad: Quad,
        filter_mode: FilterMode,
        rotation: Rotation,
    ) -> Self {
        let normalized = ImageProcessor::from_rgba(normalized)
            .rotate(rotation)
            .into_rgba();
        Self {
            id: PageId::new(),
            original,
            normalized,
            quad,
            filter_mode,
            rotation,
            captured_at: Utc::now(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.normalized.dimensions()
    }
}

// -- Session ------------------------------------------------------------------

/// Ordered pages of one scanning interaction.
#[derive(Debug, Clone)]
pub struct ScanSession {
    id: SessionId,
    started_at: DateTime<Utc>,
    pages: Vec<ScannedPage>,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSession {
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            started_at: Utc::now(),
            pages: Vec::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Append a page and return its id.
    pub fn accept(&mut self, page: ScannedPage) -> PageId {
        let id = page.id;
        info!(
            session = %self.id,
            page = %id,
            index = self.pages.len(),
            width = page.normalized.width(),
            height = page.normalized.height(),
            "Page accepted"
        );
        self.pages.push(page);
        id
    }

    /// Remove the page at `index`, if present.
    pub fn remove_page(&mut self, index: usize) -> Option<ScannedPage> {
        if index >= self.pages.len() {
            return None;
        }
        let page = self.pages.remove(index);
        info!(session = %self.id, page = %page.id, index, "Page removed");
        Some(page)
    }

    /// Drop every page. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pages.len();
        self.pages.clear();
        info!(session = %self.id, dropped, "Session cleared");
        dropped
    }

    pub fn pages(&self) -> &[ScannedPage] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// The most recently accepted page.
    pub fn last_page(&self) -> Option<&ScannedPage> {
        self.pages.last()
    }
}

// -- Finalize -----------------------------------------------------------------

/// Encoded output of a finished session.
#[derive(Debug, Clone)]
pub struct ScanDocument {
    pub bytes: Vec<u8>,
    /// Hex SHA-256 of `bytes`.
    pub sha256: String,
    pub page_count: usize,
    pub media_type: &'static str,
}

/// Hand the session's pages, in order, to `encoder`.
///
/// Performs no image processing. The session is borrowed so a failed attempt
/// can be retried without rescanning.
#[instrument(skip_all, fields(session = %session.id(), pages = session.len()))]
pub fn finalize(session: &ScanSession, encoder: &dyn DocumentEncoder) -> Result<ScanDocument> {
    if session.is_empty() {
        return Err(ScanError::NoPages);
    }

    let pages: Vec<PageImages<'_>> = session
        .pages()
        .iter()
        .map(|page| PageImages {
            original: page.original.as_ref(),
            processed: &page.normalized,
        })
        .collect();

    let bytes = encoder.assemble(&pages).map_err(|err| {
        error!(error = %err, "Document assembly failed");
        match err {
            ScanError::AssemblyFailure(_) => err,
            other => ScanError::AssemblyFailure(other.to_string()),
        }
    })?;

    let sha256 = hex::encode(Sha256::digest(&bytes));
    info!(bytes = bytes.len(), sha256 = %sha256, "Document finalized");
    Ok(ScanDocument {
        bytes,
        sha256,
        page_count: pages.len(),
        media_type: encoder.media_type(),
    })
}
