// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Result review — the page between crop confirmation and acceptance.
//
// Holds the full-resolution colour rectification, reduced previews for all
// tone modes, a cache of full-resolution renders per accepted mode, and the
// pending rotation. Every normalization failure degrades to the best image
// already available and records a warning instead of failing the stage.

use std::collections::HashMap;
use std::sync::Arc;

use image::RgbaImage;
use pagescan_core::{FilterMode, Quad, Rotation, RotationStep};
use pagescan_document::NormalizationEngine;
use pagescan_document::normalize::FilterPreviews;
use tracing::{debug, warn};

use crate::assembler::ScannedPage;

pub struct ResultReview {
    original: Arc<RgbaImage>,
    quad: Quad,
    mode: FilterMode,
    color: Option<RgbaImage>,
    rendered: HashMap<FilterMode, RgbaImage>,
    previews: Option<FilterPreviews>,
    rotation: Rotation,
    warning: Option<String>,
}

impl ResultReview {
    /// Rectify `quad` out of `original` in colour and build the previews.
    pub fn open(engine: &NormalizationEngine, original: Arc<RgbaImage>, quad: Quad) -> Self {
        let mut review = Self {
            original,
            quad,
            mode: FilterMode::Color,
            color: None,
            rendered: HashMap::new(),
            previews: None,
            rotation: Rotation::Deg0,
            warning: None,
        };

        match engine.previews(&review.original, &quad) {
            Ok(previews) => review.previews = Some(previews),
            Err(err) => warn!(error = %err, "Filter previews unavailable"),
        }

        match engine.normalize(&review.original, &quad, FilterMode::Color) {
            Ok(color) => review.color = Some(color),
            Err(err) => {
                warn!(error = %err, "Normalization failed; showing the unrectified original");
                review.warning = Some(err.to_string());
            }
        }
        review
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn quad(&self) -> Quad {
        self.quad
    }

    pub fn original(&self) -> &Arc<RgbaImage> {
        &self.original
    }

    pub fn previews(&self) -> Option<&FilterPreviews> {
        self.previews.as_ref()
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Non-blocking message from the last failed render, if any.
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    /// Switch tone mode, rendering it at full resolution once.
    ///
    /// Tone modes are applied to the cached colour rectification when there
    /// is one; otherwise the engine is asked for a fresh rectification.
    pub fn select_filter(&mut self, engine: &NormalizationEngine, mode: FilterMode) {
        self.mode = mode;
        if mode == FilterMode::Color || self.rendered.contains_key(&mode) {
            return;
        }

        let rendered = match &self.color {
            Some(color) => Ok(engine.retone(color, mode)),
            None => engine.normalize(&self.original, &self.quad, mode),
        };
        match rendered {
            Ok(image) => {
                debug!(mode = mode.label(), "Full-resolution render cached");
                self.rendered.insert(mode, image);
                self.warning = None;
            }
            Err(err) => {
                warn!(mode = mode.label(), error = %err, "Render failed; keeping last good image");
                self.warning = Some(err.to_string());
            }
        }
    }

    /// Apply one quarter-turn to the pending rotation.
    pub fn rotate(&mut self, step: RotationStep) -> Rotation {
        self.rotation = self.rotation.rotated(step);
        self.rotation
    }

    /// Best image for the current mode: the full render, then the colour
    /// rectification, then the mode's preview, then the original.
    pub fn displayed(&self) -> &RgbaImage {
        let full = match self.mode {
            FilterMode::Color => self.color.as_ref(),
            mode => self.rendered.get(&mode),
        };
        full.or(self.color.as_ref())
            .or_else(|| self.previews.as_ref().map(|p| p.get(self.mode)))
            .unwrap_or(&self.original)
    }

    /// Whether the displayed image is not a full-resolution render of the
    /// current mode.
    pub fn is_degraded(&self) -> bool {
        match self.mode {
            FilterMode::Color => self.color.is_none(),
            mode => !self.rendered.contains_key(&mode),
        }
    }

    /// Tone of the image `displayed` returns. Differs from `mode` when the
    /// display fell back to the colour rectification or the original.
    pub fn displayed_mode(&self) -> FilterMode {
        let from_mode = !self.is_degraded() || (self.color.is_none() && self.previews.is_some());
        if from_mode { self.mode } else { FilterMode::Color }
    }

    /// Freeze the review into a page, applying the pending rotation. The page
    /// records the tone it was actually rendered in.
    pub fn into_page(self) -> ScannedPage {
        let normalized = self.displayed().clone();
        let mode = self.displayed_mode();
        ScannedPage::new(self.original, normalized, self.quad, mode, self.rotation)
    }
}
