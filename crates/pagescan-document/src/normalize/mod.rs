// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Normalization — perspective rectification followed by tone mapping.

pub mod engine;
pub mod rectify;
pub mod tone;

pub use engine::{FilterPreviews, NormalizationEngine};
pub use rectify::{PerspectiveTransform, ProjectiveRectifier};
pub use tone::apply_filter;
