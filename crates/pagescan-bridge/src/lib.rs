// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pagescan — Platform media-capture abstractions.
//
// The camera controller talks to cameras only through `MediaCapture` and
// `VideoStream`. Hosts without a native backend get the stub; tests and the
// CLI feed recorded frames through the replay backend.

pub mod replay;
pub mod stub;
pub mod traits;

use std::sync::Arc;

pub use replay::{ReplayCapture, ReplayDevice, ReplayStats};
pub use stub::StubCapture;
pub use traits::{MediaCapture, VideoStream};

/// The media-capture implementation for the current host.
///
/// No native camera backend is bundled, so this is always the stub.
pub fn platform_media_capture() -> Arc<dyn MediaCapture> {
    Arc::new(stub::StubCapture)
}
