// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Generation counter for discarding results of superseded async work.
//
// Every state transition advances the generation. Work started earlier
// carries a token from its start; before committing, it checks the token and
// drops its result if the generation has moved on.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for work started now.
    pub fn token(&self) -> GenerationToken {
        GenerationToken {
            value: self.0.load(Ordering::SeqCst),
            source: self.clone(),
        }
    }

    /// Invalidate all outstanding tokens. Returns the new generation.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct GenerationToken {
    value: u64,
    source: Generation,
}

impl GenerationToken {
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Whether no transition has happened since this token was issued.
    pub fn is_current(&self) -> bool {
        self.source.current() == self.value
    }
}
